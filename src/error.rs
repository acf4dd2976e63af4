use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

use machine_learning::MlErr;

/// The result type used across the model zoo.
pub type Result<T> = std::result::Result<T, ZooError>;

/// The model zoo's error type.
#[derive(Debug)]
pub enum ZooError {
    DirectoryNotFound(PathBuf),
    UnrecognizedModelDirectory(PathBuf),
    UnknownIdentifier(String),
    MissingRequiredField(&'static str),
    UnboundGraph,
    InconsistentConfig {
        field: &'static str,
        requires: &'static str,
    },
    InvalidConfig(String),
    Unsupported {
        identifier: String,
        what: &'static str,
    },
    PluginLoad {
        module: String,
        reason: String,
    },
    InvalidRecord(serde_json::Error),
    InvalidWeights(String),
    Ml(MlErr),
    Io(io::Error),
}

impl Display for ZooError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZooError::DirectoryNotFound(path) => {
                write!(f, "Folder not found: {}", path.display())
            }
            ZooError::UnrecognizedModelDirectory(path) => write!(
                f,
                "Are you sure {} contains a saved model? No parameter record was found",
                path.display()
            ),
            ZooError::UnknownIdentifier(id) => write!(f, "Unknown model identifier '{id}'"),
            ZooError::MissingRequiredField(key) => {
                write!(f, "The parameter record lacks the required field '{key}'")
            }
            ZooError::UnboundGraph => write!(
                f,
                "The model has no bound graph, compile it or load it from a folder first"
            ),
            ZooError::InconsistentConfig { field, requires } => {
                write!(f, "The field '{field}' is set but '{requires}' is missing")
            }
            ZooError::InvalidConfig(msg) => write!(f, "Invalid configuration: {msg}"),
            ZooError::Unsupported { identifier, what } => {
                write!(f, "{identifier} does not provide a {what}")
            }
            ZooError::PluginLoad { module, reason } => {
                write!(f, "Failed to load plugin module '{module}': {reason}")
            }
            ZooError::InvalidRecord(e) => write!(f, "Malformed parameter record: {e}"),
            ZooError::InvalidWeights(msg) => write!(f, "Malformed weights container: {msg}"),
            ZooError::Ml(e) => write!(f, "{e}"),
            ZooError::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for ZooError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ZooError::InvalidRecord(e) => Some(e),
            ZooError::Ml(e) => Some(e),
            ZooError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MlErr> for ZooError {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}

impl From<io::Error> for ZooError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ZooError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidRecord(value)
    }
}

impl From<safetensors::SafeTensorError> for ZooError {
    fn from(value: safetensors::SafeTensorError) -> Self {
        Self::InvalidWeights(value.to_string())
    }
}
