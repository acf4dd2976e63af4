use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    ShapeMismatch {
        what: &'static str,
        got: (usize, usize),
        expected: (usize, usize),
    },
    UnknownOptimizerState {
        name: String,
    },
    MissingOptimizerState {
        name: String,
    },
    OptimizerNotBuilt,
    EmptyDataset,
    InvalidInit(String),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => format!("Size mismatch on {what}, got {got} and expected {expected}"),
            MlErr::ShapeMismatch {
                what,
                got,
                expected,
            } => format!("Shape mismatch on {what}, got {got:?} and expected {expected:?}"),
            MlErr::UnknownOptimizerState { name } => {
                format!("The optimizer has no state named '{name}'")
            }
            MlErr::MissingOptimizerState { name } => {
                format!("The optimizer state '{name}' was not provided")
            }
            MlErr::OptimizerNotBuilt => {
                "The optimizer update path has not been built yet, compile the model first".into()
            }
            MlErr::EmptyDataset => "The dataset has no samples".into(),
            MlErr::InvalidInit(msg) => format!("Failed to initialize parameters: {msg}"),
        };

        write!(f, "{s}")
    }
}

impl Error for MlErr {}
