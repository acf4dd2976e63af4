use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::Result;

/// The environment variable listing extra directories searched for user architectures.
pub const CUSTOM_MODEL_PATH_ENV: &str = "ASTRONN_CUSTOM_MODEL_PATH";

/// User settings of the model zoo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Directories scanned, in order, for plugin manifests.
    #[serde(default)]
    pub custom_model_path: Vec<PathBuf>,
}

impl Settings {
    /// Reads the search path from `ASTRONN_CUSTOM_MODEL_PATH`, using the platform's
    /// path-list syntax.
    pub fn from_env() -> Self {
        let custom_model_path = env::var_os(CUSTOM_MODEL_PATH_ENV)
            .map(|paths| {
                env::split_paths(&paths)
                    .filter(|path| !path.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self { custom_model_path }
    }

    /// Reads the settings from a JSON file.
    ///
    /// # Arguments
    /// * `path` - The settings file, e.g. `{"custom_model_path": ["/opt/models"]}`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Merges the settings file, when given, with the environment. File entries come first.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut settings = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        settings
            .custom_model_path
            .extend(Self::from_env().custom_model_path);

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_file_lists_search_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"custom_model_path": ["/a", "/b"]}"#).unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(
            settings.custom_model_path,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
    }

    #[test]
    fn empty_settings_file_has_no_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{}").unwrap();

        assert_eq!(Settings::from_file(&path).unwrap(), Settings::default());
    }
}
