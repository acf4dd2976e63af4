mod load;
mod save;
pub mod weights;

use std::path::{Path, PathBuf};

pub use load::{LoadOptions, load_folder, load_folder_with};
pub use save::save;

/// The parameter record of a saved model. Its presence marks a model folder.
pub const RECORD_FILE: &str = "astroNN_model_parameter.json";

/// The layer weights and optimizer state of a saved model.
pub const WEIGHTS_FILE: &str = "model_weights.safetensors";

/// The first `astroNN_<n>` folder under `base` that doesn't exist yet.
pub fn next_run_folder(base: &Path) -> PathBuf {
    let mut run = 1;

    loop {
        let folder = base.join(format!("astroNN_{run:03}"));
        if !folder.exists() {
            return folder;
        }
        run += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn run_folders_are_numbered() {
        let dir = tempfile::tempdir().unwrap();

        let first = next_run_folder(dir.path());
        assert_eq!(first, dir.path().join("astroNN_001"));

        fs::create_dir(&first).unwrap();
        assert_eq!(next_run_folder(dir.path()), dir.path().join("astroNN_002"));
    }
}
