use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use super::{RECORD_FILE, WEIGHTS_FILE, weights::WeightsContainer};
use crate::{Result, ZooError, net::NeuralNet};

/// Files written under a temporary name, removed on drop unless committed.
struct Staged {
    files: Vec<(PathBuf, PathBuf)>,
}

impl Staged {
    fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Returns the temporary path `target` is staged at.
    fn stage(&mut self, target: PathBuf) -> PathBuf {
        let mut tmp = target.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        self.files.push((tmp.clone(), target));
        tmp
    }

    /// Renames every staged file into place, in staging order.
    fn commit(mut self) -> Result<()> {
        for (tmp, target) in &self.files {
            fs::rename(tmp, target)?;
        }

        self.files.clear();
        Ok(())
    }
}

impl Drop for Staged {
    fn drop(&mut self) {
        for (tmp, _) in &self.files {
            if tmp.exists() {
                if let Err(e) = fs::remove_file(tmp) {
                    log::warn!("failed to remove {}: {e}", tmp.display());
                }
            }
        }
    }
}

/// Saves a compiled instance into `folder`, creating it if needed.
///
/// Both files are written under temporary names first. The weights are moved into place
/// before the parameter record, so a folder holding the record always holds its weights.
///
/// # Returns
/// The folder the model was saved to, `UnboundGraph` if the instance was never compiled.
pub fn save(net: &NeuralNet, folder: &Path) -> Result<PathBuf> {
    let compiled = net.compiled().ok_or(ZooError::UnboundGraph)?;
    fs::create_dir_all(folder)?;

    let mut staged = Staged::new();
    let weights_tmp = staged.stage(folder.join(WEIGHTS_FILE));
    let record_tmp = staged.stage(folder.join(RECORD_FILE));

    WeightsContainer::from_compiled(compiled).write(&weights_tmp)?;

    let mut record = fs::File::create(&record_tmp)?;
    record.write_all(net.config().to_json()?.as_bytes())?;
    record.sync_all()?;
    drop(record);

    staged.commit()?;

    log::info!(
        "{} ({}) saved to {}",
        net.name(),
        net.identifier(),
        folder.display()
    );

    Ok(folder.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_files_are_cleaned_up_unless_committed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("file.json");

        {
            let mut staged = Staged::new();
            let tmp = staged.stage(target.clone());
            fs::write(&tmp, "{}").unwrap();
        }
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());

        let mut staged = Staged::new();
        let tmp = staged.stage(target.clone());
        fs::write(&tmp, "{}").unwrap();
        staged.commit().unwrap();

        assert!(target.exists());
        assert!(!tmp.exists());
    }
}
