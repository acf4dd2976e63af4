use std::{
    env, fs,
    path::{Path, PathBuf},
};

use super::{RECORD_FILE, WEIGHTS_FILE, weights::WeightsContainer};
use crate::{
    Result, ZooError,
    config::{ConsistencyPolicy, ModelConfig, Settings},
    net::NeuralNet,
    registry::{self, PluginRegistry},
};

/// How `load_folder_with` resolves and validates a saved model.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub settings: Settings,
    pub plugins: PluginRegistry,
    pub consistency: ConsistencyPolicy,
}

impl LoadOptions {
    /// Takes the search path from the environment, with no plugins registered.
    pub fn from_env() -> Self {
        Self {
            settings: Settings::from_env(),
            ..Default::default()
        }
    }
}

/// Loads a saved model, searching plugins only on `ASTRONN_CUSTOM_MODEL_PATH` and the
/// model folder itself.
///
/// # Arguments
/// * `folder` - The model folder. The current directory is searched when `None` or when
///   `folder` holds no record.
pub fn load_folder(folder: Option<&Path>) -> Result<NeuralNet> {
    load_folder_with(folder, &LoadOptions::from_env())
}

/// Loads a saved model: reads its record, reconstructs the architecture named by the
/// record's identifier, then restores its weights and optimizer state.
///
/// # Arguments
/// * `folder` - The model folder. The current directory is searched when `None` or when
///   `folder` holds no record.
/// * `options` - The plugin search path, the plugin registry and the consistency policy.
///
/// # Returns
/// A compiled instance ready for inference or further training.
pub fn load_folder_with(folder: Option<&Path>, options: &LoadOptions) -> Result<NeuralNet> {
    load(folder, options).inspect_err(|e| {
        let folder = folder.map_or_else(|| ".".into(), |f| f.display().to_string());
        log::error!("failed to load a model from {folder}: {e}");
    })
}

fn load(folder: Option<&Path>, options: &LoadOptions) -> Result<NeuralNet> {
    let folder = locate_model_folder(folder)?;

    let record = fs::read_to_string(folder.join(RECORD_FILE))?;
    let config = ModelConfig::from_json(&record, options.consistency)?;

    let mut search_paths = options.settings.custom_model_path.clone();
    search_paths.push(folder.clone());
    let factory = registry::resolve(&config.identifier, &search_paths, &options.plugins)?;

    let mut net = NeuralNet::with_config(factory(), config);
    net.set_folder(folder.clone());

    let weights = WeightsContainer::read(&folder.join(WEIGHTS_FILE))?;
    net.compile(Some(weights.optimizer))?;

    let compiled = net.compiled_mut().ok_or(ZooError::UnboundGraph)?;
    weights.restore_layers(compiled)?;
    compiled.make_train_function();
    compiled.set_optimizer_state(&weights.optimizer_state)?;

    log::info!(
        "Loaded astroNN model, model type: {} -> {}",
        net.name(),
        net.identifier()
    );

    Ok(net)
}

/// Finds the folder holding the parameter record, preferring `folder` and falling back
/// to the current directory. The weights are always read next to the record found.
fn locate_model_folder(folder: Option<&Path>) -> Result<PathBuf> {
    let cwd = env::current_dir()?;
    let has_record = |dir: &Path| dir.join(RECORD_FILE).is_file();

    let Some(folder) = folder.map(|f| cwd.join(f)) else {
        if has_record(&cwd) {
            return Ok(cwd);
        }
        return Err(ZooError::UnrecognizedModelDirectory(cwd));
    };

    if has_record(&folder) {
        return Ok(folder);
    }

    if has_record(&cwd) {
        log::warn!(
            "no model in {}, loading the one in the current directory {}",
            folder.display(),
            cwd.display()
        );
        return Ok(cwd);
    }

    if !folder.is_dir() {
        return Err(ZooError::DirectoryNotFound(folder));
    }

    Err(ZooError::UnrecognizedModelDirectory(folder))
}
