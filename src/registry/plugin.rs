use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use super::ModelFactory;
use crate::{Result, ZooError};

/// The suffix of the manifest describing one plugin module.
pub const MANIFEST_SUFFIX: &str = ".plugin.json";

/// The symbols a plugin module claims to export, e.g. `{"exports": ["MyCnn"]}`.
#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    exports: Vec<String>,
}

/// The factories one plugin module provides, by symbol name.
#[derive(Debug, Clone, Default)]
pub struct PluginModule {
    symbols: BTreeMap<String, ModelFactory>,
}

impl PluginModule {
    pub fn symbol(&self, name: &str) -> Option<ModelFactory> {
        self.symbols.get(name).copied()
    }
}

/// The plugin modules linked into the host program. A module found on the search path is
/// only loadable if it was registered here under its manifest's name.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    modules: HashMap<String, PluginModule>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` as the symbol `symbol` of the module `module`.
    pub fn register(&mut self, module: &str, symbol: &str, factory: ModelFactory) -> &mut Self {
        self.modules
            .entry(module.to_string())
            .or_default()
            .symbols
            .insert(symbol.to_string(), factory);
        self
    }

    pub fn module(&self, name: &str) -> Option<&PluginModule> {
        self.modules.get(name)
    }

    /// Scans the manifests found in `search_paths` for one exporting `identifier`.
    ///
    /// Directories are visited in order and their manifests in file name order. Missing
    /// directories and modules not exporting `identifier` are skipped.
    ///
    /// # Returns
    /// The first matching factory, `None` if no module exports `identifier`, or
    /// `PluginLoad` if a module cannot be loaded.
    pub fn scan(&self, identifier: &str, search_paths: &[PathBuf]) -> Result<Option<ModelFactory>> {
        for dir in search_paths {
            for (module_name, path) in manifests_in(dir)? {
                let manifest = read_manifest(&module_name, &path)?;

                if !manifest.exports.iter().any(|symbol| symbol == identifier) {
                    continue;
                }

                let module = self.module(&module_name).ok_or_else(|| ZooError::PluginLoad {
                    module: module_name.clone(),
                    reason: format!("{} is not registered in this program", path.display()),
                })?;

                let factory = module.symbol(identifier).ok_or_else(|| ZooError::PluginLoad {
                    module: module_name.clone(),
                    reason: format!("exports '{identifier}' but does not provide it"),
                })?;

                log::debug!("{identifier} resolved to plugin module {module_name}");
                return Ok(Some(factory));
            }
        }

        Ok(None)
    }
}

/// Lists the manifests of `dir` as `(module name, path)`, sorted by file name.
fn manifests_in(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("skipping missing plugin directory {}", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut manifests = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };

        if let Some(module) = file_name.strip_suffix(MANIFEST_SUFFIX) {
            if path.is_file() && !module.is_empty() {
                manifests.push((module.to_string(), path.clone()));
            }
        }
    }

    manifests.sort_by(|(_, a), (_, b)| a.file_name().cmp(&b.file_name()));
    Ok(manifests)
}

fn read_manifest(module: &str, path: &Path) -> Result<Manifest> {
    let contents = fs::read_to_string(path)?;

    serde_json::from_str(&contents).map_err(|e| ZooError::PluginLoad {
        module: module.to_string(),
        reason: format!("malformed manifest: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Architecture, Cifar10Cnn, StarNet2017},
        registry::BuiltinArchitecture,
    };

    fn write_manifest(dir: &Path, module: &str, contents: &str) {
        fs::write(dir.join(format!("{module}{MANIFEST_SUFFIX}")), contents).unwrap();
    }

    fn star_net() -> Box<dyn Architecture> {
        Box::new(StarNet2017)
    }

    fn cifar() -> Box<dyn Architecture> {
        Box::new(Cifar10Cnn)
    }

    #[test]
    fn missing_directories_are_skipped() {
        let registry = PluginRegistry::new();
        let paths = vec![PathBuf::from("/definitely/not/a/plugin/dir")];

        assert!(registry.scan("MyNet", &paths).unwrap().is_none());
    }

    #[test]
    fn first_exporting_module_wins() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "b_nets", r#"{"exports": ["MyNet"]}"#);
        write_manifest(dir.path(), "a_nets", r#"{"exports": ["MyNet"]}"#);
        write_manifest(dir.path(), "c_other", r#"{"exports": ["Other"]}"#);

        let mut registry = PluginRegistry::new();
        registry
            .register("a_nets", "MyNet", star_net)
            .register("b_nets", "MyNet", cifar);

        let factory = registry
            .scan("MyNet", &[dir.path().to_path_buf()])
            .unwrap()
            .unwrap();
        assert_eq!(factory().identifier(), BuiltinArchitecture::StarNet2017.identifier());
    }

    #[test]
    fn modules_not_exporting_the_symbol_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "nets", r#"{"exports": ["Other"]}"#);

        let registry = PluginRegistry::new();
        assert!(registry
            .scan("MyNet", &[dir.path().to_path_buf()])
            .unwrap()
            .is_none());
    }

    #[test]
    fn unregistered_modules_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "nets", r#"{"exports": ["MyNet"]}"#);

        let result = PluginRegistry::new().scan("MyNet", &[dir.path().to_path_buf()]);
        assert!(matches!(result, Err(ZooError::PluginLoad { module, .. }) if module == "nets"));
    }

    #[test]
    fn exported_but_unprovided_symbols_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "nets", r#"{"exports": ["MyNet"]}"#);

        let mut registry = PluginRegistry::new();
        registry.register("nets", "OtherNet", star_net);

        let result = registry.scan("MyNet", &[dir.path().to_path_buf()]);
        assert!(matches!(result, Err(ZooError::PluginLoad { .. })));
    }

    #[test]
    fn malformed_manifests_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "nets", "exports = MyNet");

        let result = PluginRegistry::new().scan("MyNet", &[dir.path().to_path_buf()]);
        assert!(matches!(result, Err(ZooError::PluginLoad { .. })));
    }
}
