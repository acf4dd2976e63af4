mod builtin;
mod plugin;

use std::path::PathBuf;

pub use builtin::BuiltinArchitecture;
pub use plugin::{MANIFEST_SUFFIX, PluginModule, PluginRegistry};

use crate::{Result, ZooError, models::Architecture};

/// Constructs a fresh, default-configured architecture.
pub type ModelFactory = fn() -> Box<dyn Architecture>;

/// Maps an identifier to the constructor of its architecture.
///
/// Built-ins are matched first. Otherwise the plugin manifests on `search_paths` are
/// scanned and the first module exporting `identifier` wins.
///
/// # Arguments
/// * `identifier` - The identifier stored in a parameter record.
/// * `search_paths` - The directories holding plugin manifests.
/// * `plugins` - The plugin modules linked into the program.
///
/// # Returns
/// The constructor, or `UnknownIdentifier` when nothing provides `identifier`.
pub fn resolve(
    identifier: &str,
    search_paths: &[PathBuf],
    plugins: &PluginRegistry,
) -> Result<ModelFactory> {
    if let Some(builtin) = BuiltinArchitecture::from_identifier(identifier) {
        return Ok(builtin.factory());
    }

    plugins
        .scan(identifier, search_paths)?
        .ok_or_else(|| ZooError::UnknownIdentifier(identifier.to_string()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::models::StarNet2017;

    fn star_net() -> Box<dyn Architecture> {
        Box::new(StarNet2017)
    }

    #[test]
    fn builtins_shadow_plugins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(format!("shadow{MANIFEST_SUFFIX}")),
            r#"{"exports": ["ApogeeCNN"]}"#,
        )
        .unwrap();

        let mut plugins = PluginRegistry::new();
        plugins.register("shadow", "ApogeeCNN", star_net);

        let factory = resolve("ApogeeCNN", &[dir.path().to_path_buf()], &plugins).unwrap();
        assert_eq!(factory().identifier(), "ApogeeCNN");
    }

    #[test]
    fn unknown_identifiers_are_reported() {
        let result = resolve("NotARealModel", &[], &PluginRegistry::new());
        assert!(matches!(result, Err(ZooError::UnknownIdentifier(id)) if id == "NotARealModel"));
    }
}
