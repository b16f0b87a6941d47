pub mod args;
pub mod codegen;
pub mod components;
pub mod config;
pub mod errors;
pub mod imports;
pub mod live_update;
pub mod pipeline;
pub mod plugin;
pub mod provider;
pub mod report;
pub mod scanner;
pub mod tailwind;
pub mod virtual_module;
#[cfg(feature = "cli")]
pub mod watch;

pub use args::{BuildArgs, Cli, Commands};
pub use codegen::{generate_module, ModuleOptions};
pub use components::{ComponentCompilerOptions, CUSTOM_ELEMENT_PATTERN};
pub use config::PluginConfig;
pub use errors::{PluginError, Result};
pub use live_update::{LiveUpdateChannel, LiveUpdateMessage, RELOAD_EVENT};
pub use pipeline::{CssPipeline, CssPlugin, PipelineConfig};
pub use plugin::{BuildMode, ConfigEnv, DevServer, Enforce, Plugin, ResolvedConfig};
pub use provider::{StylesheetModuleProvider, PLUGIN_NAME};
pub use report::BuildReport;
pub use virtual_module::STYLESHEET_MODULE;

use std::path::{Path, PathBuf};

/// The two plugins handed to the host
pub struct PluginSet {
    /// Serves the virtual stylesheet module
    pub stylesheet: StylesheetModuleProvider,
    /// Options for the host's Vue single-file-component compiler
    pub components: ComponentCompilerOptions,
}

/// Build the plugin set for a configuration
///
/// Nothing is validated here; a missing stylesheet or root surfaces on the
/// first load of the virtual module.
pub fn tailwind_web_components(config: PluginConfig) -> PluginSet {
    let components = ComponentCompilerOptions::from_vue_config(&config.vue_config);
    PluginSet {
        stylesheet: StylesheetModuleProvider::new(config),
        components,
    }
}

/// Output of one full lifecycle run
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub module: String,
    pub report: BuildReport,
}

/// Drive a provider through the host lifecycle once and load the module
///
/// `server` stands in for the host's dev server; pass `None` for builds.
pub async fn run_lifecycle(
    provider: &mut StylesheetModuleProvider,
    root: &Path,
    mode: &str,
    server: Option<&DevServer>,
) -> Result<BuildOutput> {
    Plugin::config(provider, &ConfigEnv { mode: mode.to_string() });
    provider.config_resolved(&ResolvedConfig { root: absolute_path(root) });
    if let Some(server) = server {
        provider.configure_server(server);
    }

    let id = provider.resolve_id(STYLESHEET_MODULE.public())
        .ok_or_else(|| PluginError::config("Virtual module id was not claimed"))?;
    let module = provider.load(&id).await?
        .ok_or_else(|| PluginError::config("Virtual module was not loaded"))?;

    let report = BuildReport::from_provider(provider, &module);
    Ok(BuildOutput { module, report })
}

/// Make `path` absolute against the working directory without resolving symlinks
///
/// Watcher events report paths under the watched root as given, so outputs
/// compared against them must be built the same way.
pub fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    #[test]
    fn test_factory_builds_both_plugins() {
        let mut vue_config = Map::new();
        vue_config.insert("customElement".to_string(), json!(true));
        vue_config.insert("isProduction".to_string(), json!(false));

        let set = tailwind_web_components(
            PluginConfig::new("src/theme.css").with_vue_config(vue_config),
        );

        assert_eq!(set.stylesheet.name(), PLUGIN_NAME);
        assert_eq!(set.components.options().get("customElement"), Some(&Value::from(CUSTOM_ELEMENT_PATTERN)));
        assert_eq!(set.components.options().get("isProduction"), Some(&json!(false)));
    }

    #[test]
    fn test_absolute_path_joins_working_directory() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolute_path(Path::new("dist/twc.js")), cwd.join("dist/twc.js"));
        assert_eq!(absolute_path(Path::new("/tmp/twc.js")), PathBuf::from("/tmp/twc.js"));
    }

    #[cfg(unix)]
    #[test]
    fn test_absolute_path_keeps_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir(&real).unwrap();
        std::fs::write(real.join("twc.js"), "").unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        assert_eq!(absolute_path(&link.join("twc.js")), link.join("twc.js"));
    }

    #[test]
    fn test_factory_accepts_empty_config() {
        let set = tailwind_web_components(PluginConfig::default());
        assert!(set.stylesheet.plugin_config().stylesheet.is_none());
        assert_eq!(set.components.custom_element_pattern(), CUSTOM_ELEMENT_PATTERN);
    }
}
