use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use crate::errors::{PluginError, Result};

/// Plugin configuration, supplied once when the plugin is constructed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginConfig {
    /// Entry stylesheet, relative to the project root unless absolute
    pub stylesheet: Option<String>,

    /// Options handed to the Vue component compiler as-is
    pub vue_config: Map<String, Value>,

    /// Emit an inline source map for the stylesheet
    pub source_map: bool,

    /// Adopt the stylesheet into the page on first load
    pub inject_css: bool,

    /// Minify the stylesheet (production builds only)
    pub minify: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            stylesheet: None,
            vue_config: Map::new(),
            source_map: false,
            inject_css: true,
            minify: true,
        }
    }
}

impl PluginConfig {
    /// Create a configuration for the given entry stylesheet
    pub fn new(stylesheet: impl Into<String>) -> Self {
        Self {
            stylesheet: Some(stylesheet.into()),
            ..Self::default()
        }
    }

    pub fn with_vue_config(mut self, vue_config: Map<String, Value>) -> Self {
        self.vue_config = vue_config;
        self
    }

    pub fn with_source_map(mut self, source_map: bool) -> Self {
        self.source_map = source_map;
        self
    }

    pub fn with_inject_css(mut self, inject_css: bool) -> Self {
        self.inject_css = inject_css;
        self
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    /// The configured stylesheet path, unless it is absent or blank
    pub fn stylesheet_path(&self) -> Option<&str> {
        self.stylesheet
            .as_deref()
            .filter(|path| !path.trim().is_empty())
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PluginError::ConfigError {
                message: format!("Failed to read config file {}: {}", path.display(), e),
            })?;

        serde_json::from_str(&content)
            .map_err(|e| PluginError::ConfigError {
                message: format!("Failed to parse JSON config: {}", e),
            })
    }

    /// Load configuration from a file (auto-detect format)
    pub fn from_file(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Err(PluginError::ConfigError {
                message: format!(
                    "Unsupported config file format: {}. Use .json",
                    path.display()
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = PluginConfig::default();
        assert!(config.stylesheet.is_none());
        assert!(config.vue_config.is_empty());
        assert!(!config.source_map);
        assert!(config.inject_css);
        assert!(config.minify);
    }

    #[test]
    fn test_json_config_loading() {
        let json_content = r##"{
  "stylesheet": "src/styles/main.css",
  "vueConfig": { "isProduction": true },
  "sourceMap": true,
  "injectCss": false
}"##;

        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(json_content.as_bytes()).unwrap();

        let config = PluginConfig::from_file(file.path()).unwrap();
        assert_eq!(config.stylesheet_path(), Some("src/styles/main.css"));
        assert_eq!(config.vue_config.get("isProduction"), Some(&Value::Bool(true)));
        assert!(config.source_map);
        assert!(!config.inject_css);
        // Omitted keys keep their defaults
        assert!(config.minify);
    }

    #[test]
    fn test_unsupported_config_format() {
        let file = NamedTempFile::with_suffix(".toml").unwrap();
        let err = PluginConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unsupported config file format"));
    }

    #[test]
    fn test_blank_stylesheet_is_missing() {
        assert_eq!(PluginConfig::new("  ").stylesheet_path(), None);
        assert_eq!(PluginConfig::new("theme.css").stylesheet_path(), Some("theme.css"));
    }

    #[test]
    fn test_stylesheet_path_is_not_trimmed() {
        assert_eq!(PluginConfig::new(" theme.css").stylesheet_path(), Some(" theme.css"));
        assert_eq!(PluginConfig::new("theme.css\n").stylesheet_path(), Some("theme.css\n"));
    }

    #[test]
    fn test_builder_methods() {
        let config = PluginConfig::new("theme.css")
            .with_source_map(true)
            .with_inject_css(false)
            .with_minify(false);

        assert!(config.source_map);
        assert!(!config.inject_css);
        assert!(!config.minify);
    }
}
