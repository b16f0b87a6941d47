use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::Result;
use crate::provider::StylesheetModuleProvider;

/// Summary of one build, written by `twc build --report`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    /// Version of the report format
    pub version: String,

    pub generated_at: DateTime<Utc>,

    /// `development` or `production`
    pub mode: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stylesheet: Option<String>,

    /// Pipeline plugins in the order they ran
    pub plugins: Vec<String>,

    pub minified: bool,

    pub css_size_bytes: usize,

    pub module_size_bytes: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_version: Option<String>,
}

impl BuildReport {
    /// Describe the provider's most recent load
    pub fn from_provider(provider: &StylesheetModuleProvider, module: &str) -> Self {
        let last_load = provider.last_load();

        Self {
            version: "1.0.0".to_string(),
            generated_at: Utc::now(),
            mode: provider.mode().as_str().to_string(),
            stylesheet: last_load.map(|load| load.stylesheet.display().to_string()),
            plugins: last_load.map(|load| load.plugins.clone()).unwrap_or_default(),
            minified: last_load.is_some_and(|load| load.minified),
            css_size_bytes: provider.stylesheet_code().len(),
            module_size_bytes: module.len(),
            plugin_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
