//! Configuration for the Vue component compiler.
//!
//! Component compilation itself happens in the host's Vue plugin; this module
//! only prepares the options it receives.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

/// File-name pattern compiled as custom elements
pub const CUSTOM_ELEMENT_PATTERN: &str = "*.ce.vue";

const CUSTOM_ELEMENT_KEY: &str = "customElement";

/// Options handed to the Vue compiler plugin
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ComponentCompilerOptions {
    options: Map<String, Value>,
}

impl ComponentCompilerOptions {
    /// Take the caller's options, forcing the custom-element pattern
    pub fn from_vue_config(vue_config: &Map<String, Value>) -> Self {
        let mut options = vue_config.clone();
        let pattern = Value::String(CUSTOM_ELEMENT_PATTERN.to_string());

        if let Some(previous) = options.insert(CUSTOM_ELEMENT_KEY.to_string(), pattern.clone()) {
            if previous != pattern {
                tracing::warn!(
                    ignored = %previous,
                    "vueConfig.customElement is managed by tailwind-web-components and was overridden"
                );
            }
        }

        Self { options }
    }

    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    pub fn custom_element_pattern(&self) -> &str {
        self.options
            .get(CUSTOM_ELEMENT_KEY)
            .and_then(Value::as_str)
            .unwrap_or(CUSTOM_ELEMENT_PATTERN)
    }

    /// Whether the compiler will treat `path` as a custom element
    pub fn is_custom_element(&self, path: &Path) -> bool {
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            return false;
        };

        glob::Pattern::new(self.custom_element_pattern())
            .map(|pattern| pattern.matches(file_name))
            .unwrap_or(false)
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.options.clone())
    }
}
