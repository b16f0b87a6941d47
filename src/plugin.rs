//! The host build tool's plugin lifecycle, as seen from a plugin

use std::future::Future;
use std::path::PathBuf;

use crate::errors::Result;
use crate::live_update::LiveUpdateChannel;

/// Where a plugin runs relative to the host's other plugins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enforce {
    Pre,
    Post,
}

/// Build mode reported by the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildMode {
    #[default]
    Development,
    Production,
}

impl BuildMode {
    /// Anything but `"production"` is a development build
    pub fn from_mode(mode: &str) -> Self {
        if mode == "production" {
            Self::Production
        } else {
            Self::Development
        }
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// Environment passed to the `config` hook
#[derive(Debug, Clone)]
pub struct ConfigEnv {
    pub mode: String,
}

/// Project configuration after the host resolved it
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub root: PathBuf,
}

/// The host's development server
#[derive(Debug, Clone, Default)]
pub struct DevServer {
    /// Channel to connected clients, when the server has one
    pub ws: Option<LiveUpdateChannel>,
}

/// Hooks the host calls on a plugin, in lifecycle order
pub trait Plugin {
    fn name(&self) -> &str;

    fn enforce(&self) -> Option<Enforce> {
        None
    }

    fn config(&mut self, _env: &ConfigEnv) {}

    fn config_resolved(&mut self, _config: &ResolvedConfig) {}

    fn configure_server(&mut self, _server: &DevServer) {}

    /// Claim `id`, returning its resolved form, or defer with `None`
    fn resolve_id(&self, _id: &str) -> Option<String> {
        None
    }

    /// Produce the source for a resolved `id`, or defer with `None`
    fn load(&mut self, id: &str) -> impl Future<Output = Result<Option<String>>> + Send;
}
