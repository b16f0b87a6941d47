//! Stylesheet module provider
//!
//! Serves the `tailwind-web-components` virtual module. Every load reads the
//! entry stylesheet, runs it through the project's CSS pipeline, pushes the
//! result to connected development clients and wraps it in the generated
//! constructable-stylesheet module.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::codegen::{generate_module, ModuleOptions};
use crate::config::PluginConfig;
use crate::errors::{PluginError, Result};
use crate::live_update::{LiveUpdateChannel, LiveUpdateMessage};
use crate::pipeline::{strip_comments, CssPipeline, PipelineConfig, ProcessOptions, SourceMapMode};
use crate::plugin::{BuildMode, ConfigEnv, DevServer, Enforce, Plugin, ResolvedConfig};
use crate::virtual_module::STYLESHEET_MODULE;

/// Name the provider registers with the host
pub const PLUGIN_NAME: &str = "tailwind-web-components";

/// What the most recent successful load did
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub stylesheet: PathBuf,
    pub plugins: Vec<String>,
    pub minified: bool,
}

/// State built up through the lifecycle hooks and refreshed on every load
#[derive(Debug, Default)]
struct RuntimeState {
    root: Option<PathBuf>,
    mode: BuildMode,
    live_updates: Option<LiveUpdateChannel>,
    stylesheet_code: String,
    module_code: String,
    last_load: Option<LoadSummary>,
}

/// Resolve the entry stylesheet against the project root
pub fn resolve_stylesheet_path(stylesheet: &str, root: &Path) -> PathBuf {
    if stylesheet.starts_with('/') || Path::new(stylesheet).is_absolute() {
        PathBuf::from(stylesheet)
    } else {
        root.join(stylesheet)
    }
}

pub struct StylesheetModuleProvider {
    config: PluginConfig,
    state: RuntimeState,
}

impl StylesheetModuleProvider {
    pub fn new(config: PluginConfig) -> Self {
        Self {
            config,
            state: RuntimeState::default(),
        }
    }

    pub fn plugin_config(&self) -> &PluginConfig {
        &self.config
    }

    /// Record the build mode
    pub fn configure(&mut self, mode: &str) {
        self.state.mode = BuildMode::from_mode(mode);
        tracing::debug!(mode = self.state.mode.as_str(), "Configured build mode");
    }

    /// Record the project root stylesheet paths are resolved against
    pub fn capture_root(&mut self, root: impl Into<PathBuf>) {
        let root = root.into();
        tracing::debug!(root = %root.display(), "Captured project root");
        self.state.root = Some(root);
    }

    /// Attach the channel fresh CSS is pushed to after each load
    pub fn attach_live_updates(&mut self, channel: LiveUpdateChannel) {
        self.state.live_updates = Some(channel);
    }

    pub fn mode(&self) -> BuildMode {
        self.state.mode
    }

    pub fn is_production(&self) -> bool {
        self.state.mode.is_production()
    }

    pub fn root(&self) -> Option<&Path> {
        self.state.root.as_deref()
    }

    /// CSS produced by the last load, unescaped
    pub fn stylesheet_code(&self) -> &str {
        &self.state.stylesheet_code
    }

    /// Module produced by the last load
    pub fn module_code(&self) -> &str {
        &self.state.module_code
    }

    pub fn last_load(&self) -> Option<&LoadSummary> {
        self.state.last_load.as_ref()
    }

    /// Map the public virtual id to its internal form
    pub fn resolve_identifier(&self, id: &str) -> Option<&'static str> {
        STYLESHEET_MODULE.resolve(id)
    }

    /// Absolute path of the entry stylesheet
    pub fn stylesheet_path(&self) -> Result<PathBuf> {
        let stylesheet = self.config.stylesheet_path()
            .ok_or_else(|| PluginError::config("No stylesheet configured"))?;
        let root = self.state.root.as_deref()
            .ok_or_else(|| PluginError::config("Project root is unknown; the config_resolved hook has not run"))?;

        Ok(resolve_stylesheet_path(stylesheet, root))
    }

    fn module_options(&self) -> ModuleOptions {
        ModuleOptions {
            inject_css: self.config.inject_css,
            hot_update: !self.is_production(),
        }
    }

    /// Load the virtual module. Ids other than the internal one are deferred.
    pub async fn load_module(&mut self, id: &str) -> Result<Option<String>> {
        if !STYLESHEET_MODULE.is_internal(id) {
            return Ok(None);
        }

        let path = self.stylesheet_path()?;
        let root = self.state.root.clone().unwrap_or_default();

        let source = tokio::fs::read_to_string(&path).await
            .map_err(|source| PluginError::StylesheetRead {
                path: path.display().to_string(),
                source,
            })?;

        let pipeline_config = PipelineConfig::discover(&root).await?;
        let mut pipeline = CssPipeline::from_config(&pipeline_config)?;
        if self.config.minify && self.is_production() {
            pipeline = pipeline.with_minifier();
        }

        let options = ProcessOptions {
            from: path.clone(),
            map: SourceMapMode::from(self.config.source_map),
        };
        let processed = pipeline.process(&source, &root, &options)?;
        let css = strip_comments(&processed.css);

        if let Some(channel) = &self.state.live_updates {
            let receivers = channel.send(LiveUpdateMessage::reload(css.as_str()));
            tracing::debug!(receivers, "Sent stylesheet reload");
        }

        let module = generate_module(&css, self.module_options())?;

        tracing::info!(
            stylesheet = %path.display(),
            css_bytes = css.len(),
            minified = pipeline.minifies(),
            "Compiled stylesheet module"
        );

        self.state.last_load = Some(LoadSummary {
            stylesheet: path,
            plugins: pipeline.plugin_names().into_iter().map(str::to_string).collect(),
            minified: pipeline.minifies(),
        });
        self.state.stylesheet_code = css;
        self.state.module_code = module.clone();

        Ok(Some(module))
    }
}

impl Plugin for StylesheetModuleProvider {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn enforce(&self) -> Option<Enforce> {
        Some(Enforce::Pre)
    }

    fn config(&mut self, env: &ConfigEnv) {
        self.configure(&env.mode);
    }

    fn config_resolved(&mut self, config: &ResolvedConfig) {
        self.capture_root(config.root.clone());
    }

    fn configure_server(&mut self, server: &DevServer) {
        if let Some(ws) = &server.ws {
            self.attach_live_updates(ws.clone());
        }
    }

    fn resolve_id(&self, id: &str) -> Option<String> {
        self.resolve_identifier(id).map(str::to_string)
    }

    fn load(&mut self, id: &str) -> impl Future<Output = Result<Option<String>>> + Send {
        self.load_module(id)
    }
}
