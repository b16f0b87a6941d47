use thiserror::Error;

/// Main error type for the tailwind-web-components crate
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read stylesheet {path}: {source}")]
    StylesheetRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Glob error: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("No CSS pipeline config found in {searched} or any parent directory")]
    PipelineConfigNotFound { searched: String },

    #[error("Unknown CSS pipeline plugin: {0}")]
    UnknownPlugin(String),

    #[error("Failed to process CSS in {path}: {message}")]
    CssError { path: String, message: String },

    #[error("Failed to parse file {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Tailwind processing error: {0}")]
    TailwindError(String),

    #[error("Code generation error: {0}")]
    CodegenError(String),

    #[error("Watch error: {0}")]
    WatchError(String),
}

impl PluginError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PluginError>;
