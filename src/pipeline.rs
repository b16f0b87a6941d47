//! CSS transformation pipeline
//!
//! A pipeline is discovered from a PostCSS-style JSON config next to (or
//! above) the project root. Its plugins run in config order as text-to-text
//! passes; the result is then parsed and printed by lightningcss, which is
//! where syntax errors surface and where prefixing, minification and source
//! maps happen. Comments starting with `#` are carried across that step.

use base64::Engine;
use indexmap::IndexMap;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::errors::{PluginError, Result};
use crate::imports::ImportPlugin;
use crate::tailwind::TailwindPlugin;

/// Config file names searched for, in priority order
pub const CONFIG_FILE_NAMES: &[&str] = &["postcss.config.json", ".postcssrc.json", ".postcssrc"];

/// Comments not starting with `#`. `/*# sourceMappingURL=... */` pragmas survive.
static CSS_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/\*[^#][\s\S]*?\*/").expect("comment pattern is valid")
});

/// Comments starting with `#`, which lightningcss would otherwise drop
static HASH_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/\*#[\s\S]*?\*/").expect("hash comment pattern is valid")
});

/// Query used by `autoprefixer` when no `overrideBrowserslist` is given
pub const DEFAULT_BROWSERSLIST: &str = "defaults";

/// Strip every CSS comment whose first character is not `#`
pub fn strip_comments(css: &str) -> String {
    CSS_COMMENT.replace_all(css, "").into_owned()
}

/// Discovered pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Plugin name to options, in run order. `false` disables an entry.
    pub plugins: IndexMap<String, Value>,

    /// File the configuration was read from
    #[serde(skip)]
    pub file: Option<PathBuf>,
}

impl PipelineConfig {
    /// Parse a config file's content
    pub fn from_json(content: &str, file: &Path) -> Result<Self> {
        let mut config: Self = serde_json::from_str(content)
            .map_err(|e| PluginError::ConfigError {
                message: format!("Failed to parse CSS pipeline config {}: {}", file.display(), e),
            })?;
        config.file = Some(file.to_path_buf());
        Ok(config)
    }

    /// Search `start` and its ancestors for the first config file
    pub async fn discover(start: &Path) -> Result<Self> {
        for dir in start.ancestors() {
            for name in CONFIG_FILE_NAMES {
                let candidate = dir.join(name);
                let exists = tokio::fs::try_exists(&candidate).await
                    .map_err(|e| PluginError::ConfigError {
                        message: format!("Failed to check for config file {}: {}", candidate.display(), e),
                    })?;
                if !exists {
                    continue;
                }

                tracing::debug!(config = %candidate.display(), "Found CSS pipeline config");
                let content = tokio::fs::read_to_string(&candidate).await
                    .map_err(|e| PluginError::ConfigError {
                        message: format!("Failed to read config file {}: {}", candidate.display(), e),
                    })?;
                return Self::from_json(&content, &candidate);
            }
        }

        Err(PluginError::PipelineConfigNotFound {
            searched: start.display().to_string(),
        })
    }

    /// Names of the enabled plugins, in run order
    pub fn enabled_plugins(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.plugins
            .iter()
            .filter(|(_, options)| !matches!(options, Value::Bool(false)))
            .map(|(name, options)| (name.as_str(), options))
    }
}

/// Per-run information handed to each plugin
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext<'a> {
    /// Stylesheet being processed
    pub from: &'a Path,
    /// Project root
    pub root: &'a Path,
}

/// A text-to-text pipeline pass
pub trait CssPlugin: Send + Sync {
    fn name(&self) -> &str;

    fn process(&self, css: String, ctx: &ProcessContext<'_>) -> Result<String>;
}

/// Source map emission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceMapMode {
    #[default]
    Disabled,
    Inline,
}

impl From<bool> for SourceMapMode {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Inline } else { Self::Disabled }
    }
}

/// Options for one pipeline run
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub from: PathBuf,
    pub map: SourceMapMode,
}

/// Result of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessResult {
    pub css: String,
}

/// An assembled pipeline
pub struct CssPipeline {
    plugins: Vec<Box<dyn CssPlugin>>,
    minify: bool,
    targets: Option<Browsers>,
}

impl CssPipeline {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            minify: false,
            targets: None,
        }
    }

    /// Instantiate every enabled plugin named in `config`
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let mut pipeline = Self::new();

        for (name, options) in config.enabled_plugins() {
            match name {
                "tailwindcss" => pipeline = pipeline.with_plugin(TailwindPlugin::from_options(options)?),
                "postcss-import" | "import" => pipeline = pipeline.with_plugin(ImportPlugin::new()),
                "cssnano" => pipeline = pipeline.with_minifier(),
                "autoprefixer" => pipeline = pipeline.with_targets(browsers_from_options(options)?),
                other => return Err(PluginError::UnknownPlugin(other.to_string())),
            }
        }

        Ok(pipeline)
    }

    pub fn with_plugin(mut self, plugin: impl CssPlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Append the minification pass
    pub fn with_minifier(mut self) -> Self {
        self.minify = true;
        self
    }

    /// Prefix and lower the output for the given browsers
    pub fn with_targets(mut self, browsers: Browsers) -> Self {
        self.targets = Some(browsers);
        self
    }

    pub fn targets(&self) -> Option<Browsers> {
        self.targets
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn minifies(&self) -> bool {
        self.minify
    }

    /// Run every pass over `source`, then parse and print the result
    pub fn process(&self, source: &str, root: &Path, options: &ProcessOptions) -> Result<ProcessResult> {
        let ctx = ProcessContext {
            from: &options.from,
            root,
        };

        let mut css = source.to_string();
        for plugin in &self.plugins {
            tracing::debug!(plugin = plugin.name(), "Running CSS pipeline plugin");
            css = plugin.process(css, &ctx)?;
        }

        let css = stringify(&css, &options.from, self.minify, self.targets, options.map)?;
        Ok(ProcessResult { css })
    }
}

impl Default for CssPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Browsers for `autoprefixer`, from its `overrideBrowserslist` option
fn browsers_from_options(options: &Value) -> Result<Browsers> {
    let queries: Vec<String> = match options.get("overrideBrowserslist") {
        None | Some(Value::Null) => vec![DEFAULT_BROWSERSLIST.to_string()],
        Some(Value::String(query)) => vec![query.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| PluginError::config("autoprefixer overrideBrowserslist entries must be strings"))
            })
            .collect::<Result<_>>()?,
        Some(other) => {
            return Err(PluginError::config(format!(
                "Invalid autoprefixer overrideBrowserslist: {}",
                other
            )))
        }
    };

    Browsers::from_browserslist(&queries)
        .map_err(|e| PluginError::config(format!("Invalid browserslist query {:?}: {}", queries, e)))?
        .ok_or_else(|| PluginError::config(format!("Browserslist query {:?} matched no browsers", queries)))
}

fn stringify(
    css: &str,
    from: &Path,
    minify: bool,
    browsers: Option<Browsers>,
    map: SourceMapMode,
) -> Result<String> {
    let filename = from.display().to_string();
    let css_error = |message: String| PluginError::CssError {
        path: filename.clone(),
        message,
    };
    let targets = browsers.map(Targets::from).unwrap_or_default();

    let preserved: Vec<&str> = HASH_COMMENT.find_iter(css).map(|m| m.as_str()).collect();
    let body = HASH_COMMENT.replace_all(css, "");

    let mut stylesheet = StyleSheet::parse(
        &body,
        ParserOptions {
            filename: filename.clone(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| css_error(e.to_string()))?;

    // Prefixing happens in the minify pass; the printer decides the layout
    if minify || browsers.is_some() {
        stylesheet
            .minify(MinifyOptions {
                targets,
                ..MinifyOptions::default()
            })
            .map_err(|e| css_error(e.to_string()))?;
    }

    let mut source_map = match map {
        SourceMapMode::Inline => {
            let mut source_map = SourceMap::new("/");
            source_map.add_source(&filename);
            source_map
                .set_source_content(0, &body)
                .map_err(|e| css_error(format!("{:?}", e)))?;
            Some(source_map)
        }
        SourceMapMode::Disabled => None,
    };

    let output = stylesheet
        .to_css(PrinterOptions {
            minify,
            source_map: source_map.as_mut(),
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| css_error(e.to_string()))?;

    let mut code = output.code;
    for comment in preserved {
        if !code.is_empty() && !code.ends_with('\n') {
            code.push('\n');
        }
        code.push_str(comment);
        code.push('\n');
    }

    if let Some(mut source_map) = source_map {
        let json = source_map
            .to_json(None)
            .map_err(|e| css_error(format!("{:?}", e)))?;
        code.push_str(&format!(
            "\n/*# sourceMappingURL=data:application/json;base64,{} */",
            base64::engine::general_purpose::STANDARD.encode(json)
        ));
    }

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn options(from: &Path, map: SourceMapMode) -> ProcessOptions {
        ProcessOptions {
            from: from.to_path_buf(),
            map,
        }
    }

    #[test]
    fn test_strip_comments_keeps_hash_pragmas() {
        let css = "/* header */a{color:red}/*# sourceMappingURL=x.map */\n/*\nmulti\nline\n*/b{}";
        assert_eq!(
            strip_comments(css),
            "a{color:red}/*# sourceMappingURL=x.map */\nb{}"
        );
    }

    #[test]
    fn test_strip_comments_leaves_plain_css() {
        let css = ".a { color: red }\n.b::after { content: \"\\2014\" }";
        assert_eq!(strip_comments(css), css);
    }

    #[test]
    fn test_config_parsing_keeps_order() {
        let config = PipelineConfig::from_json(
            r#"{ "plugins": { "postcss-import": {}, "tailwindcss": {}, "cssnano": false } }"#,
            Path::new("postcss.config.json"),
        )
        .unwrap();

        let names: Vec<_> = config.enabled_plugins().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["postcss-import", "tailwindcss"]);
        assert_eq!(config.file.as_deref(), Some(Path::new("postcss.config.json")));
    }

    #[tokio::test]
    async fn test_discover_searches_ancestors() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("packages/app");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(".postcssrc.json"), r#"{ "plugins": { "tailwindcss": true } }"#).unwrap();

        let config = PipelineConfig::discover(&nested).await.unwrap();
        assert!(config.plugins.contains_key("tailwindcss"));
        assert_eq!(config.file, Some(dir.path().join(".postcssrc.json")));
    }

    #[tokio::test]
    async fn test_discover_prefers_nearest() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("app");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("postcss.config.json"), r#"{ "plugins": { "cssnano": {} } }"#).unwrap();
        fs::write(nested.join("postcss.config.json"), r#"{ "plugins": {} }"#).unwrap();

        let config = PipelineConfig::discover(&nested).await.unwrap();
        assert!(config.plugins.is_empty());
    }

    #[tokio::test]
    async fn test_discover_reports_io_errors() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("theme.css");
        fs::write(&file, ".a {}").unwrap();

        // Looking for a config "inside" a regular file fails with ENOTDIR
        let err = PipelineConfig::discover(&file).await.unwrap_err();
        assert!(matches!(err, PluginError::ConfigError { .. }), "got {:?}", err);
    }

    #[test]
    fn test_unknown_plugin_rejected() {
        let mut config = PipelineConfig::default();
        config.plugins.insert("postcss-does-not-exist".to_string(), Value::Bool(true));

        let err = CssPipeline::from_config(&config).err().unwrap();
        assert!(matches!(err, PluginError::UnknownPlugin(ref name) if name == "postcss-does-not-exist"));
    }

    #[test]
    fn test_autoprefixer_uses_default_browsers() {
        let mut config = PipelineConfig::default();
        config.plugins.insert("tailwindcss".to_string(), serde_json::json!({}));
        config.plugins.insert("autoprefixer".to_string(), serde_json::json!({}));

        let pipeline = CssPipeline::from_config(&config).unwrap();
        assert_eq!(pipeline.plugin_names(), vec!["tailwindcss"]);
        assert!(pipeline.targets().is_some());
        assert!(!pipeline.minifies());
    }

    #[test]
    fn test_autoprefixer_adds_prefixes() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("style.css");
        let mut config = PipelineConfig::default();
        config.plugins.insert(
            "autoprefixer".to_string(),
            serde_json::json!({ "overrideBrowserslist": ["safari 10"] }),
        );

        let result = CssPipeline::from_config(&config)
            .unwrap()
            .process(".a { user-select: none; }", dir.path(), &options(&from, SourceMapMode::Disabled))
            .unwrap();
        assert!(result.css.contains("-webkit-user-select: none"));
        assert!(result.css.contains('\n'));
    }

    #[test]
    fn test_autoprefixer_rejects_bad_browserslist() {
        let mut config = PipelineConfig::default();
        config.plugins.insert(
            "autoprefixer".to_string(),
            serde_json::json!({ "overrideBrowserslist": 42 }),
        );

        let err = CssPipeline::from_config(&config).err().unwrap();
        assert!(matches!(err, PluginError::ConfigError { .. }));
    }

    #[test]
    fn test_hash_comments_survive_stringify() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("style.css");
        let source = "/*# keep-me */\n/* drop-me */\n.a { color: red; }\n";

        for pipeline in [CssPipeline::new(), CssPipeline::new().with_minifier()] {
            let result = pipeline
                .process(source, dir.path(), &options(&from, SourceMapMode::Disabled))
                .unwrap();
            let css = strip_comments(&result.css);
            assert!(css.contains("/*# keep-me */"), "hash comment lost: {:?}", css);
            assert!(!css.contains("drop-me"));
            assert!(css.contains(".a"));
        }
    }

    #[test]
    fn test_from_config_builds_plugins() {
        let mut config = PipelineConfig::default();
        config.plugins.insert("postcss-import".to_string(), Value::Bool(true));
        config.plugins.insert("tailwindcss".to_string(), serde_json::json!({}));
        config.plugins.insert("cssnano".to_string(), serde_json::json!({}));

        let pipeline = CssPipeline::from_config(&config).unwrap();
        assert_eq!(pipeline.plugin_names(), vec!["postcss-import", "tailwindcss"]);
        assert!(pipeline.minifies());
    }

    #[test]
    fn test_process_pretty_and_minified() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("style.css");
        let source = ".card {\n  color: red;\n  padding: 10px;\n}\n";

        let pretty = CssPipeline::new()
            .process(source, dir.path(), &options(&from, SourceMapMode::Disabled))
            .unwrap();
        assert!(pretty.css.contains('\n'));
        assert!(pretty.css.contains("color: red"));

        let minified = CssPipeline::new()
            .with_minifier()
            .process(source, dir.path(), &options(&from, SourceMapMode::Disabled))
            .unwrap();
        assert!(!minified.css.contains('\n'));
        assert!(minified.css.contains(".card{"));
    }

    #[test]
    fn test_process_inline_source_map() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("style.css");

        let result = CssPipeline::new()
            .process(".a { color: blue; }", dir.path(), &options(&from, SourceMapMode::Inline))
            .unwrap();
        assert!(result.css.contains("/*# sourceMappingURL=data:application/json;base64,"));
        // The pragma survives comment stripping
        assert!(strip_comments(&result.css).contains("sourceMappingURL"));
    }

    #[test]
    fn test_process_syntax_error_names_file() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("broken.css");

        let err = CssPipeline::new()
            .process("..a {}", dir.path(), &options(&from, SourceMapMode::Disabled))
            .err();

        match err {
            Some(PluginError::CssError { path, .. }) => assert!(path.ends_with("broken.css")),
            other => panic!("expected a CSS error, got {:?}", other),
        }
    }
}
