use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::PluginConfig;
use crate::errors::Result;

/// Tailwind Web Components CLI - Compiles a Tailwind stylesheet into a module for Vue custom elements
#[derive(Parser, Debug)]
#[command(name = "twc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(
        long = "log-level",
        global = true,
        value_name = "LEVEL",
        default_value = "info",
        env = "TWC_LOG_LEVEL"
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile the stylesheet module once
    Build(BuildArgs),
    /// Recompile on every change under the project root and stream live updates
    Watch(BuildArgs),
}

/// Arguments shared by the build and watch commands
#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    /// Project root
    #[arg(
        short = 'r',
        long = "root",
        value_name = "DIR",
        default_value = ".",
        help = "Project root the stylesheet and pipeline config are resolved against"
    )]
    pub root: PathBuf,

    /// Configuration file path (JSON)
    #[arg(
        short = 'c',
        long = "config",
        value_name = "PATH",
        help = "Path to a plugin configuration file (JSON format)"
    )]
    pub config: Option<PathBuf>,

    /// Entry stylesheet
    #[arg(
        short = 's',
        long = "stylesheet",
        value_name = "PATH",
        help = "Entry stylesheet, overriding the configuration file"
    )]
    pub stylesheet: Option<String>,

    /// Build mode
    #[arg(
        short = 'm',
        long = "mode",
        value_name = "MODE",
        help = "Build mode; anything but \"production\" is a development build"
    )]
    pub mode: Option<String>,

    /// Output module path
    #[arg(
        short = 'o',
        long = "out",
        value_name = "PATH",
        help = "Where the generated module is written (stdout when omitted)"
    )]
    pub out: Option<PathBuf>,

    /// Build report path
    #[arg(
        long = "report",
        value_name = "PATH",
        help = "Write a JSON build report"
    )]
    pub report: Option<PathBuf>,

    #[arg(
        long = "source-map",
        default_value_t = false,
        help = "Append an inline source map to the stylesheet"
    )]
    pub source_map: bool,

    #[arg(
        long = "no-inject-css",
        default_value_t = false,
        help = "Do not adopt the stylesheet into the document"
    )]
    pub no_inject_css: bool,

    #[arg(
        long = "no-minify",
        default_value_t = false,
        help = "Disable minification of production builds"
    )]
    pub no_minify: bool,
}

impl BuildArgs {
    /// Load the configuration file, if any, and apply the flags on top of it
    pub fn plugin_config(&self) -> Result<PluginConfig> {
        let mut config = match &self.config {
            Some(path) => PluginConfig::from_file(path)?,
            None => PluginConfig::default(),
        };

        if let Some(stylesheet) = &self.stylesheet {
            config.stylesheet = Some(stylesheet.clone());
        }
        if self.source_map {
            config.source_map = true;
        }
        if self.no_inject_css {
            config.inject_css = false;
        }
        if self.no_minify {
            config.minify = false;
        }

        Ok(config)
    }

    /// The requested mode, or `default` when none was given
    pub fn mode_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.mode.as_deref().unwrap_or(default)
    }
}
