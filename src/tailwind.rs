//! `tailwindcss` pipeline plugin
//!
//! Replaces `@tailwind` directives in the entry stylesheet with utility CSS
//! generated for the classes found in the project's content files, and
//! inlines the declarations of classes named by `@apply`.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tailwind_rs::TailwindBuilder;

use crate::errors::{PluginError, Result};
use crate::pipeline::{CssPlugin, ProcessContext};
use crate::scanner;

static TAILWIND_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@tailwind\s+(base|components|utilities|variants)\s*;?")
        .expect("tailwind directive pattern is valid")
});

static APPLY_RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@apply\s+([^;{}]+?)\s*(;|\})").expect("apply pattern is valid")
});

static BRACE_GROUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([^{}]*)\}").expect("brace group pattern is valid")
});

/// Options accepted under `plugins.tailwindcss`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailwindOptions {
    /// Content globs to scan, relative to the project root
    pub content: Vec<String>,

    /// Emit the preflight reset when `@tailwind base` is present
    pub preflight: bool,
}

impl Default for TailwindOptions {
    fn default() -> Self {
        Self {
            content: vec![
                "./index.html".to_string(),
                "./src/**/*.{vue,js,ts,jsx,tsx}".to_string(),
            ],
            preflight: true,
        }
    }
}

/// Pipeline plugin generating Tailwind utilities
#[derive(Debug, Clone, Default)]
pub struct TailwindPlugin {
    options: TailwindOptions,
}

impl TailwindPlugin {
    pub fn new(options: TailwindOptions) -> Self {
        Self { options }
    }

    /// Build from the plugin's entry in the pipeline config (`true`, `{}` or an options object)
    pub fn from_options(options: &Value) -> Result<Self> {
        let options = match options {
            Value::Bool(_) | Value::Null => TailwindOptions::default(),
            other => serde_json::from_value(other.clone())
                .map_err(|e| PluginError::config(format!("Invalid tailwindcss options: {}", e)))?,
        };
        Ok(Self::new(options))
    }

    pub fn options(&self) -> &TailwindOptions {
        &self.options
    }

    /// Resolve content globs to the files they match under `root`
    pub fn content_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut seen = HashSet::new();

        for pattern in self.options.content.iter().flat_map(|p| expand_braces(p)) {
            let pattern = pattern.strip_prefix("./").unwrap_or(&pattern);
            let full = if Path::new(pattern).is_absolute() {
                PathBuf::from(pattern)
            } else {
                root.join(pattern)
            };

            for entry in glob::glob(&full.to_string_lossy())? {
                let path = entry?;
                if path.is_dir() || path.components().any(|c| c.as_os_str() == "node_modules") {
                    continue;
                }
                if seen.insert(path.clone()) {
                    files.push(path);
                }
            }
        }

        Ok(files)
    }

    /// Generate CSS for the given candidates
    pub fn generate(&self, candidates: impl IntoIterator<Item = String>, preflight: bool) -> Result<String> {
        let mut builder = TailwindBuilder::default();
        builder.preflight.disable = !preflight;

        for candidate in candidates {
            // Candidates that are not utilities are skipped
            let _ = builder.trace(&candidate, false);
        }

        builder.bundle()
            .map_err(|e| PluginError::TailwindError(e.to_string()))
    }
}

impl CssPlugin for TailwindPlugin {
    fn name(&self) -> &str {
        "tailwindcss"
    }

    fn process(&self, css: String, ctx: &ProcessContext<'_>) -> Result<String> {
        let css = if APPLY_RULE.is_match(&css) {
            expand_apply(&css, ctx.from)?
        } else {
            css
        };

        let directives: Vec<_> = TAILWIND_DIRECTIVE.captures_iter(&css)
            .map(|c| (c.get(0).map(|m| m.range()), c.get(1).map(|m| m.as_str().to_string())))
            .filter_map(|(range, layer)| Some((range?, layer?)))
            .collect();

        let Some((first, _)) = directives.first().cloned() else {
            return Ok(css);
        };

        let files = self.content_files(ctx.root)?;
        let candidates = scanner::scan_files(&files)?;
        tracing::debug!(
            files = files.len(),
            candidates = candidates.len(),
            "Scanned Tailwind content"
        );

        let wants_base = directives.iter().any(|(_, layer)| layer == "base");
        let generated = self.generate(candidates, wants_base && self.options.preflight)?;

        let mut output = String::with_capacity(css.len() + generated.len());
        let mut cursor = 0;
        for (range, _) in &directives {
            output.push_str(&css[cursor..range.start]);
            if range.start == first.start {
                output.push_str(&generated);
            }
            cursor = range.end;
        }
        output.push_str(&css[cursor..]);

        Ok(output)
    }
}

/// Replace every `@apply a b c;` with the declarations of those classes
///
/// Variants (`hover:`, `md:`, ...) become nested rules or nested at-rules
/// under the applying rule. A trailing `!important` marks every declaration.
pub fn expand_apply(css: &str, from: &Path) -> Result<String> {
    let mut failure = None;

    let output = APPLY_RULE.replace_all(css, |captures: &regex::Captures<'_>| {
        if failure.is_some() {
            return String::new();
        }

        let mut important = false;
        let classes: Vec<&str> = captures[1]
            .split_whitespace()
            .filter(|class| {
                let flag = *class == "!important";
                important |= flag;
                !flag
            })
            .collect();

        let mut expanded = Vec::with_capacity(classes.len());
        for class in classes {
            match apply_class(class, important, from) {
                Ok(css) => expanded.push(css),
                Err(e) => {
                    failure = Some(e);
                    return String::new();
                }
            }
        }
        let mut css = expanded.join(" ");
        if &captures[2] == "}" {
            css.push_str(" }");
        }
        css
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(output.into_owned()),
    }
}

fn apply_class(class: &str, important: bool, from: &Path) -> Result<String> {
    let unknown = || PluginError::CssError {
        path: from.display().to_string(),
        message: format!("The `{}` class does not exist", class),
    };

    let mut builder = TailwindBuilder::default();
    builder.preflight.disable = true;
    builder.trace(class, false).map_err(|_| unknown())?;
    let bundle = builder.bundle()
        .map_err(|e| PluginError::TailwindError(e.to_string()))?;

    let selector = format!(".{}", escape_class(class));
    let rendered: Vec<String> = top_level_blocks(&bundle)
        .into_iter()
        .filter_map(|(prelude, body)| render_applied(prelude, body, &selector, important))
        .collect();

    if rendered.is_empty() {
        return Err(unknown());
    }
    Ok(rendered.join(" "))
}

/// Rewrite one generated block so it can live inside the applying rule
fn render_applied(prelude: &str, body: &str, selector: &str, important: bool) -> Option<String> {
    if prelude.starts_with('@') {
        let inner = top_level_blocks(body);
        if inner.is_empty() {
            return Some(format!("{} {{ {} }}", prelude, declarations(body, important)));
        }
        let nested: Vec<String> = inner
            .into_iter()
            .filter_map(|(prelude, body)| render_applied(prelude, body, selector, important))
            .collect();
        return (!nested.is_empty()).then(|| format!("{} {{ {} }}", prelude, nested.join(" ")));
    }

    let parts: Vec<String> = prelude
        .split(',')
        .filter_map(|part| nest_selector(part.trim(), selector))
        .collect();

    if parts.is_empty() {
        return None;
    }
    if parts.iter().all(|part| part == "&") {
        return Some(declarations(body, important));
    }
    Some(format!("{} {{ {} }}", parts.join(", "), declarations(body, important)))
}

/// Replace the utility's own class in `part` with the nesting selector
fn nest_selector(part: &str, selector: &str) -> Option<String> {
    if part.contains(selector) {
        return Some(part.replacen(selector, "&", 1));
    }

    // Fall back to the leading class when escaping differs
    let rest = part.strip_prefix('.')?;
    let mut chars = rest.char_indices();
    let mut end = rest.len();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            c if c.is_alphanumeric() || c == '-' || c == '_' => {}
            _ => {
                end = i;
                break;
            }
        }
    }
    Some(format!("&{}", &rest[end..]))
}

fn declarations(body: &str, important: bool) -> String {
    body.split(';')
        .map(str::trim)
        .filter(|declaration| !declaration.is_empty())
        .map(|declaration| {
            if important && !declaration.ends_with("!important") {
                format!("{} !important;", declaration)
            } else {
                format!("{};", declaration)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape a class name for use in a selector
pub fn escape_class(class: &str) -> String {
    let mut escaped = String::with_capacity(class.len());
    for c in class.chars() {
        if !(c.is_alphanumeric() || c == '-' || c == '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Split CSS text into its top-level `(prelude, body)` blocks, skipping comments
fn top_level_blocks(css: &str) -> Vec<(&str, &str)> {
    let bytes = css.as_bytes();
    let mut blocks = Vec::new();
    let mut depth = 0usize;
    let mut prelude_start = 0;
    let mut prelude_end = 0;
    let mut body_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = css[i + 2..].find("*/").map_or(bytes.len(), |end| i + 2 + end + 2);
                if depth == 0 {
                    prelude_start = i;
                }
                continue;
            }
            b'{' => {
                if depth == 0 {
                    prelude_end = i;
                    body_start = i + 1;
                }
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    blocks.push((css[prelude_start..prelude_end].trim(), css[body_start..i].trim()));
                    prelude_start = i + 1;
                }
            }
            b';' if depth == 0 => prelude_start = i + 1,
            _ => {}
        }
        i += 1;
    }

    blocks
}

/// Expand `{a,b}` groups in a glob pattern, which the glob crate does not support
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(group) = BRACE_GROUP.captures(pattern).and_then(|c| c.get(0).zip(c.get(1))) else {
        return vec![pattern.to_string()];
    };

    let (whole, inner) = group;
    let prefix = &pattern[..whole.start()];
    let suffix = &pattern[whole.end()..];

    inner.as_str()
        .split(',')
        .flat_map(|alternative| expand_braces(&format!("{prefix}{alternative}{suffix}")))
        .collect()
}
