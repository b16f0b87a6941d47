//! Class candidate scanning for content files
//!
//! Script files are parsed and every string literal is split into candidate
//! class names. Markup files (Vue single-file components, HTML) are scanned for
//! `class` attribute values instead. Candidates are only a superset of the
//! classes in use; the Tailwind builder decides which of them generate CSS.

use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use swc_core::common::{FileName, Globals, SourceMap, GLOBALS};
use swc_core::common::sync::Lrc;
use swc_core::ecma::ast::*;
use swc_core::ecma::parser::{parse_file_as_module, EsSyntax, Syntax, TsSyntax};
use swc_core::ecma::visit::{Visit, VisitWith};

use crate::errors::{PluginError, Result};

static CLASS_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:\bclass|\bclassName|:class|v-bind:class)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("class attribute pattern is valid")
});

static QUOTED_STRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"\n]*)"|'([^'\n]*)'|`([^`]*)`"#).expect("quoted string pattern is valid")
});

const SCRIPT_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx"];

/// Visitor collecting candidate class names from string literals
#[derive(Default)]
struct StringLiteralCollector {
    candidates: Vec<String>,
}

impl StringLiteralCollector {
    fn collect(&mut self, value: &str) {
        self.candidates.extend(split_candidates(value));
    }
}

impl Visit for StringLiteralCollector {
    fn visit_str(&mut self, node: &Str) {
        self.collect(&node.value);
    }

    fn visit_tpl(&mut self, node: &Tpl) {
        for quasi in &node.quasis {
            if let Some(cooked) = &quasi.cooked {
                self.collect(cooked);
            } else {
                self.collect(&quasi.raw);
            }
        }
        node.visit_children_with(self);
    }
}

/// Whether `token` could plausibly be a Tailwind class
pub fn is_candidate(token: &str) -> bool {
    if token.is_empty() || token.len() > 100 {
        return false;
    }

    if token.contains('<') || token.contains('>') ||
       token.contains('{') || token.contains('}') ||
       token.contains(';') {
        return false;
    }

    token.chars().all(|c| {
        c.is_alphanumeric() ||
        "-:/.[]!()#%&*_@,".contains(c)
    })
}

fn split_candidates(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| "'\"`{},():".contains(c)))
        .filter(|token| is_candidate(token))
        .map(str::to_string)
}

fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SCRIPT_EXTENSIONS.contains(&ext))
}

fn script_syntax(path: &Path) -> Syntax {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ts") | Some("mts") | Some("cts") | Some("tsx") => Syntax::Typescript(TsSyntax {
            tsx: true,
            ..Default::default()
        }),
        _ => Syntax::Es(EsSyntax {
            jsx: true,
            ..Default::default()
        }),
    }
}

/// Parse a script and collect candidates from its string literals
pub fn extract_from_script(content: &str, path: &Path) -> Result<Vec<String>> {
    let source_map: Lrc<SourceMap> = Default::default();
    let source_file = source_map.new_source_file(
        FileName::Real(path.to_path_buf()).into(),
        content.to_string(),
    );

    let module = GLOBALS.set(&Globals::new(), || {
        parse_file_as_module(
            &source_file,
            script_syntax(path),
            EsVersion::latest(),
            None,
            &mut vec![],
        )
        .map_err(|e| PluginError::ParseError {
            path: path.display().to_string(),
            message: format!("Failed to parse JavaScript/TypeScript: {:?}", e),
        })
    })?;

    let mut collector = StringLiteralCollector::default();
    module.visit_with(&mut collector);

    Ok(collector.candidates)
}

/// Collect candidates from `class`-like attribute values in markup
pub fn extract_from_markup(content: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    for captures in CLASS_ATTRIBUTE.captures_iter(content) {
        if let Some(value) = captures.get(1).or_else(|| captures.get(2)) {
            candidates.extend(split_candidates(value.as_str()));
        }
    }

    candidates
}

fn extract_from_quoted_strings(content: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    for captures in QUOTED_STRING.captures_iter(content) {
        let value = captures.get(1)
            .or_else(|| captures.get(2))
            .or_else(|| captures.get(3));
        if let Some(value) = value {
            candidates.extend(split_candidates(value.as_str()));
        }
    }

    candidates
}

/// Extract candidates from one file's content, choosing the strategy by extension
pub fn extract_candidates(path: &Path, content: &str) -> Vec<String> {
    if !is_script(path) {
        return extract_from_markup(content);
    }

    match extract_from_script(content, path) {
        Ok(candidates) => candidates,
        Err(e) => {
            // Half-edited files are common while watching; scan them loosely.
            tracing::warn!("{}; falling back to quoted-string scan", e);
            extract_from_quoted_strings(content)
        }
    }
}

/// Read and scan files in parallel, returning sorted unique candidates
pub fn scan_files(files: &[PathBuf]) -> Result<BTreeSet<String>> {
    use rayon::prelude::*;

    let results: std::result::Result<Vec<_>, PluginError> = files
        .par_iter()
        .map(|path| {
            let content = std::fs::read_to_string(path)
                .map_err(|e| PluginError::ParseError {
                    path: path.display().to_string(),
                    message: format!("Failed to read file: {}", e),
                })?;
            Ok(extract_candidates(path, &content))
        })
        .collect();

    Ok(results?.into_iter().flatten().collect())
}
