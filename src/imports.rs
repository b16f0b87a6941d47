//! `postcss-import` pipeline plugin: inlines local `@import` rules

use regex::{Captures, Regex};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::errors::{PluginError, Result};
use crate::pipeline::{CssPlugin, ProcessContext};

static IMPORT_RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+(?:url\(\s*)?["']([^"']+)["']\s*\)?\s*;"#)
        .expect("import pattern is valid")
});

/// Inlines `@import "file.css";` rules, each file at most once
#[derive(Debug, Clone, Default)]
pub struct ImportPlugin;

impl ImportPlugin {
    pub fn new() -> Self {
        Self
    }

    fn resolve(specifier: &str, importer: &Path, root: &Path) -> PathBuf {
        let base = importer.parent().unwrap_or(root);

        if specifier.starts_with('/') {
            return PathBuf::from(specifier);
        }
        if specifier.starts_with('.') {
            return base.join(specifier);
        }

        let package = root.join("node_modules").join(specifier);
        if package.is_file() {
            package
        } else {
            base.join(specifier)
        }
    }

    fn inline(
        &self,
        css: &str,
        importer: &Path,
        root: &Path,
        seen: &mut HashSet<PathBuf>,
    ) -> Result<String> {
        let mut failure = None;

        let output = IMPORT_RULE.replace_all(css, |captures: &Captures<'_>| {
            if failure.is_some() {
                return String::new();
            }

            let specifier = &captures[1];
            if is_remote(specifier) {
                return captures[0].to_string();
            }

            let path = Self::resolve(specifier, importer, root);
            let key = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !seen.insert(key) {
                tracing::debug!(import = %path.display(), "Skipping already inlined import");
                return String::new();
            }

            let result = match std::fs::read_to_string(&path) {
                Ok(content) => self.inline(&content, &path, root, seen),
                Err(e) => Err(PluginError::CssError {
                    path: importer.display().to_string(),
                    message: format!("Failed to import {}: {}", specifier, e),
                }),
            };

            match result {
                Ok(inlined) => inlined,
                Err(e) => {
                    failure = Some(e);
                    String::new()
                }
            }
        });

        match failure {
            Some(e) => Err(e),
            None => Ok(output.into_owned()),
        }
    }
}

fn is_remote(specifier: &str) -> bool {
    specifier.starts_with("http://") ||
    specifier.starts_with("https://") ||
    specifier.starts_with("//")
}

impl CssPlugin for ImportPlugin {
    fn name(&self) -> &str {
        "postcss-import"
    }

    fn process(&self, css: String, ctx: &ProcessContext<'_>) -> Result<String> {
        let mut seen = HashSet::new();
        seen.insert(ctx.from.canonicalize().unwrap_or_else(|_| ctx.from.to_path_buf()));
        self.inline(&css, ctx.from, ctx.root, &mut seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn run(dir: &Path, entry: &str) -> Result<String> {
        let from = dir.join("style.css");
        let ctx = ProcessContext { from: &from, root: dir };
        ImportPlugin::new().process(entry.to_string(), &ctx)
    }

    #[test]
    fn test_inlines_relative_imports_recursively() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("parts")).unwrap();
        fs::write(dir.path().join("parts/buttons.css"), "@import \"./colors.css\";\n.btn { color: var(--brand); }").unwrap();
        fs::write(dir.path().join("parts/colors.css"), ":root { --brand: teal; }").unwrap();

        let output = run(dir.path(), "@import url(\"./parts/buttons.css\");\nbody { margin: 0; }").unwrap();
        assert_eq!(
            output,
            ":root { --brand: teal; }\n.btn { color: var(--brand); }\nbody { margin: 0; }"
        );
    }

    #[test]
    fn test_duplicate_imports_inlined_once() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.css"), ".a {}").unwrap();

        let output = run(dir.path(), "@import './a.css';\n@import \"./a.css\";").unwrap();
        assert_eq!(output, ".a {}\n");
    }

    #[test]
    fn test_bare_specifier_from_node_modules() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/theme")).unwrap();
        fs::write(dir.path().join("node_modules/theme/base.css"), ".base {}").unwrap();

        let output = run(dir.path(), "@import \"theme/base.css\";").unwrap();
        assert_eq!(output, ".base {}");
    }

    #[test]
    fn test_remote_imports_untouched() {
        let dir = tempdir().unwrap();
        let entry = "@import url(\"https://fonts.example.com/inter.css\");";
        assert_eq!(run(dir.path(), entry).unwrap(), entry);
    }

    #[test]
    fn test_missing_import_errors() {
        let dir = tempdir().unwrap();
        let err = run(dir.path(), "@import \"./missing.css\";").unwrap_err();
        assert!(matches!(err, PluginError::CssError { .. }));
        assert!(err.to_string().contains("missing.css"));
    }
}
