#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// A throwaway project directory
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    /// Project with a pipeline config declaring `plugins`
    pub fn new(plugins: &str) -> Self {
        let project = Self { dir: tempdir().unwrap() };
        project.write("postcss.config.json", &format!(r#"{{ "plugins": {} }}"#, plugins));
        project
    }

    /// Project without any pipeline config
    pub fn bare() -> Self {
        Self { dir: tempdir().unwrap() }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}
