//! Path filtering for watch events

use crate::discovery::IgnoreSet;
use crate::job::is_shader_source;
use std::path::{Path, PathBuf};

/// Decides which changed paths are shader sources worth compiling.
#[derive(Debug, Clone)]
pub struct ShaderFilter {
    root: PathBuf,
    ignore: IgnoreSet,
}

impl ShaderFilter {
    pub fn new(root: impl Into<PathBuf>, ignore: IgnoreSet) -> Self {
        Self {
            root: root.into(),
            ignore,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extension and ignore-pattern check only; does not touch the filesystem.
    pub fn matches(&self, path: &Path) -> bool {
        is_shader_source(path) && !self.ignore.is_ignored(&self.root, path)
    }

    /// Full check: a matching path that is currently a regular file.
    pub fn should_compile(&self, path: &Path) -> bool {
        self.matches(path) && path.is_file()
    }
}
