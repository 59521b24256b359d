//! Shader job discovery
//!
//! Walks the source tree and returns every shader source in lexicographic
//! path order. A missing or unreadable root is an error, never "zero jobs".

use crate::error::{BuildError, Result};
use crate::job::{is_shader_source, output_path_for};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Compiled ignore globs, matched against paths relative to the source root.
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl IgnoreSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern).map_err(|source| BuildError::IgnorePattern {
                pattern: pattern.to_string(),
                source,
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| BuildError::IgnorePattern {
            pattern: patterns
                .iter()
                .map(|p| p.as_ref())
                .collect::<Vec<_>>()
                .join(", "),
            source,
        })?;

        Ok(Self {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            set,
        })
    }

    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// True when `path` (absolute or relative to `root`) is ignored.
    pub fn is_ignored(&self, root: &Path, path: &Path) -> bool {
        if self.set.is_empty() {
            return false;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        let normalized = relative.to_string_lossy().replace('\\', "/");
        self.set.is_match(normalized.as_str())
    }
}

impl Default for IgnoreSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Find every shader source under `root`, sorted by path.
pub fn discover_shaders(root: &Path, ignore: &IgnoreSet) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(BuildError::SourceDirNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(BuildError::SourceNotADirectory(root.to_path_buf()));
    }

    let mut shaders = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|source| BuildError::Walk {
            path: root.to_path_buf(),
            source,
        })?;

        if !entry.file_type().is_file() || !is_shader_source(entry.path()) {
            continue;
        }
        if ignore.is_ignored(root, entry.path()) {
            debug!(path = %entry.path().display(), "ignored by pattern");
            continue;
        }
        shaders.push(entry.into_path());
    }

    shaders.sort();
    Ok(dedupe_outputs(shaders))
}

/// Drop sources whose flat output name collides with an earlier source.
fn dedupe_outputs(shaders: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut kept = Vec::with_capacity(shaders.len());

    for shader in shaders {
        let key = output_path_for(&shader, Path::new(""));
        if let Some(first) = claimed.get(&key) {
            warn!(
                "⚠️  Skipping {}: output name collides with {}",
                shader.display(),
                first.display()
            );
            continue;
        }
        claimed.insert(key, shader.clone());
        kept.push(shader);
    }

    kept
}
