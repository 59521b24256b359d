//! Conversion of raw notify events into shader change notifications

use super::filtering::ShaderFilter;
use notify::{Event, EventKind};
use std::path::PathBuf;
use tracing::debug;

/// Canonical paths of shader sources modified by `event`.
///
/// Modifications count; so do creations, because editors that save through a
/// temporary file and rename surface the save as a create. Removals and
/// access events are dropped.
pub fn changed_shaders(event: &Event, filter: &ShaderFilter) -> Vec<PathBuf> {
    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
        return Vec::new();
    }

    let mut paths = Vec::new();
    for path in &event.paths {
        if !filter.should_compile(path) {
            continue;
        }
        match path.canonicalize() {
            Ok(canonical) => {
                if !paths.contains(&canonical) {
                    paths.push(canonical);
                }
            }
            Err(e) => debug!("Dropping event for {}: {}", path.display(), e),
        }
    }
    paths
}
