//! Filesystem watcher for shader sources
//!
//! `notify` delivers raw events on its own thread. The callback filters them
//! down to shader sources and forwards canonical paths over an unbounded
//! channel; it never touches scheduler state.

pub mod events;
pub mod filtering;

pub use filtering::ShaderFilter;

use crate::error::Result;
use notify::{RecursiveMode, Watcher};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Running recursive watch on one source tree.
pub struct ShaderWatcher {
    watcher: Option<notify::RecommendedWatcher>,
    root: PathBuf,
}

impl ShaderWatcher {
    /// Start watching `filter.root()` recursively.
    ///
    /// Returns the watcher and the receiving end of the change channel. The
    /// channel closes once the watcher is stopped or dropped.
    pub fn start(filter: ShaderFilter) -> Result<(Self, mpsc::UnboundedReceiver<PathBuf>)> {
        let root = filter.root().to_path_buf();
        info!("Starting file watcher for {}", root.display());

        let (tx, rx) = mpsc::unbounded_channel::<PathBuf>();

        let mut watcher = notify::recommended_watcher(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    for path in events::changed_shaders(&event, &filter) {
                        debug!("📁 Shader modified: {}", path.display());
                        if tx.send(path).is_err() {
                            debug!("Change receiver closed, dropping event");
                        }
                    }
                }
                Err(e) => warn!("File watcher error: {}", e),
            },
        )?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                watcher: Some(watcher),
                root,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    /// Stop the notifier thread. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            if let Err(e) = watcher.unwatch(&self.root) {
                debug!("Unwatch failed for {}: {}", self.root.display(), e);
            }
            drop(watcher);
            info!("File watcher stopped");
        }
    }
}

impl Drop for ShaderWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
