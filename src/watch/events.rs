//! Events emitted by a watch session
//!
//! The session never prints directly; it hands events to a [`WatchReporter`].
//! The CLI prints them, tests record them.

use crate::job::{BatchOutcome, CompileResult};
use std::path::PathBuf;
use std::sync::Mutex;

/// Which full build a batch event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildKind {
    /// Forced build performed when the session starts.
    Startup,
    /// Operator-requested full recompilation.
    Rebuild,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    BatchStarted {
        kind: BuildKind,
        total: usize,
        threads: usize,
    },
    BatchProgress {
        kind: BuildKind,
        index: usize,
        total: usize,
        result: CompileResult,
    },
    BatchFinished {
        kind: BuildKind,
        outcome: BatchOutcome,
    },
    BatchFailed {
        kind: BuildKind,
        message: String,
    },
    Watching {
        root: PathBuf,
    },
    /// A change notification armed (or re-armed) the debounce timer for `path`.
    Scheduled {
        path: PathBuf,
        rearmed: bool,
    },
    Compiled {
        path: PathBuf,
    },
    CompileFailed {
        path: PathBuf,
        message: String,
    },
    /// A settled path could not be compiled (e.g. deleted before its timer fired).
    Dropped {
        path: PathBuf,
        reason: String,
    },
    RebuildRequested {
        discarded: usize,
    },
    Status {
        pending: usize,
    },
    ShuttingDown,
    Stopped {
        discarded: usize,
    },
}

/// Sink for watch-session events. Called from the scheduler thread and from
/// blocking batch workers.
pub trait WatchReporter: Send + Sync {
    fn report(&self, event: WatchEvent);
}

/// Reporter that keeps every event, for tests and embedding.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<WatchEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WatchEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl WatchReporter for RecordingReporter {
    fn report(&self, event: WatchEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
