//! Per-path debounce timer table
//!
//! Each path is Idle (absent) or Pending (one entry with a deadline). Arming a
//! pending path replaces its timer, so at most one timer per path is ever
//! live. The table is plain data driven by explicit instants; the async
//! scheduler in [`crate::watch::scheduler`] owns one for the lifetime of a
//! watch session and is the only thing that mutates it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Outstanding delayed compile for one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    /// When the most recent notification armed this timer.
    pub armed_at: Instant,
    /// When the timer fires unless re-armed.
    pub deadline: Instant,
    /// Notifications coalesced into this timer so far.
    pub notifications: u32,
}

/// Whether [`DebounceTable::arm`] created a timer or replaced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Armed {
    New,
    Rearmed,
}

#[derive(Debug)]
pub struct DebounceTable {
    window: Duration,
    pending: HashMap<PathBuf, PendingTimer>,
}

impl DebounceTable {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a change notification for `path` at `now`.
    ///
    /// A pending timer for the same path is cancelled and replaced by one
    /// firing a full window after `now`.
    pub fn arm(&mut self, path: PathBuf, now: Instant) -> Armed {
        let deadline = now + self.window;
        match self.pending.get_mut(&path) {
            Some(timer) => {
                timer.armed_at = now;
                timer.deadline = deadline;
                timer.notifications += 1;
                Armed::Rearmed
            }
            None => {
                self.pending.insert(
                    path,
                    PendingTimer {
                        armed_at: now,
                        deadline,
                        notifications: 1,
                    },
                );
                Armed::New
            }
        }
    }

    /// Earliest deadline among pending timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|timer| timer.deadline).min()
    }

    /// Remove and return every timer whose deadline is at or before `now`,
    /// earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<(PathBuf, PendingTimer)> {
        let due: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, timer)| timer.deadline <= now)
            .map(|(path, _)| path.clone())
            .collect();

        let mut fired: Vec<(PathBuf, PendingTimer)> = due
            .into_iter()
            .filter_map(|path| self.pending.remove(&path).map(|timer| (path, timer)))
            .collect();
        fired.sort_by(|a, b| a.1.deadline.cmp(&b.1.deadline).then_with(|| a.0.cmp(&b.0)));
        fired
    }

    /// Cancel the timer for `path`. Cancelling an absent timer is a no-op.
    pub fn cancel(&mut self, path: &Path) -> bool {
        self.pending.remove(path).is_some()
    }

    /// Cancel every pending timer, returning how many were discarded.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        self.pending.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<&PendingTimer> {
        self.pending.get(path)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
