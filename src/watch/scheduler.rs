//! Debounce scheduler
//!
//! Runs as one task on the session's single-threaded runtime and is the only
//! owner of the [`DebounceTable`]. Change notifications arrive over a channel
//! from the watcher thread; commands arrive from the input task. Settled
//! compiles run on the blocking pool so a slow compile never delays timer
//! servicing for other files.
//!
//! A path is never compiled twice at once: if its timer settles while the
//! previous compile is still running, a single re-run is queued behind it.

use super::events::{BuildKind, WatchEvent, WatchReporter};
use super::shutdown::StopListener;
use super::run_full_build;
use crate::batch::BatchScheduler;
use crate::compiler::{ShaderCompiler, run_job};
use crate::config::BuildConfig;
use crate::debounce::{Armed, DebounceTable};
use crate::error::Result;
use crate::job::{CompileResult, JobSettings};
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// Operator commands accepted by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchCommand {
    /// Cancel pending timers, delete outputs and recompile everything.
    FullRebuild,
}

/// Counters for one scheduler lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub notifications: usize,
    pub dispatched: usize,
    pub failed: usize,
    pub dropped: usize,
    pub rebuilds: usize,
    /// Timers cancelled without running, by rebuilds and shutdown.
    pub discarded: usize,
}

pub struct DebounceScheduler {
    table: DebounceTable,
    config: BuildConfig,
    settings: JobSettings,
    compiler: Arc<dyn ShaderCompiler>,
    batch: Arc<BatchScheduler>,
    reporter: Arc<dyn WatchReporter>,
    pending_tx: watch::Sender<usize>,
    compiles: JoinSet<Result<CompileResult>>,
    /// Path of each running compile task.
    tasks: HashMap<Id, PathBuf>,
    in_flight: HashSet<PathBuf>,
    rerun: HashSet<PathBuf>,
    stats: SchedulerStats,
}

impl DebounceScheduler {
    pub fn new(
        config: BuildConfig,
        compiler: Arc<dyn ShaderCompiler>,
        batch: Arc<BatchScheduler>,
        reporter: Arc<dyn WatchReporter>,
        pending_tx: watch::Sender<usize>,
    ) -> Self {
        // Every settled change is an explicit save; compile it even if timestamps say fresh.
        let settings = config.job_settings().forced();
        Self {
            table: DebounceTable::new(config.debounce),
            config,
            settings,
            compiler,
            batch,
            reporter,
            pending_tx,
            compiles: JoinSet::new(),
            tasks: HashMap::new(),
            in_flight: HashSet::new(),
            rerun: HashSet::new(),
            stats: SchedulerStats::default(),
        }
    }

    pub fn window(&self) -> Duration {
        self.table.window()
    }

    /// Drive the scheduler until `stop` is raised, then discard pending
    /// timers, wait for running compiles and return the counters.
    pub async fn run(
        mut self,
        mut changes: mpsc::UnboundedReceiver<PathBuf>,
        mut commands: mpsc::UnboundedReceiver<WatchCommand>,
        mut stop: StopListener,
    ) -> SchedulerStats {
        let mut changes_open = true;
        let mut commands_open = true;
        info!("🔄 Debounce scheduler started ({}ms window)", self.window().as_millis());

        loop {
            let deadline = self.table.next_deadline();

            tokio::select! {
                biased;

                _ = stop.stopped() => break,

                Some(joined) = self.compiles.join_next_with_id(), if !self.compiles.is_empty() => {
                    self.on_compile_finished(joined, true);
                }

                _ = sleep_until(deadline), if deadline.is_some() => {
                    self.fire_due(Instant::now());
                }

                change = changes.recv(), if changes_open => match change {
                    Some(path) => self.on_change(path),
                    None => {
                        debug!("Change channel closed");
                        changes_open = false;
                    }
                },

                command = commands.recv(), if commands_open => match command {
                    Some(WatchCommand::FullRebuild) => self.full_rebuild().await,
                    None => {
                        debug!("Command channel closed");
                        commands_open = false;
                    }
                },
            }

            self.publish_pending();
        }

        self.shutdown().await
    }

    fn on_change(&mut self, path: PathBuf) {
        self.stats.notifications += 1;
        let armed = self.table.arm(path.clone(), Instant::now());
        debug!("⏱️  Debounce {:?} for {}", armed, path.display());
        self.reporter.report(WatchEvent::Scheduled {
            path,
            rearmed: armed == Armed::Rearmed,
        });
    }

    fn fire_due(&mut self, now: Instant) {
        for (path, timer) in self.table.take_due(now) {
            debug!(
                "Timer settled for {} after {} notification(s)",
                path.display(),
                timer.notifications
            );

            if !path.is_file() {
                warn!("Dropping {}: no longer a readable file", path.display());
                self.stats.dropped += 1;
                self.reporter.report(WatchEvent::Dropped {
                    path,
                    reason: "file no longer exists".to_string(),
                });
                continue;
            }

            if self.in_flight.contains(&path) {
                debug!("{} still compiling, queueing re-run", path.display());
                self.rerun.insert(path);
                continue;
            }

            self.dispatch(path);
        }
    }

    fn dispatch(&mut self, path: PathBuf) {
        let job = self.settings.job_for(path.clone());
        let compiler = Arc::clone(&self.compiler);

        self.in_flight.insert(path.clone());
        self.stats.dispatched += 1;
        info!("🔨 Compiling {}", path.display());

        let task = self.compiles.spawn_blocking(move || {
            std::panic::catch_unwind(AssertUnwindSafe(|| run_job(compiler.as_ref(), &job)))
                .unwrap_or_else(|_| Ok(CompileResult::failed(job.source(), "compiler panicked")))
        });
        self.tasks.insert(task.id(), path);
    }

    fn on_compile_finished(
        &mut self,
        joined: std::result::Result<(Id, Result<CompileResult>), JoinError>,
        allow_rerun: bool,
    ) {
        let (id, result) = match joined {
            Ok(done) => done,
            Err(e) => {
                error!("Compile task failed to complete: {}", e);
                if let Some(path) = self.tasks.remove(&e.id()) {
                    self.in_flight.remove(&path);
                    self.rerun.remove(&path);
                }
                return;
            }
        };
        let Some(path) = self.tasks.remove(&id) else {
            warn!("Finished compile task {} has no recorded path", id);
            return;
        };
        self.in_flight.remove(&path);

        match result {
            Ok(result) if result.is_success() => {
                self.reporter.report(WatchEvent::Compiled { path: path.clone() });
            }
            Ok(result) => {
                self.stats.failed += 1;
                self.reporter.report(WatchEvent::CompileFailed {
                    path: path.clone(),
                    message: result.error.unwrap_or_default(),
                });
            }
            Err(e) => {
                error!("❌ {}: {}", path.display(), e);
                self.stats.failed += 1;
                self.reporter.report(WatchEvent::CompileFailed {
                    path: path.clone(),
                    message: e.to_string(),
                });
            }
        }

        if self.rerun.remove(&path) && allow_rerun {
            if path.is_file() {
                self.dispatch(path);
            } else {
                self.stats.dropped += 1;
                self.reporter.report(WatchEvent::Dropped {
                    path,
                    reason: "file no longer exists".to_string(),
                });
            }
        }
    }

    async fn drain_in_flight(&mut self) {
        if !self.compiles.is_empty() {
            info!("Waiting for {} running compile(s)", self.compiles.len());
        }
        while let Some(joined) = self.compiles.join_next_with_id().await {
            self.on_compile_finished(joined, false);
        }
        self.rerun.clear();
    }

    async fn full_rebuild(&mut self) {
        let discarded = self.table.cancel_all();
        self.stats.discarded += discarded;
        self.stats.rebuilds += 1;
        self.publish_pending();
        self.reporter.report(WatchEvent::RebuildRequested { discarded });

        self.drain_in_flight().await;

        let config = self.config.clone();
        let batch = Arc::clone(&self.batch);
        let reporter = Arc::clone(&self.reporter);
        let joined = tokio::task::spawn_blocking(move || {
            run_full_build(&config, &batch, true, BuildKind::Rebuild, reporter.as_ref())
        })
        .await;

        if let Err(e) = joined {
            error!("Rebuild task failed to complete: {}", e);
            self.reporter.report(WatchEvent::BatchFailed {
                kind: BuildKind::Rebuild,
                message: e.to_string(),
            });
        }
    }

    fn publish_pending(&self) {
        self.pending_tx.send_replace(self.table.len());
    }

    async fn shutdown(mut self) -> SchedulerStats {
        let discarded = self.table.cancel_all();
        self.stats.discarded += discarded;
        self.publish_pending();
        if discarded > 0 {
            info!("Discarded {} pending compile(s)", discarded);
        }

        self.drain_in_flight().await;
        self.reporter.report(WatchEvent::Stopped { discarded });
        info!("Debounce scheduler stopped");
        self.stats
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_utils::{FakeCompiler, test_config, write_shader};
    use crate::watch::RecordingReporter;
    use tempfile::TempDir;

    #[test]
    fn test_cancelled_compile_releases_its_path() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .max_blocking_threads(1)
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let src = TempDir::new().unwrap();
            let out = TempDir::new().unwrap();
            let path = write_shader(src.path(), "a.vert", "void main() {}");
            let config = test_config(src.path(), out.path());
            let compiler = Arc::new(FakeCompiler::new());
            let batch = Arc::new(BatchScheduler::new(compiler.clone(), 1).unwrap());
            let (pending_tx, _pending) = watch::channel(0usize);
            let mut scheduler = DebounceScheduler::new(
                config,
                compiler.clone(),
                batch,
                Arc::new(RecordingReporter::new()),
                pending_tx,
            );

            // Hold the only blocking thread so the compile stays queued.
            let blocker =
                tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_millis(200)));
            scheduler.dispatch(path.clone());
            scheduler.rerun.insert(path.clone());
            assert!(scheduler.in_flight.contains(&path));

            scheduler.compiles.abort_all();
            let joined = scheduler.compiles.join_next_with_id().await.unwrap();
            assert!(joined.as_ref().is_err_and(|e| e.is_cancelled()));
            scheduler.on_compile_finished(joined, true);

            assert!(scheduler.in_flight.is_empty());
            assert!(scheduler.rerun.is_empty());
            assert!(scheduler.tasks.is_empty());
            blocker.await.unwrap();
            assert_eq!(compiler.call_count(), 0);

            // The path is free again: the next settle dispatches a real compile.
            scheduler.dispatch(path.clone());
            let joined = scheduler.compiles.join_next_with_id().await.unwrap();
            scheduler.on_compile_finished(joined, true);
            assert!(scheduler.in_flight.is_empty());
            assert_eq!(compiler.call_count(), 1);
        });
    }
}
