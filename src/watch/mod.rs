//! Watch mode
//!
//! A watch session performs one forced full build, then reacts to shader
//! edits. Concurrency layout:
//! - `notify` thread: emits canonical shader paths (see [`crate::watcher`])
//! - scheduler task: owns the debounce table and dispatches compiles
//! - input task: turns operator input into rebuild commands
//! - status task: reports the pending-compile count periodically
//!
//! All three tasks share one single-threaded runtime. The input and status
//! tasks watch the session's [`StopSignal`]; the scheduler has its own, raised
//! only after the shutdown notice. The session ends when the signal is raised
//! or when the input or status task finishes on its own.

pub mod control;
pub mod events;
pub mod scheduler;
pub mod shutdown;

pub use events::{BuildKind, RecordingReporter, WatchEvent, WatchReporter};
pub use scheduler::{DebounceScheduler, SchedulerStats, WatchCommand};
pub use shutdown::{StopListener, StopSignal};

use crate::batch::{BatchScheduler, clean_outputs, discover_jobs};
use crate::compiler::ShaderCompiler;
use crate::config::BuildConfig;
use crate::error::Result;
use crate::job::BatchOutcome;
use crate::watcher::{ShaderFilter, ShaderWatcher};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

/// What a finished session did.
#[derive(Debug, Clone, Default)]
pub struct WatchSummary {
    /// Outcome of the startup build, if it got far enough to produce one.
    pub startup: Option<BatchOutcome>,
    pub scheduler: SchedulerStats,
}

/// Forced full build shared by session startup and the rebuild command.
///
/// Reports progress through `reporter`. With `clean`, previously produced
/// outputs are deleted first.
pub fn run_full_build(
    config: &BuildConfig,
    batch: &BatchScheduler,
    clean: bool,
    kind: BuildKind,
    reporter: &dyn WatchReporter,
) -> Result<BatchOutcome> {
    let result = (|| -> Result<BatchOutcome> {
        if clean {
            let removed = clean_outputs(&config.output_dir)?;
            info!("🧹 Removed {} previous output(s)", removed);
        }

        let jobs = discover_jobs(config, &config.job_settings().forced())?;
        reporter.report(WatchEvent::BatchStarted {
            kind,
            total: jobs.len(),
            threads: batch.threads(),
        });

        batch.run(jobs, |progress| {
            reporter.report(WatchEvent::BatchProgress {
                kind,
                index: progress.index,
                total: progress.total,
                result: progress.result.clone(),
            });
        })
    })();

    match &result {
        Ok(outcome) => reporter.report(WatchEvent::BatchFinished {
            kind,
            outcome: outcome.clone(),
        }),
        Err(e) => {
            error!("❌ {:?} build failed: {}", kind, e);
            reporter.report(WatchEvent::BatchFailed {
                kind,
                message: e.to_string(),
            });
        }
    }
    result
}

/// One watch session over a validated, canonicalized configuration.
pub struct WatchSession {
    config: BuildConfig,
    compiler: Arc<dyn ShaderCompiler>,
    reporter: Arc<dyn WatchReporter>,
}

impl WatchSession {
    pub fn new(
        config: BuildConfig,
        compiler: Arc<dyn ShaderCompiler>,
        reporter: Arc<dyn WatchReporter>,
    ) -> Self {
        Self {
            config,
            compiler,
            reporter,
        }
    }

    /// Run until `stop` is raised.
    ///
    /// `input` carries operator lines (see [`control::spawn_stdin_reader`]);
    /// `None` runs without interactive commands. Errors are returned only for
    /// startup failures (watcher setup, worker pool); everything after that is
    /// reported and survived.
    pub async fn run(
        self,
        stop: StopSignal,
        input: Option<mpsc::UnboundedReceiver<String>>,
    ) -> Result<WatchSummary> {
        let batch = Arc::new(BatchScheduler::new(
            Arc::clone(&self.compiler),
            self.config.threads,
        )?);

        let startup = {
            let config = self.config.clone();
            let batch = Arc::clone(&batch);
            let reporter = Arc::clone(&self.reporter);
            tokio::task::spawn_blocking(move || {
                run_full_build(&config, &batch, false, BuildKind::Startup, reporter.as_ref())
            })
            .await
        };
        let startup = match startup {
            Ok(Ok(outcome)) => Some(outcome),
            Ok(Err(e)) if e.is_config_error() => return Err(e),
            Ok(Err(_)) => None,
            Err(e) => {
                error!("Startup build task failed to complete: {}", e);
                None
            }
        };

        let filter = ShaderFilter::new(&self.config.source_dir, self.config.ignore_set()?);
        let (mut watcher, changes) = ShaderWatcher::start(filter)?;
        self.reporter.report(WatchEvent::Watching {
            root: self.config.source_dir.clone(),
        });

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (pending_tx, pending_rx) = watch::channel(0usize);

        let scheduler = DebounceScheduler::new(
            self.config.clone(),
            Arc::clone(&self.compiler),
            batch,
            Arc::clone(&self.reporter),
            pending_tx,
        );
        // Raised only after the shutdown notice, so the scheduler's final report comes last.
        let scheduler_stop = StopSignal::new();
        let scheduler_handle =
            tokio::spawn(scheduler.run(changes, command_rx, scheduler_stop.subscribe()));

        let mut input_handle = match input {
            Some(lines) => tokio::spawn(control::input_task(lines, command_tx, stop.subscribe())),
            None => {
                let mut listener = stop.subscribe();
                tokio::spawn(async move {
                    let _command_tx = command_tx;
                    listener.stopped().await;
                })
            }
        };
        let mut status_handle = tokio::spawn(control::status_task(
            self.config.status_interval,
            pending_rx,
            Arc::clone(&self.reporter),
            stop.subscribe(),
        ));

        let mut input_done = false;
        let mut status_done = false;
        let mut listener = stop.subscribe();
        tokio::select! {
            _ = listener.stopped() => {}
            _ = &mut input_handle => input_done = true,
            _ = &mut status_handle => status_done = true,
        }

        self.reporter.report(WatchEvent::ShuttingDown);
        stop.stop();
        watcher.stop();
        scheduler_stop.stop();

        let scheduler = match scheduler_handle.await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Scheduler task failed: {}", e);
                SchedulerStats::default()
            }
        };
        if !input_done {
            let _ = input_handle.await;
        }
        if !status_done {
            let _ = status_handle.await;
        }

        info!("Watch session ended");
        Ok(WatchSummary { startup, scheduler })
    }
}
