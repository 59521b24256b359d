//! Parallel batch compilation
//!
//! Jobs fan out over a dedicated Rayon pool sized to the configured thread
//! count. Results come back over a channel in completion order, so progress
//! callbacks see `1/N, 2/N, ...` regardless of which job finished first.
//!
//! Failure policy is drain-to-completion: a failing job is reported as soon
//! as it arrives, but every other job still runs and reports.

use crate::compiler::{ShaderCompiler, run_job};
use crate::config::BuildConfig;
use crate::discovery::discover_shaders;
use crate::error::{BuildError, Result};
use crate::job::{BYTECODE_SUFFIX, BatchOutcome, CompileJob, CompileResult, JobSettings};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use tracing::{debug, error, info, warn};

/// One completed job, as seen by the progress callback.
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress<'a> {
    /// 1-based completion index.
    pub index: usize,
    pub total: usize,
    pub result: &'a CompileResult,
}

enum WorkerMessage {
    Finished(CompileResult),
    Fatal(PathBuf, BuildError),
}

/// Owns the worker pool for batch runs.
pub struct BatchScheduler {
    pool: rayon::ThreadPool,
    compiler: Arc<dyn ShaderCompiler>,
}

impl BatchScheduler {
    pub fn new(compiler: Arc<dyn ShaderCompiler>, threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("shader-worker-{}", i))
            .panic_handler(|_| error!("💥 Shader worker panicked"))
            .build()?;

        Ok(Self { pool, compiler })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run every job, reporting each as it completes.
    ///
    /// Returns the aggregate outcome, or the first environment error (missing
    /// tool, unwritable output) once all jobs have drained.
    pub fn run<F>(&self, jobs: Vec<CompileJob>, mut on_progress: F) -> Result<BatchOutcome>
    where
        F: FnMut(BatchProgress<'_>),
    {
        let total = jobs.len();
        let mut outcome = BatchOutcome::new(total);
        if total == 0 {
            return Ok(outcome);
        }

        let mut outstanding: HashSet<PathBuf> =
            jobs.iter().map(|job| job.source().to_path_buf()).collect();
        let (tx, rx) = mpsc::channel::<WorkerMessage>();

        for job in jobs {
            let tx = tx.clone();
            let compiler = Arc::clone(&self.compiler);
            self.pool.spawn(move || {
                let message = match run_job(compiler.as_ref(), &job) {
                    Ok(result) => WorkerMessage::Finished(result),
                    Err(e) => WorkerMessage::Fatal(job.source().to_path_buf(), e),
                };
                // Receiver outlives every worker; a send error means it was dropped early.
                let _ = tx.send(message);
            });
        }
        drop(tx);

        let mut first_fatal: Option<BuildError> = None;
        let mut index = 0;

        for message in rx {
            let result = match message {
                WorkerMessage::Finished(result) => result,
                WorkerMessage::Fatal(source, e) => {
                    error!("❌ {}: {}", source.display(), e);
                    let result = CompileResult::failed(&source, e.to_string());
                    first_fatal.get_or_insert(e);
                    result
                }
            };

            outstanding.remove(&result.source);
            index += 1;
            outcome.record(&result);
            on_progress(BatchProgress {
                index,
                total,
                result: &result,
            });
        }

        // Only a panicking worker can leave jobs unreported.
        let mut lost: Vec<PathBuf> = outstanding.into_iter().collect();
        lost.sort();
        for source in lost {
            warn!("No result from worker for {}", source.display());
            let result = CompileResult::failed(&source, "worker terminated without a result");
            index += 1;
            outcome.record(&result);
            on_progress(BatchProgress {
                index,
                total,
                result: &result,
            });
        }

        info!(
            total = outcome.total,
            compiled = outcome.compiled,
            skipped = outcome.skipped,
            failed = outcome.failures.len(),
            "Batch finished"
        );

        match first_fatal {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }
}

/// Build the job list for every shader under the configured source root.
pub fn discover_jobs(config: &BuildConfig, settings: &JobSettings) -> Result<Vec<CompileJob>> {
    let ignore = config.ignore_set()?;
    let shaders = discover_shaders(&config.source_dir, &ignore)?;
    debug!("Discovered {} shader(s) in {}", shaders.len(), config.source_dir.display());
    Ok(shaders
        .into_iter()
        .map(|source| settings.job_for(source))
        .collect())
}

/// Delete every bytecode file at the top level of `output_dir`.
///
/// Returns the number of files removed. A missing directory removes nothing.
pub fn clean_outputs(output_dir: &Path) -> Result<usize> {
    if !output_dir.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in std::fs::read_dir(output_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_output = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(BYTECODE_SUFFIX))
            .unwrap_or(false);

        if is_output && entry.file_type()?.is_file() {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }

    debug!("Removed {} output(s) from {}", removed, output_dir.display());
    Ok(removed)
}
