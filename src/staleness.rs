//! Timestamp-based staleness detection
//!
//! An output is fresh when it exists and was modified no earlier than its
//! source. Equal timestamps count as fresh. Nothing is cached between calls.

use crate::job::CompileJob;
use std::path::Path;
use std::time::SystemTime;
use tracing::debug;

/// Verdict of the staleness oracle for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    Stale,
    Fresh,
}

impl Staleness {
    pub fn is_stale(self) -> bool {
        self == Staleness::Stale
    }
}

/// Pure comparison used by [`check`]: `output_mtime` is `None` when the output is missing.
pub fn compare(force: bool, source_mtime: SystemTime, output_mtime: Option<SystemTime>) -> Staleness {
    if force {
        return Staleness::Stale;
    }
    match output_mtime {
        Some(output) if output >= source_mtime => Staleness::Fresh,
        _ => Staleness::Stale,
    }
}

/// Decide whether `output` must be rebuilt from `source`.
///
/// Fails only if the source's metadata cannot be read; a missing or
/// unreadable output simply means stale.
pub fn check(source: &Path, output: &Path, force: bool) -> std::io::Result<Staleness> {
    if force {
        return Ok(Staleness::Stale);
    }

    let source_mtime = std::fs::metadata(source)?.modified()?;
    let output_mtime = std::fs::metadata(output)
        .and_then(|meta| meta.modified())
        .ok();

    let verdict = compare(false, source_mtime, output_mtime);
    debug!(
        source = %source.display(),
        output = %output.display(),
        ?verdict,
        "staleness check"
    );
    Ok(verdict)
}

/// [`check`] for a job, using its own output path and force flag.
pub fn check_job(job: &CompileJob) -> std::io::Result<Staleness> {
    check(job.source(), &job.output_path(), job.force())
}
