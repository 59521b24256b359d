//! Compile invocation
//!
//! [`ShaderCompiler`] is the seam between the schedulers and whatever turns a
//! source file into bytecode. The production implementation shells out to
//! `glslc` and `spirv-opt` ([`ExternalCompiler`]); tests substitute doubles.

pub mod external;

pub use external::{ExternalCompiler, ToolOutput};

use crate::error::Result;
use crate::job::{CompileJob, CompileResult};
use crate::staleness;
use tracing::{debug, warn};

/// Compiles one job that has already been judged stale.
///
/// Compiler or optimizer failures are returned as a [`CompileResult`] with an
/// error message. `Err` is reserved for environment problems such as a
/// missing tool binary or an output directory that cannot be created.
pub trait ShaderCompiler: Send + Sync {
    fn compile(&self, job: &CompileJob) -> Result<CompileResult>;
}

/// Staleness check followed by compilation when needed.
///
/// Both schedulers run jobs through here so they share the same skip rules.
pub fn run_job(compiler: &dyn ShaderCompiler, job: &CompileJob) -> Result<CompileResult> {
    match staleness::check_job(job) {
        Ok(verdict) if !verdict.is_stale() => {
            debug!("⏭️  Up-to-date: {}", job.source().display());
            Ok(CompileResult::up_to_date(job.source()))
        }
        Ok(_) => compiler.compile(job),
        Err(e) => {
            warn!(
                "Cannot read source metadata for {}: {}",
                job.source().display(),
                e
            );
            Ok(CompileResult::not_attempted(
                job.source(),
                format!("cannot read source file: {}", e),
            ))
        }
    }
}
