// shaderbuild - Incremental GLSL to SPIR-V shader builds
//!
//! Two front ends share one job pipeline:
//! - batch mode compiles every stale shader under a source tree in parallel
//! - watch mode recompiles individual shaders as they are saved, debounced
//!   so that one logical save produces one compile
//!
//! Both go through [`discovery`], [`staleness`] and a [`compiler::ShaderCompiler`],
//! so an output written by one mode is judged fresh or stale the same way by
//! the other.

pub mod batch;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod debounce;
pub mod discovery;
pub mod error;
pub mod job;
pub mod staleness;
pub mod watch;
pub mod watcher;

#[cfg(test)]
pub mod tests;

// Re-export common types
pub use batch::{BatchProgress, BatchScheduler};
pub use compiler::{ExternalCompiler, ShaderCompiler};
pub use config::{BuildConfig, FileConfig};
pub use error::{BuildError, Result};
pub use job::{BatchOutcome, CompileJob, CompileResult, JobSettings};
pub use watch::{StopSignal, WatchEvent, WatchReporter, WatchSession};
