//! Compile job data model
//!
//! A job is one shader source file plus everything needed to compile it.
//! Outputs are flat: `<output_dir>/<source file name>.spv`, whatever the
//! source's depth below the source root. Batch and watch mode both derive
//! output paths through [`output_path_for`] so staleness checks agree.

use std::path::{Path, PathBuf};

/// Shader stage extensions picked up by discovery and the watcher.
pub const SHADER_EXTENSIONS: [&str; 3] = ["vert", "frag", "comp"];

/// Suffix appended to the source file name to form the output name.
pub const BYTECODE_SUFFIX: &str = ".spv";

/// Whether `path` names a shader source by extension.
pub fn is_shader_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SHADER_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Output location for `source` inside `output_dir`.
pub fn output_path_for(source: &Path, output_dir: &Path) -> PathBuf {
    let mut name = source
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(BYTECODE_SUFFIX);
    output_dir.join(name)
}

/// Settings shared by every job of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSettings {
    pub output_dir: PathBuf,
    pub include_dir: PathBuf,
    pub optimize: bool,
    pub force: bool,
}

impl JobSettings {
    /// Build the job for one source file.
    pub fn job_for(&self, source: impl Into<PathBuf>) -> CompileJob {
        CompileJob {
            source: source.into(),
            output_dir: self.output_dir.clone(),
            include_dir: self.include_dir.clone(),
            optimize: self.optimize,
            force: self.force,
        }
    }

    /// Same settings with the force flag set.
    pub fn forced(&self) -> Self {
        Self {
            force: true,
            ..self.clone()
        }
    }
}

/// One unit of work. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
    source: PathBuf,
    output_dir: PathBuf,
    include_dir: PathBuf,
    optimize: bool,
    force: bool,
}

impl CompileJob {
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn include_dir(&self) -> &Path {
        &self.include_dir
    }

    pub fn optimize(&self) -> bool {
        self.optimize
    }

    pub fn force(&self) -> bool {
        self.force
    }

    /// Where this job's bytecode is written.
    pub fn output_path(&self) -> PathBuf {
        output_path_for(&self.source, &self.output_dir)
    }

    /// File name used in status lines.
    pub fn display_name(&self) -> String {
        display_name(&self.source)
    }
}

/// Outcome of one job, produced exactly once per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResult {
    pub source: PathBuf,
    /// False when the job was skipped as up-to-date.
    pub compiled: bool,
    /// Diagnostic text when the compile or optimize stage failed.
    pub error: Option<String>,
}

impl CompileResult {
    pub fn compiled(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            compiled: true,
            error: None,
        }
    }

    pub fn up_to_date(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            compiled: false,
            error: None,
        }
    }

    pub fn failed(source: impl Into<PathBuf>, error: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            compiled: true,
            error: Some(error.into()),
        }
    }

    /// A job that failed before the compiler was ever invoked.
    pub fn not_attempted(source: impl Into<PathBuf>, error: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            compiled: false,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn display_name(&self) -> String {
        display_name(&self.source)
    }
}

/// A failed job inside a [`BatchOutcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub source: PathBuf,
    pub message: String,
}

/// Aggregate result of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub total: usize,
    /// Jobs the compiler was invoked for, failed or not.
    pub compiled: usize,
    /// Jobs that compiled cleanly.
    pub recompiled: usize,
    pub skipped: usize,
    pub failures: Vec<JobFailure>,
}

impl BatchOutcome {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Fold one job result into the aggregate.
    pub fn record(&mut self, result: &CompileResult) {
        if result.compiled {
            self.compiled += 1;
            if result.is_success() {
                self.recompiled += 1;
            }
        } else {
            self.skipped += 1;
        }
        if let Some(message) = &result.error {
            self.failures.push(JobFailure {
                source: result.source.clone(),
                message: message.clone(),
            });
        }
    }

    /// Terminal failure flag: any job failed.
    pub fn failed(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Process exit code for a standalone batch invocation.
    pub fn exit_code(&self) -> i32 {
        if self.failed() { 1 } else { 0 }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
