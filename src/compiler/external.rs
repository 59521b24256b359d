//! External tool invocation (`glslc` + optional `spirv-opt`)

use super::ShaderCompiler;
use crate::config::BuildConfig;
use crate::error::{BuildError, Result};
use crate::job::{CompileJob, CompileResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

pub const DEFAULT_COMPILER: &str = "glslc";
pub const DEFAULT_OPTIMIZER: &str = "spirv-opt";
pub const DEFAULT_TARGET_ENV: &str = "vulkan1.4";

/// Captured result of one external process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Best diagnostic text for a failed run.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.code {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Compiles GLSL to SPIR-V through external processes.
#[derive(Debug, Clone)]
pub struct ExternalCompiler {
    compiler: PathBuf,
    optimizer: PathBuf,
    target_env: String,
    debug_info: bool,
}

impl Default for ExternalCompiler {
    fn default() -> Self {
        Self {
            compiler: PathBuf::from(DEFAULT_COMPILER),
            optimizer: PathBuf::from(DEFAULT_OPTIMIZER),
            target_env: DEFAULT_TARGET_ENV.to_string(),
            debug_info: true,
        }
    }
}

impl ExternalCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            compiler: config.compiler.clone(),
            optimizer: config.optimizer.clone(),
            target_env: config.target_env.clone(),
            debug_info: config.debug_info,
        }
    }

    pub fn compiler(mut self, program: impl Into<PathBuf>) -> Self {
        self.compiler = program.into();
        self
    }

    pub fn optimizer(mut self, program: impl Into<PathBuf>) -> Self {
        self.optimizer = program.into();
        self
    }

    pub fn target_env(mut self, env: impl Into<String>) -> Self {
        self.target_env = env.into();
        self
    }

    pub fn debug_info(mut self, enabled: bool) -> Self {
        self.debug_info = enabled;
        self
    }

    /// Arguments for the compile stage:
    /// `<source> -o <output> [-g] -I <include> --target-env=<env> -x glsl -Werror`
    pub fn compile_args(&self, job: &CompileJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            job.source().into(),
            "-o".into(),
            job.output_path().into(),
        ];
        if self.debug_info {
            args.push("-g".into());
        }
        args.push("-I".into());
        args.push(job.include_dir().into());
        args.push(format!("--target-env={}", self.target_env).into());
        args.push("-x".into());
        args.push("glsl".into());
        args.push("-Werror".into());
        args
    }

    /// Arguments for the in-place optimize stage.
    pub fn optimize_args(&self, output: &Path) -> Vec<OsString> {
        vec![
            "-O".into(),
            "--preserve-bindings".into(),
            "--preserve-interface".into(),
            output.into(),
            "-o".into(),
            output.into(),
        ]
    }

    fn run_tool(&self, program: &Path, args: &[OsString]) -> Result<ToolOutput> {
        debug!("Running {} {:?}", program.display(), args);

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| BuildError::Spawn {
                program: program.display().to_string(),
                source,
            })?;

        Ok(ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl ShaderCompiler for ExternalCompiler {
    fn compile(&self, job: &CompileJob) -> Result<CompileResult> {
        std::fs::create_dir_all(job.output_dir()).map_err(|source| BuildError::CreateOutputDir {
            path: job.output_dir().to_path_buf(),
            source,
        })?;

        let compiled = self.run_tool(&self.compiler, &self.compile_args(job))?;
        if !compiled.success {
            return Ok(CompileResult::failed(job.source(), compiled.diagnostic()));
        }

        if job.optimize() {
            let output = job.output_path();
            let optimized = self.run_tool(&self.optimizer, &self.optimize_args(&output))?;
            if !optimized.success {
                return Ok(CompileResult::failed(
                    job.source(),
                    format!("optimizer failed: {}", optimized.diagnostic()),
                ));
            }
        }

        info!("Compiled {}", job.source().display());
        Ok(CompileResult::compiled(job.source()))
    }
}
