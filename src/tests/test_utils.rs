//! Shared fixtures: a recording compiler double and filesystem helpers.

use crate::compiler::ShaderCompiler;
use crate::config::BuildConfig;
use crate::error::{BuildError, Result};
use crate::job::{CompileJob, CompileResult};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};

/// One call into [`FakeCompiler::compile`].
#[derive(Debug, Clone)]
pub struct CompileCall {
    pub source: PathBuf,
    pub started: Instant,
    pub finished: Instant,
    pub force: bool,
    pub optimize: bool,
}

/// Compiler double. Writes a placeholder output for every job unless told to
/// fail it, and records when each compile started and finished.
#[derive(Debug, Default)]
pub struct FakeCompiler {
    calls: Mutex<Vec<CompileCall>>,
    failing: HashSet<String>,
    fatal: HashSet<String>,
    delay: Duration,
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a compiler diagnostic for the file with this name.
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    /// Return an environment error (as if the tool were missing) for this file.
    pub fn fatal(mut self, name: &str) -> Self {
        self.fatal.insert(name.to_string());
        self
    }

    /// Make every compile take at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<CompileCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Calls for the file with this name, in call order.
    pub fn calls_for(&self, name: &str) -> Vec<CompileCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.source.file_name().and_then(|n| n.to_str()) == Some(name))
            .collect()
    }
}

impl ShaderCompiler for FakeCompiler {
    fn compile(&self, job: &CompileJob) -> Result<CompileResult> {
        let started = Instant::now();
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let name = job.display_name();
        let outcome = if self.fatal.contains(&name) {
            Err(BuildError::Spawn {
                program: "fake-glslc".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not installed"),
            })
        } else if self.failing.contains(&name) {
            Ok(CompileResult::failed(
                job.source(),
                format!("{}:1: error: 'main' : syntax error", name),
            ))
        } else {
            fs::create_dir_all(job.output_dir())?;
            fs::write(job.output_path(), b"\x03\x02\x23\x07")?;
            Ok(CompileResult::compiled(job.source()))
        };

        self.calls.lock().unwrap().push(CompileCall {
            source: job.source().to_path_buf(),
            started,
            finished: Instant::now(),
            force: job.force(),
            optimize: job.optimize(),
        });
        outcome
    }
}

/// Write a shader (creating parent directories) and return its path.
pub fn write_shader(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

pub fn set_mtime(path: &Path, time: SystemTime) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(time).unwrap();
}

/// A fixed point in the past, so relative mtimes never depend on the clock.
pub fn base_time() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

/// Validated config over `source`/`output` with a small pool and short status interval.
pub fn test_config(source: &Path, output: &Path) -> BuildConfig {
    let mut config = BuildConfig::new(source, output);
    config.threads = 2;
    config.status_interval = Duration::from_secs(60);
    config.validate().unwrap();
    config
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Write an executable shell script.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
