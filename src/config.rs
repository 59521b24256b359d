//! Build configuration
//!
//! Values are layered: built-in defaults, then an optional `shaderbuild.toml`,
//! then command-line overrides. [`BuildConfig::validate`] must pass before any
//! job runs.

use crate::compiler::external::{DEFAULT_COMPILER, DEFAULT_OPTIMIZER, DEFAULT_TARGET_ENV};
use crate::discovery::IgnoreSet;
use crate::error::{BuildError, Result};
use crate::job::JobSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// File name looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "shaderbuild.toml";

/// Quiet period after the last change before a watched file is compiled.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

pub const DEFAULT_STATUS_INTERVAL_SECS: u64 = 10;

/// Optional settings read from a TOML file. Every key may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub compiler: Option<PathBuf>,
    pub optimizer: Option<PathBuf>,
    pub target_env: Option<String>,
    pub debug_info: Option<bool>,
    pub include_dir: Option<PathBuf>,
    pub threads: Option<usize>,
    pub debounce_ms: Option<u64>,
    pub status_interval_secs: Option<u64>,
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl FileConfig {
    pub fn from_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| BuildError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| BuildError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content, path)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `explicit` if given, else `shaderbuild.toml` in `cwd` when present.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = cwd.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            debug!("No {} found in {}", CONFIG_FILE_NAME, cwd.display());
            Ok(Self::default())
        }
    }
}

/// Fully resolved configuration of one run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub include_dir: PathBuf,
    pub compiler: PathBuf,
    pub optimizer: PathBuf,
    pub target_env: String,
    pub debug_info: bool,
    pub optimize: bool,
    pub force: bool,
    pub threads: usize,
    pub debounce: Duration,
    pub status_interval: Duration,
    pub ignore_patterns: Vec<String>,
}

impl BuildConfig {
    /// Defaults for the given source and output directories.
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let source_dir = source_dir.into();
        Self {
            include_dir: source_dir.join("include"),
            source_dir,
            output_dir: output_dir.into(),
            compiler: PathBuf::from(DEFAULT_COMPILER),
            optimizer: PathBuf::from(DEFAULT_OPTIMIZER),
            target_env: DEFAULT_TARGET_ENV.to_string(),
            debug_info: true,
            optimize: false,
            force: false,
            threads: num_cpus::get(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            status_interval: Duration::from_secs(DEFAULT_STATUS_INTERVAL_SECS),
            ignore_patterns: Vec::new(),
        }
    }

    /// Apply file values on top of the current ones.
    pub fn with_file(mut self, file: FileConfig) -> Self {
        if let Some(compiler) = file.compiler {
            self.compiler = compiler;
        }
        if let Some(optimizer) = file.optimizer {
            self.optimizer = optimizer;
        }
        if let Some(target_env) = file.target_env {
            self.target_env = target_env;
        }
        if let Some(debug_info) = file.debug_info {
            self.debug_info = debug_info;
        }
        if let Some(include_dir) = file.include_dir {
            self.include_dir = self.source_dir.join(include_dir);
        }
        if let Some(threads) = file.threads {
            self.threads = threads;
        }
        if let Some(ms) = file.debounce_ms {
            self.debounce = Duration::from_millis(ms);
        }
        if let Some(secs) = file.status_interval_secs {
            self.status_interval = Duration::from_secs(secs);
        }
        self.ignore_patterns.extend(file.ignore);
        self
    }

    /// Check directories and settings; creates the output directory if missing.
    pub fn validate(&self) -> Result<()> {
        if !self.source_dir.exists() {
            return Err(BuildError::SourceDirNotFound(self.source_dir.clone()));
        }
        if !self.source_dir.is_dir() {
            return Err(BuildError::SourceNotADirectory(self.source_dir.clone()));
        }
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(BuildError::OutputNotADirectory(self.output_dir.clone()));
        }
        if self.threads == 0 {
            return Err(BuildError::InvalidConfig(
                "threads must be at least 1".to_string(),
            ));
        }
        if self.status_interval.is_zero() {
            return Err(BuildError::InvalidConfig(
                "status_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.target_env.trim().is_empty() {
            return Err(BuildError::InvalidConfig(
                "target_env must not be empty".to_string(),
            ));
        }
        self.ignore_set()?;

        std::fs::create_dir_all(&self.output_dir).map_err(|source| BuildError::CreateOutputDir {
            path: self.output_dir.clone(),
            source,
        })?;
        Ok(())
    }

    pub fn ignore_set(&self) -> Result<IgnoreSet> {
        IgnoreSet::new(&self.ignore_patterns)
    }

    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            output_dir: self.output_dir.clone(),
            include_dir: self.include_dir.clone(),
            optimize: self.optimize,
            force: self.force,
        }
    }

    /// Resolve source, output and include directories to absolute paths.
    ///
    /// Watch events carry canonical paths, so the watch session works with
    /// canonical roots too. Call after [`validate`](Self::validate).
    pub fn canonicalized(mut self) -> Result<Self> {
        let source = self.source_dir.canonicalize()?;
        if let Ok(relative) = self.include_dir.strip_prefix(&self.source_dir) {
            self.include_dir = source.join(relative);
        } else if self.include_dir.exists() {
            self.include_dir = self.include_dir.canonicalize()?;
        }
        self.source_dir = source;
        self.output_dir = self.output_dir.canonicalize()?;
        Ok(self)
    }
}
