use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors of a build run.
///
/// Ordinary compiler diagnostics are not represented here; they travel inside
/// [`crate::job::CompileResult`]. A `BuildError` means the run itself cannot
/// continue (bad configuration, missing tool, unwritable output directory).
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Source directory not found: {0}")]
    SourceDirNotFound(PathBuf),

    #[error("Source path is not a directory: {0}")]
    SourceNotADirectory(PathBuf),

    #[error("Output path exists but is not a directory: {0}")]
    OutputNotADirectory(PathBuf),

    #[error("Failed to create output directory {path}: {source}")]
    CreateOutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk source directory {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid ignore pattern {pattern}: {source}")]
    IgnorePattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// True for errors caused by the run's configuration rather than the environment.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BuildError::SourceDirNotFound(_)
                | BuildError::SourceNotADirectory(_)
                | BuildError::OutputNotADirectory(_)
                | BuildError::IgnorePattern { .. }
                | BuildError::ConfigRead { .. }
                | BuildError::ConfigParse { .. }
                | BuildError::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
