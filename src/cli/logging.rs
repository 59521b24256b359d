/// Tracing setup for the command-line tool
///
/// Without a log file only warnings reach stderr, so the status lines stay
/// readable. With `--log`, info and above go to the file while warnings
/// still reach stderr. `RUST_LOG` overrides the default filter either way.
use anyhow::{Result, anyhow};
use std::path::Path;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

const DEFAULT_LOG_FILE: &str = "shaderbuild.log";

/// Default filter directive when `RUST_LOG` is unset.
pub fn default_directive(has_log_file: bool, verbose: bool) -> &'static str {
    match (has_log_file, verbose) {
        (_, true) => "shaderbuild=debug",
        (true, false) => "info",
        (false, false) => "warn",
    }
}

/// Install the global subscriber. Call once, before any work starts.
pub fn init_logging(log_path: Option<&Path>, verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(log_path.is_some(), verbose)));

    if let Some(log_file) = log_path {
        let file_appender = tracing_appender::rolling::never(
            log_file
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new(".")),
            log_file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(DEFAULT_LOG_FILE),
        );

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_writer(file_appender.and(std::io::stderr.with_max_level(tracing::Level::WARN)))
            .try_init()
            .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

        eprintln!("📝 Logging to {}", log_file.display());
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;
    }

    Ok(())
}
