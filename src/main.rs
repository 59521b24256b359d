/// shaderbuild: incremental GLSL to SPIR-V builds
///
/// Commands:
/// - compile: one-shot parallel build of every stale shader
/// - watch: forced full build, then debounced rebuilds on save
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use shaderbuild::batch::{BatchScheduler, discover_jobs};
use shaderbuild::cli::{ConsoleReporter, init_logging};
use shaderbuild::config::{BuildConfig, FileConfig};
use shaderbuild::watch::control::spawn_stdin_reader;
use shaderbuild::watch::shutdown::spawn_signal_listener;
use shaderbuild::{ExternalCompiler, StopSignal, WatchReporter, WatchSession};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "shaderbuild")]
#[command(about = "Incremental GLSL to SPIR-V shader builds", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Directory containing shader sources (searched recursively)
    #[arg(short, long)]
    source: PathBuf,

    /// Directory receiving compiled .spv files (created if missing)
    #[arg(short, long)]
    output: PathBuf,

    /// Include directory passed to the compiler (defaults to <source>/include)
    #[arg(short, long)]
    include: Option<PathBuf>,

    /// Number of parallel compile workers (defaults to CPU count)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Config file (defaults to ./shaderbuild.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Optional log file path for debug logging
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every stale shader once
    Compile {
        #[command(flatten)]
        common: CommonArgs,

        /// Recompile everything regardless of timestamps
        #[arg(short, long)]
        force: bool,

        /// Run the optimizer on each compiled shader
        #[arg(long)]
        optimize: bool,
    },

    /// Build everything, then recompile shaders as they change
    Watch {
        #[command(flatten)]
        common: CommonArgs,

        /// Skip the optimizer stage
        #[arg(long)]
        no_optimize: bool,

        /// Quiet period after the last change before compiling (milliseconds)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
}

impl Commands {
    fn common(&self) -> &CommonArgs {
        match self {
            Commands::Compile { common, .. } | Commands::Watch { common, .. } => common,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[Error] {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let common = cli.command.common();
    init_logging(common.log.as_deref(), common.verbose)?;

    match cli.command {
        Commands::Compile {
            common,
            force,
            optimize,
        } => {
            let mut config = resolve_config(&common)?;
            config.force = force;
            config.optimize = optimize;
            compile(config)
        }
        Commands::Watch {
            common,
            no_optimize,
            debounce_ms,
        } => {
            let mut config = resolve_config(&common)?;
            config.optimize = !no_optimize;
            if let Some(ms) = debounce_ms {
                config.debounce = Duration::from_millis(ms);
            }
            watch(config)
        }
    }
}

/// Defaults, then the config file, then command-line flags.
fn resolve_config(common: &CommonArgs) -> Result<BuildConfig> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let file = FileConfig::discover(common.config.as_deref(), &cwd)?;

    let mut config = BuildConfig::new(&common.source, &common.output).with_file(file);
    if let Some(include) = &common.include {
        config.include_dir = include.clone();
    }
    if let Some(threads) = common.threads {
        config.threads = threads;
    }

    config.validate()?;
    debug!("Resolved configuration: {:?}", config);
    Ok(config)
}

fn compile(config: BuildConfig) -> Result<ExitCode> {
    let console = ConsoleReporter::new();
    let compiler = Arc::new(ExternalCompiler::from_config(&config));
    let batch = BatchScheduler::new(compiler, config.threads)?;

    let jobs = discover_jobs(&config, &config.job_settings())?;
    console.batch_started(jobs.len(), batch.threads());
    if jobs.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }

    let outcome = batch.run(jobs, |progress| console.batch_progress(&progress))?;
    console.batch_finished(&outcome);

    if outcome.failed() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn watch(config: BuildConfig) -> Result<ExitCode> {
    let config = config
        .canonicalized()
        .context("Failed to resolve watch directories")?;
    let compiler = Arc::new(ExternalCompiler::from_config(&config));
    let reporter: Arc<dyn WatchReporter> = Arc::new(ConsoleReporter::new());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let summary = runtime.block_on(async move {
        let stop = StopSignal::new();
        let signals = spawn_signal_listener(stop.clone());

        let input = match spawn_stdin_reader() {
            Ok(lines) => Some(lines),
            Err(e) => {
                warn!("Interactive commands unavailable: {}", e);
                None
            }
        };

        let result = WatchSession::new(config, compiler, reporter)
            .run(stop.clone(), input)
            .await;

        stop.stop();
        let _ = signals.await;
        result
    })?;

    info!(
        compiled = summary.scheduler.dispatched,
        failed = summary.scheduler.failed,
        rebuilds = summary.scheduler.rebuilds,
        "Watch session summary"
    );
    Ok(ExitCode::SUCCESS)
}
