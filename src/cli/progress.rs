/// Console output for batch and watch mode
///
/// Status lines go to stdout; failures go to stderr prefixed `[Error]` so
/// they stand apart from informational output. Every line is produced by a
/// pure `format_*`/`render_*` function and only printed by [`ConsoleReporter`].
use crate::batch::BatchProgress;
use crate::job::{BatchOutcome, CompileResult};
use crate::watch::{BuildKind, WatchEvent, WatchReporter};
use std::path::Path;

/// One line of console output and the stream it belongs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    Out(String),
    Err(String),
}

impl ConsoleLine {
    pub fn text(&self) -> &str {
        match self {
            ConsoleLine::Out(text) | ConsoleLine::Err(text) => text,
        }
    }
}

/// `[i/total] Compiled: name`, `[i/total] Up-to-date: name` or `[i/total] Failed: name`
pub fn format_progress_line(index: usize, total: usize, result: &CompileResult) -> String {
    let status = if !result.is_success() {
        "Failed"
    } else if result.compiled {
        "Compiled"
    } else {
        "Up-to-date"
    };
    format!("[{}/{}] {}: {}", index, total, status, result.display_name())
}

pub fn format_error_line(name: &str, message: &str) -> String {
    format!("[Error] {}: {}", name, message.trim_end())
}

pub fn format_banner(total: usize, threads: usize) -> String {
    if total == 0 {
        "No shaders found.".to_string()
    } else {
        format!(
            "Found {} shader(s). Starting compilation with {} threads...",
            total, threads
        )
    }
}

/// Summary after a batch. Failed jobs are not counted as recompiled.
pub fn format_summary(outcome: &BatchOutcome) -> String {
    let failed = outcome.failures.len();
    let recompiled = outcome.recompiled;
    if failed == 0 {
        format!(
            "Shader compilation finished: {}/{} recompiled.",
            recompiled, outcome.total
        )
    } else {
        format!(
            "Shader compilation finished: {}/{} recompiled, {} failed.",
            recompiled, outcome.total, failed
        )
    }
}

pub fn format_watching(root: &Path) -> String {
    format!(
        "Watching {} for shader changes... (press R + Enter to rebuild all, Ctrl+C to quit)",
        root.display()
    )
}

pub fn render_progress(index: usize, total: usize, result: &CompileResult) -> Vec<ConsoleLine> {
    let mut lines = vec![ConsoleLine::Out(format_progress_line(index, total, result))];
    if let Some(message) = &result.error {
        lines.push(ConsoleLine::Err(format_error_line(
            &result.display_name(),
            message,
        )));
    }
    lines
}

/// Console lines for one watch-session event. Some events print nothing.
pub fn render_event(event: &WatchEvent) -> Vec<ConsoleLine> {
    match event {
        WatchEvent::BatchStarted { total, threads, .. } => {
            vec![ConsoleLine::Out(format_banner(*total, *threads))]
        }
        WatchEvent::BatchProgress {
            index,
            total,
            result,
            ..
        } => render_progress(*index, *total, result),
        WatchEvent::BatchFinished { outcome, .. } if outcome.total == 0 => Vec::new(),
        WatchEvent::BatchFinished { outcome, .. } => {
            vec![ConsoleLine::Out(format_summary(outcome))]
        }
        WatchEvent::BatchFailed { kind, message } => {
            let what = match kind {
                BuildKind::Startup => "Initial build",
                BuildKind::Rebuild => "Rebuild",
            };
            vec![ConsoleLine::Err(format!("[Error] {} failed: {}", what, message))]
        }
        WatchEvent::Watching { root } => vec![ConsoleLine::Out(format_watching(root))],
        WatchEvent::Scheduled { .. } => Vec::new(),
        WatchEvent::Compiled { path } => {
            vec![ConsoleLine::Out(format!("[Compiled] {}", file_name(path)))]
        }
        WatchEvent::CompileFailed { path, message } => {
            vec![ConsoleLine::Err(format_error_line(&file_name(path), message))]
        }
        WatchEvent::Dropped { .. } => Vec::new(),
        WatchEvent::RebuildRequested { .. } => {
            vec![ConsoleLine::Out("Rebuilding all shaders...".to_string())]
        }
        WatchEvent::Status { pending } => vec![ConsoleLine::Out(format!(
            "[Status] {} compile(s) pending",
            pending
        ))],
        WatchEvent::ShuttingDown => vec![ConsoleLine::Out("Shutting down...".to_string())],
        WatchEvent::Stopped { discarded } if *discarded > 0 => vec![ConsoleLine::Out(format!(
            "Stopped watching. ({} pending compile(s) discarded)",
            discarded
        ))],
        WatchEvent::Stopped { .. } => vec![ConsoleLine::Out("Stopped watching.".to_string())],
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Prints status lines to the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn batch_started(&self, total: usize, threads: usize) {
        println!("{}", format_banner(total, threads));
    }

    pub fn batch_progress(&self, progress: &BatchProgress<'_>) {
        self.print(render_progress(
            progress.index,
            progress.total,
            progress.result,
        ));
    }

    pub fn batch_finished(&self, outcome: &BatchOutcome) {
        println!("{}", format_summary(outcome));
    }

    fn print(&self, lines: Vec<ConsoleLine>) {
        for line in lines {
            match line {
                ConsoleLine::Out(text) => println!("{}", text),
                ConsoleLine::Err(text) => eprintln!("{}", text),
            }
        }
    }
}

impl WatchReporter for ConsoleReporter {
    fn report(&self, event: WatchEvent) {
        self.print(render_event(&event));
    }
}
