//! Interactive control loop: operator input and periodic status reports

use super::events::{WatchEvent, WatchReporter};
use super::scheduler::WatchCommand;
use super::shutdown::StopListener;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// True for an input line that requests a full rebuild (contains an uppercase `R`).
pub fn is_rebuild_command(line: &str) -> bool {
    line.contains('R')
}

/// Read stdin lines on a dedicated OS thread.
///
/// A blocking read cannot be cancelled, so it must not live on the runtime's
/// blocking pool where it would hold up runtime shutdown. The thread ends at
/// end of input or once the receiver is gone.
pub fn spawn_stdin_reader() -> std::io::Result<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
            debug!("stdin reader finished");
        })?;
    Ok(rx)
}

/// Forward rebuild requests from operator input to the scheduler.
///
/// End of input only disables command reading; the task keeps running until
/// `stop` is raised. It returns early if the scheduler has gone away.
pub async fn input_task(
    mut lines: mpsc::UnboundedReceiver<String>,
    commands: mpsc::UnboundedSender<WatchCommand>,
    mut stop: StopListener,
) {
    let mut input_open = true;
    loop {
        tokio::select! {
            _ = stop.stopped() => break,
            _ = commands.closed() => {
                debug!("Scheduler gone, input task exiting");
                break;
            }
            line = lines.recv(), if input_open => match line {
                Some(line) if is_rebuild_command(&line) => {
                    info!("Full rebuild requested");
                    if commands.send(WatchCommand::FullRebuild).is_err() {
                        break;
                    }
                }
                Some(line) => debug!("Ignoring input {:?}", line),
                None => {
                    debug!("Input closed; interactive commands disabled");
                    input_open = false;
                }
            },
        }
    }
}

/// Report the number of pending debounced compiles every `interval`.
///
/// Returns when `stop` is raised or the scheduler stops publishing.
pub async fn status_task(
    interval: Duration,
    pending: watch::Receiver<usize>,
    reporter: Arc<dyn WatchReporter>,
    mut stop: StopListener,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = stop.stopped() => break,
            _ = ticker.tick() => {
                if pending.has_changed().is_err() {
                    debug!("Scheduler gone, status task exiting");
                    break;
                }
                let count = *pending.borrow();
                if count > 0 {
                    reporter.report(WatchEvent::Status { pending: count });
                } else {
                    debug!("No pending compiles");
                }
            }
        }
    }
}
