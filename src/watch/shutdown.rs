//! Stop flag shared by the watch-session tasks, and the termination-signal listener

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Cloneable stop flag. Once raised it stays raised.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Raise the flag. Idempotent.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> StopListener {
        StopListener {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving side of a [`StopSignal`], one per task.
#[derive(Debug, Clone)]
pub struct StopListener {
    rx: watch::Receiver<bool>,
}

impl StopListener {
    /// Resolves once the flag is raised (immediately if it already is).
    pub async fn stopped(&mut self) {
        // The sender lives inside every StopSignal clone; losing it means stop too.
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Resolve on Ctrl+C or SIGTERM. Returns the signal's name.
#[cfg(unix)]
pub async fn wait_for_termination() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.map(|_| "interrupt"),
        _ = terminate.recv() => Ok("terminate"),
    }
}

/// Resolve on Ctrl+C. Returns the signal's name.
#[cfg(not(unix))]
pub async fn wait_for_termination() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "interrupt")
}

/// Raise `stop` when a termination signal arrives.
pub fn spawn_signal_listener(stop: StopSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut listener = stop.subscribe();
        tokio::select! {
            res = wait_for_termination() => match res {
                Ok(name) => {
                    info!("Received {} signal", name);
                    stop.stop();
                }
                Err(e) => warn!("Cannot listen for termination signals: {}", e),
            },
            _ = listener.stopped() => {}
        }
    })
}
