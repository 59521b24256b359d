//! Input and status tasks of the interactive control loop.

use crate::tests::test_utils::wait_until;
use crate::watch::control::{input_task, is_rebuild_command, status_task};
use crate::watch::{RecordingReporter, StopSignal, WatchCommand, WatchEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

const PATIENCE: Duration = Duration::from_secs(5);

#[test]
fn test_rebuild_command_recognition() {
    assert!(is_rebuild_command("R"));
    assert!(is_rebuild_command("  Rebuild please"));
    assert!(is_rebuild_command("FULL REBUILD"));
    // Lowercase words must not wipe the outputs.
    assert!(!is_rebuild_command("r"));
    assert!(!is_rebuild_command("clear"));
    assert!(!is_rebuild_command("start"));
    assert!(!is_rebuild_command(""));
    assert!(!is_rebuild_command("help"));
    assert!(!is_rebuild_command("q"));
}

#[tokio::test]
async fn test_input_lines_become_rebuild_commands() {
    let (lines_tx, lines_rx) = mpsc::unbounded_channel();
    let (commands_tx, mut commands_rx) = mpsc::unbounded_channel();
    let stop = StopSignal::new();
    let handle = tokio::spawn(input_task(lines_rx, commands_tx, stop.subscribe()));

    for line in ["hello", "R", "stop", "Rebuild"] {
        lines_tx.send(line.to_string()).unwrap();
    }

    assert_eq!(commands_rx.recv().await, Some(WatchCommand::FullRebuild));
    assert_eq!(commands_rx.recv().await, Some(WatchCommand::FullRebuild));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(commands_rx.try_recv().is_err());

    stop.stop();
    tokio::time::timeout(PATIENCE, handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_end_of_input_does_not_end_the_task() {
    let (lines_tx, lines_rx) = mpsc::unbounded_channel::<String>();
    let (commands_tx, _commands_rx) = mpsc::unbounded_channel();
    let stop = StopSignal::new();
    let handle = tokio::spawn(input_task(lines_rx, commands_tx, stop.subscribe()));

    drop(lines_tx);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.is_finished());

    stop.stop();
    tokio::time::timeout(PATIENCE, handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_input_task_exits_when_scheduler_is_gone() {
    let (_lines_tx, lines_rx) = mpsc::unbounded_channel::<String>();
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let stop = StopSignal::new();
    let handle = tokio::spawn(input_task(lines_rx, commands_tx, stop.subscribe()));

    drop(commands_rx);
    tokio::time::timeout(PATIENCE, handle).await.unwrap().unwrap();
    assert!(!stop.is_stopped());
}

#[tokio::test]
async fn test_status_reports_pending_count() {
    let (pending_tx, pending_rx) = watch::channel(0usize);
    let reporter = Arc::new(RecordingReporter::new());
    let stop = StopSignal::new();
    let handle = tokio::spawn(status_task(
        Duration::from_millis(30),
        pending_rx,
        reporter.clone(),
        stop.subscribe(),
    ));

    // Idle ticks report nothing.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(reporter.events().is_empty());

    pending_tx.send_replace(2);
    assert!(
        wait_until(PATIENCE, || reporter
            .events()
            .contains(&WatchEvent::Status { pending: 2 }))
        .await
    );

    stop.stop();
    tokio::time::timeout(PATIENCE, handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_status_task_exits_when_scheduler_is_gone() {
    let (pending_tx, pending_rx) = watch::channel(0usize);
    let stop = StopSignal::new();
    let handle = tokio::spawn(status_task(
        Duration::from_millis(20),
        pending_rx,
        Arc::new(RecordingReporter::new()),
        stop.subscribe(),
    ));

    drop(pending_tx);
    tokio::time::timeout(PATIENCE, handle).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_stop_signal_is_sticky_and_shared() {
    let stop = StopSignal::new();
    let mut early = stop.subscribe();
    let clone = stop.clone();

    assert!(!early.is_stopped());
    clone.stop();
    clone.stop();

    tokio::time::timeout(PATIENCE, early.stopped()).await.unwrap();
    let mut late = stop.subscribe();
    tokio::time::timeout(PATIENCE, late.stopped()).await.unwrap();
    assert!(stop.is_stopped() && late.is_stopped());
}
