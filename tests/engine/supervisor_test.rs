//! Integration tests for the engine supervisor.

use std::time::{Duration, Instant};

use gomoku_bridge::engine::{EngineError, EngineOutput, EngineSupervisor, SpawnError};
use gomoku_bridge::protocol::{Command, Mode, Position};
use tokio::sync::mpsc;

type Output = mpsc::UnboundedReceiver<EngineOutput>;

fn start_script(script: &str) -> (EngineSupervisor, Output) {
    let (tx, rx) = mpsc::unbounded_channel();
    let supervisor = EngineSupervisor::start_with_args("/bin/sh", ["-c", script], tx)
        .expect("Failed to start /bin/sh");
    (supervisor, rx)
}

async fn next_output(rx: &mut Output) -> EngineOutput {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("Timed out waiting for engine output")
        .expect("Engine output channel closed")
}

fn line(text: &str) -> EngineOutput {
    EngineOutput::Line(text.to_string())
}

#[tokio::test]
async fn missing_executable_is_not_found() {
    let (tx, _rx) = mpsc::unbounded_channel::<EngineOutput>();
    let err = EngineSupervisor::start("/nonexistent/gomoku_core", tx).unwrap_err();
    assert!(matches!(err, SpawnError::NotFound(_)));
}

#[tokio::test]
async fn commands_are_written_as_lines_in_order() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let supervisor = EngineSupervisor::start("/bin/cat", tx).expect("Failed to start cat");

    supervisor.send(&Command::SetMode(Mode::Pve)).unwrap();
    supervisor
        .send(&Command::Move(Position::new(3, 4).unwrap()))
        .unwrap();
    supervisor.send(&Command::Restart).unwrap();

    assert_eq!(next_output(&mut rx).await, line("SET_MODE PVE"));
    assert_eq!(next_output(&mut rx).await, line("MOVE 3,4"));
    assert_eq!(next_output(&mut rx).await, line("RESTART"));

    tokio_test::assert_ok!(supervisor.stop().await);
}

#[tokio::test]
async fn split_reads_are_reassembled_before_exit() {
    let (supervisor, mut rx) = start_script(
        "printf 'AI_THINKING\\nMOV'; sleep 0.1; printf 'ED 7,7,1\\r\\nWINNER BL'; sleep 0.1; printf 'ACK'",
    );

    assert_eq!(next_output(&mut rx).await, line("AI_THINKING"));
    assert_eq!(next_output(&mut rx).await, line("MOVED 7,7,1"));
    assert_eq!(next_output(&mut rx).await, line("WINNER BLACK"));
    assert_eq!(next_output(&mut rx).await, EngineOutput::Exited);

    assert!(!supervisor.is_alive());
    tokio_test::assert_ok!(supervisor.stop().await);
}

#[tokio::test]
async fn stderr_is_kept_off_the_protocol_stream() {
    let (supervisor, mut rx) = start_script("echo 'debug noise' >&2; echo AI_THINKING");

    assert_eq!(next_output(&mut rx).await, line("AI_THINKING"));
    assert_eq!(next_output(&mut rx).await, EngineOutput::Exited);
    tokio_test::assert_ok!(supervisor.stop().await);
}

#[tokio::test]
async fn send_after_exit_is_unavailable() {
    let (supervisor, mut rx) = start_script("exit 3");
    let sender = supervisor.sender();

    assert_eq!(next_output(&mut rx).await, EngineOutput::Exited);
    assert_eq!(
        sender.send(&Command::SetMode(Mode::Pvp)),
        Err(EngineError::Unavailable)
    );
    assert!(!sender.is_alive());
    tokio_test::assert_ok!(supervisor.stop().await);
}

#[tokio::test]
async fn stop_kills_an_engine_that_ignores_termination() {
    let (supervisor, _rx) = start_script("trap '' TERM; exec sleep 30");
    let supervisor = supervisor.with_grace_period(Duration::from_millis(200));
    assert!(supervisor.id().is_some());

    // Let the shell install the trap before the signal arrives.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    tokio_test::assert_ok!(supervisor.stop().await);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn stop_after_polite_exit_is_fine() {
    let (supervisor, _rx) = start_script("while read line; do :; done");
    assert!(supervisor.is_alive());
    tokio_test::assert_ok!(supervisor.stop().await);
}
