//! Integration tests for wall-clock timeouts.

mod common;

use std::time::{Duration, Instant};

use common::{fast_options, process_gone, read_pid};
use rust_runcmd::{
    Backend, Outcome, RunOptions, TIMEOUT_EXIT_CODE, TIMEOUT_OUTPUT, WaitStrategy, run,
    run_timeout,
};

#[tokio::test]
async fn long_command_times_out() {
    let started = Instant::now();
    let result = run_timeout("echo started; sleep 30", Duration::from_millis(300))
        .await
        .unwrap();

    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    assert_eq!(result.output, TIMEOUT_OUTPUT.as_bytes());
    assert_eq!(result.outcome(), Outcome::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn timeout_kills_grandchildren() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = dir.path().join("pid");
    let command = format!("sleep 300 & echo $! > {}; wait", pidfile.display());

    let result = run(command, fast_options().timeout(Duration::from_millis(300)))
        .await
        .unwrap();

    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    assert!(process_gone(read_pid(&pidfile)));
}

#[tokio::test]
async fn short_command_finishes_before_timeout() {
    let result = run("echo quick", fast_options().timeout(Duration::from_secs(10)))
        .await
        .unwrap();
    assert!(result.success());
    assert_eq!(result.output, b"quick\n");
}

#[tokio::test]
async fn timeout_cuts_blocking_reads() {
    // A blocking pipe read waits for a full chunk; the deadline must still win.
    let options = fast_options()
        .backend(Backend::Pipe)
        .wait(WaitStrategy::Loop)
        .timeout(Duration::from_millis(300));
    let started = Instant::now();

    let result = run("printf 'partial'; sleep 30", options).await.unwrap();

    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn timeout_turns_simple_into_loop() {
    let options = RunOptions::new()
        .wait(WaitStrategy::Simple)
        .timeout(Duration::from_millis(200));
    let result = run("sleep 30", options).await.unwrap();
    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
}

#[tokio::test]
async fn descendant_holding_pipe_past_deadline_is_killed() {
    // The shell exits at once, but the background sleep keeps the blocking
    // pipe open until the deadline.
    let dir = tempfile::tempdir().unwrap();
    let pidfile = dir.path().join("pid");
    let command = format!("sleep 30 & echo $! > {}; echo hi", pidfile.display());
    let options = fast_options()
        .backend(Backend::Pipe)
        .wait(WaitStrategy::Loop)
        .timeout(Duration::from_millis(500));
    let started = Instant::now();

    let result = run(command, options).await.unwrap();

    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    assert_eq!(result.output, TIMEOUT_OUTPUT.as_bytes());
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(process_gone(read_pid(&pidfile)));
}
