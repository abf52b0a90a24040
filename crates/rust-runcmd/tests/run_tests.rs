//! Integration tests for plain command runs.

mod common;

use std::fmt::Write as _;

use common::{fast_options, process_gone};
use rust_runcmd::{
    Backend, Command, Outcome, RunError, RunOptions, SpawnError, WaitStrategy, run, run_file,
    run_nocheck, run_pty, run_simple,
};

#[tokio::test]
async fn output_round_trip_simple() {
    let result = run_simple("for i in $(seq 1 500); do echo out$i; echo err$i >&2; done")
        .await
        .unwrap();

    let mut expected = String::new();
    for i in 1..=500 {
        writeln!(expected, "out{i}").unwrap();
        writeln!(expected, "err{i}").unwrap();
    }
    assert!(result.success());
    assert_eq!(result.output_str(), expected);
}

#[tokio::test]
async fn output_round_trip_loop() {
    let options = fast_options()
        .backend(Backend::AsyncPipe)
        .wait(WaitStrategy::Loop);
    let result = run(
        "for i in $(seq 1 200); do echo line$i; [ $((i % 50)) -eq 0 ] && sleep 0.05; done; true",
        options,
    )
    .await
    .unwrap();

    let expected: String = (1..=200).map(|i| format!("line{i}\n")).collect();
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.output_str(), expected);
}

#[tokio::test]
async fn blocking_pipe_loop_reads_everything() {
    let options = fast_options().backend(Backend::Pipe).wait(WaitStrategy::Loop);
    let payload = "x".repeat(5000);
    let result = run(format!("printf '{payload}'"), options).await.unwrap();
    assert_eq!(result.output_str(), payload);
}

#[tokio::test]
async fn token_commands_are_joined() {
    let result = run(Command::tokens(["echo", "a", "b"]), RunOptions::new())
        .await
        .unwrap();
    assert_eq!(result.output, b"a b\n");
}

#[tokio::test]
async fn non_zero_exit_is_not_an_error() {
    let result = run_nocheck("echo failing; exit 7").await.unwrap();
    assert_eq!(result.exit_code, 7);
    assert_eq!(result.outcome(), Outcome::Failed(7));
    assert_eq!(result.output, b"failing\n");
}

#[tokio::test]
async fn signal_death_is_negative() {
    let result = run_nocheck("kill -9 $$").await.unwrap();
    assert_eq!(result.exit_code, -9);
}

#[tokio::test]
async fn input_is_written_then_closed() {
    let result = run("cat; echo done", RunOptions::new().input("hello\n"))
        .await
        .unwrap();
    assert_eq!(result.output, b"hello\ndone\n");
}

#[tokio::test]
async fn stdin_is_closed_without_input() {
    let options = fast_options().timeout(std::time::Duration::from_secs(10));
    let result = run("cat; echo eof", options).await.unwrap();
    assert_eq!(result.output, b"eof\n");
}

#[tokio::test]
async fn working_dir_applies_to_child_only() {
    let dir = tempfile::tempdir().unwrap();
    let before = std::env::current_dir().unwrap();

    let result = run("pwd -P", RunOptions::new().working_dir(dir.path()))
        .await
        .unwrap();

    let expected = std::fs::canonicalize(dir.path()).unwrap();
    assert_eq!(result.output_str().trim_end(), expected.to_str().unwrap());
    assert_eq!(std::env::current_dir().unwrap(), before);
}

#[tokio::test]
async fn non_directory_working_dir_is_setup_failure() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("plain-file");
    std::fs::write(&file, "").unwrap();

    let err = run("true", RunOptions::new().working_dir(&file))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RunError::Spawn(SpawnError::InvalidWorkingDir { .. })
    ));
}

#[tokio::test]
async fn empty_command_is_setup_failure() {
    let err = run_simple("").await.unwrap_err();
    assert!(matches!(err, RunError::Spawn(SpawnError::EmptyCommand)));
}

#[tokio::test]
async fn file_backend_redirects_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.log");

    let result = run_file("echo to-file; echo err >&2; exit 2", &path)
        .await
        .unwrap();

    assert_eq!(result.exit_code, 2);
    assert!(result.output.is_empty());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "to-file\nerr\n");
}

#[tokio::test]
async fn file_backend_bad_path_is_setup_failure() {
    let err = run_file("true", "/no/such/dir/out.log").await.unwrap_err();
    assert!(matches!(
        err,
        RunError::Spawn(SpawnError::OutputFile { .. })
    ));
}

#[tokio::test]
async fn pty_backend_gives_a_terminal() {
    // PTY allocation can be unavailable in minimal containers.
    if rust_runcmd::pty::PtyPair::open().is_err() {
        return;
    }
    let result = run_pty("test -t 0 && test -t 1").await.unwrap();
    assert_eq!(result.exit_code, 0);
    assert!(result.output.is_empty());
}

#[tokio::test]
async fn dropped_run_kills_the_group() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = dir.path().join("pid");
    let command = format!("sleep 300 & echo $! > {}; wait", pidfile.display());

    let handle = tokio::spawn(run(command, fast_options().wait(WaitStrategy::Loop)));
    while !pidfile.exists() || std::fs::read_to_string(&pidfile).unwrap().trim().is_empty() {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    handle.abort();
    let _ = handle.await;

    assert!(process_gone(common::read_pid(&pidfile)));
}
