//! End-to-end tests spawning the `ringlog` binary.

use std::path::Path;
use std::process::{Command, Output, Stdio};

fn ringlog() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ringlog"));
    cmd.env_remove("RUST_LOG")
        .env_remove("RINGLOG_CAPACITY")
        .env_remove("RINGLOG_SYNC_ON_COMMIT")
        .env_remove("RINGLOG_LOCK_TIMEOUT_MS");
    cmd
}

fn stream(cmd: &str, path: &Path, count: u32, size: u32, capacity: u32) -> Command {
    let mut command = ringlog();
    command
        .arg(cmd)
        .arg(path)
        .args(["-c", &count.to_string()])
        .args(["-s", &size.to_string()])
        .args(["-f", &capacity.to_string()]);
    command
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn send_and_recv_in_separate_processes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stream.log");

    let recv = stream("recv", &path, 500, 100, 1024)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let send = stream("send", &path, 500, 100, 1024)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let send = send.wait_with_output().unwrap();
    let recv = recv.wait_with_output().unwrap();

    assert!(send.status.success(), "send failed: {:?}", send);
    assert!(recv.status.success(), "recv failed: {:?}", recv);
    assert!(stdout(&recv).contains("received 50000 count 500 size 100 capacity 1024"));

    let inspect = ringlog().arg("inspect").arg(&path).arg("--json").output().unwrap();
    assert!(inspect.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&inspect.stdout).unwrap();
    assert_eq!(stats["capacity"], 1024);
    assert_eq!(stats["committed"], 0);
}

#[test]
fn send_aborts_when_block_exceeds_capacity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.log");

    let output = stream("send", &path, 1, 128, 64).output().unwrap();
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn inspect_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.log");

    let output = ringlog().arg("inspect").arg(&path).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
    assert!(!path.exists());
}

#[test]
fn reset_then_remove() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reset.log");

    let send = stream("send", &path, 4, 16, 128).output().unwrap();
    assert!(send.status.success(), "send failed: {:?}", send);

    let inspect = ringlog().arg("inspect").arg(&path).output().unwrap();
    assert!(stdout(&inspect).contains("Committed:   64 bytes"));

    assert!(ringlog().arg("reset").arg(&path).status().unwrap().success());
    let inspect = ringlog().arg("inspect").arg(&path).output().unwrap();
    assert!(stdout(&inspect).contains("Committed:   0 bytes"));

    assert!(ringlog().arg("remove").arg(&path).status().unwrap().success());
    assert!(!path.exists());
    assert!(ringlog().arg("remove").arg(&path).status().unwrap().success());
}
