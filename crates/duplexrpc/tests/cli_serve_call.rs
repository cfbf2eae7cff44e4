#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/drpccli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn cli(args: &[&str], sock_path: &Path) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_duplexrpc"));
    cmd.arg("--log-level").arg("error").arg("--format").arg("json");
    let (sub, rest) = args.split_first().expect("subcommand required");
    cmd.arg(sub).arg(sock_path).args(rest);
    cmd.output().expect("cli should run")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be json")
}

/// Ping until the server answers; refused connections are not counted as peers.
fn wait_for_server(sock_path: &Path, timeout: Duration) {
    let start = Instant::now();
    loop {
        if sock_path.exists() && cli(&["call", "ping"], sock_path).status.success() {
            return;
        }
        if start.elapsed() >= timeout {
            panic!("server did not come up");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

#[test]
fn serve_answers_calls_and_reports_errors() {
    let dir = unique_temp_dir("serve");
    let sock_path = dir.join("rpc.sock");

    let mut child = Command::new(env!("CARGO_BIN_EXE_duplexrpc"))
        .arg("--log-level")
        .arg("error")
        .arg("serve")
        .arg(&sock_path)
        .arg("--count")
        .arg("5")
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("serve command should start");

    wait_for_server(&sock_path, Duration::from_secs(5));

    let add = cli(&["call", "add", "1", "2", "-4"], &sock_path);
    assert!(add.status.success());
    assert_eq!(
        stdout_json(&add),
        serde_json::json!({"function": "add", "mode": "sync", "result": -1})
    );

    let echo = cli(&["call", "echo", "hello"], &sock_path);
    assert_eq!(stdout_json(&echo)["result"], "hello");

    let unknown = cli(&["call", "nope"], &sock_path);
    assert_eq!(unknown.status.code(), Some(64));

    let remote = cli(&["call", "add", "one"], &sock_path);
    assert_eq!(remote.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&remote.stderr).contains("remote handler failed"));

    let status = child.wait().expect("server should exit after its peer count");
    assert!(status.success());
    assert!(!sock_path.exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn call_without_server_is_transport_error() {
    let dir = unique_temp_dir("noserver");
    let sock_path = dir.join("missing.sock");

    let output = cli(&["call", "ping"], &sock_path);
    assert_eq!(output.status.code(), Some(3));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_duplexrpc"))
        .arg("version")
        .output()
        .expect("version should run");
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert_eq!(text.trim(), format!("duplexrpc {}", env!("CARGO_PKG_VERSION")));
}
