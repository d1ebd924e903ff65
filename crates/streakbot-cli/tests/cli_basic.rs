//! Basic CLI E2E tests.
//!
//! Each test runs the built binary with `HOME` pointed at a fresh temporary
//! directory, so config and database never touch the real user profile.

use std::io::Write;
use std::process::{Command, Stdio};

use tempfile::TempDir;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &TempDir, args: &[&str], stdin: &str) -> (i32, String, String) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_streakbot"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("STREAKBOT_ENV")
        .env("RUST_LOG", "streakbot=warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("Failed to write stdin");
    let output = child.wait_with_output().expect("Failed to wait for CLI");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (output.status.code().unwrap_or(-1), stdout, stderr)
}

#[test]
fn test_run_answers_commands_from_stdin() {
    let home = TempDir::new().unwrap();
    let input = "alice: !checkin\nalice: hello\nalice: !checkin\nnot a chat line\n";
    let (code, stdout, stderr) = run_cli(&home, &["run", "--seed", "1"], input);
    assert_eq!(code, 0, "run failed: {stderr}");

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec![
            "[#streakbot] @alice, you have checked in for the first time! Your current streak is 1 day.",
            "[#streakbot] @alice, you have already checked in today. Please try again later!",
        ]
    );
}

#[test]
fn test_state_survives_between_runs() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&home, &["run"], "bob: !checkin\nbob: !tf\n");
    assert_eq!(code, 0, "run failed: {stderr}");

    let (code, stdout, _) = run_cli(&home, &["user", "show", "bob"], "");
    assert_eq!(code, 0);
    let record: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(record["streak"], 1);
    assert!(record["animal"].is_string());

    let (code, stdout, _) = run_cli(&home, &["transformed", "list"], "");
    assert_eq!(code, 0);
    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(rows.as_array().map(Vec::len), Some(1));
    assert_eq!(rows[0]["username"], "bob");

    // The transformation is reported, not re-rolled, after a restart.
    let (_, stdout, _) = run_cli(&home, &["run"], "bob: !tf\n");
    assert!(stdout.starts_with("[#streakbot] @bob is currently TF'd into a "));
}

#[test]
fn test_unknown_user_fails() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&home, &["user", "show", "nobody"], "");
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown user: nobody"));
}

#[test]
fn test_sweep_with_nothing_expired() {
    let home = TempDir::new().unwrap();
    let (code, stdout, stderr) = run_cli(&home, &["sweep"], "");
    assert_eq!(code, 0, "sweep failed: {stderr}");
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["evicted"], serde_json::json!([]));
}

#[test]
fn test_config_set_get_and_reset() {
    let home = TempDir::new().unwrap();

    let (code, stdout, _) = run_cli(&home, &["config", "get", "channel"], "");
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "#streakbot");

    let (code, _, _) = run_cli(&home, &["config", "set", "channel", "#den"], "");
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(&home, &["config", "get", "channel"], "");
    assert_eq!(stdout.trim(), "#den");

    let (_, stdout, _) = run_cli(&home, &["run"], "carol: !checkin\n");
    assert!(stdout.starts_with("[#den] @carol"));

    let (code, _, stderr) = run_cli(&home, &["config", "set", "sweep_interval_secs", "0"], "");
    assert_ne!(code, 0);
    assert!(stderr.starts_with("error:"));

    let (code, _, _) = run_cli(&home, &["config", "reset"], "");
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(&home, &["config", "get", "channel"], "");
    assert_eq!(stdout.trim(), "#streakbot");
}

#[test]
fn test_config_get_unknown_key() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&home, &["config", "get", "no_such_key"], "");
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown key"));
}
