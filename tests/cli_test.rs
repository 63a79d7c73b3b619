//! Integration tests for the wavegraph CLI
//!
//! These tests run the actual binary against graph documents in a temp dir.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Get the binary to test
fn wavegraph_cmd() -> Command {
    let mut cmd = Command::cargo_bin("wavegraph").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("WAVEGRAPH_MAX_ITERATIONS")
        .env_remove("WAVEGRAPH_TIMEOUT_MS");
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const ECHO: &str = r#"
schema: wavegraph/graph@1
components:
  echo:
    type: PassThrough
    params: { type: str }
  upper:
    type: PassThrough
    params: { type: str }
connections:
  - { sender: echo.value, receiver: upper.value }
"#;

const BROKEN: &str = r#"
schema: wavegraph/graph@1
components:
  a: { type: PassThrough, params: { type: int } }
  b: { type: PassThrough, params: { type: str } }
connections:
  - { sender: a.value, receiver: b.value }
"#;

#[test]
fn test_help_flag() {
    wavegraph_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("typed component-graph runner"));
}

#[test]
fn test_run_help_lists_flags() {
    wavegraph_cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--input"))
        .stdout(predicate::str::contains("--max-iterations"))
        .stdout(predicate::str::contains("--sequential"));
}

#[test]
fn test_validate_valid_graph() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "echo.yaml", ECHO);

    wavegraph_cmd()
        .arg("validate")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"))
        .stdout(predicate::str::contains("Components: 2"));
}

#[test]
fn test_validate_type_mismatch_shows_code_and_fix() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "broken.yaml", BROKEN);

    wavegraph_cmd()
        .arg("validate")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("WAVE-006"))
        .stderr(predicate::str::contains("Fix:"));
}

#[test]
fn test_validate_missing_file() {
    wavegraph_cmd()
        .args(["validate", "/nonexistent/graph.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("WAVE-015"));
}

#[test]
fn test_inspect_lists_sockets_and_edges() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "echo.yaml", ECHO);

    wavegraph_cmd()
        .arg("inspect")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("PassThrough"))
        .stdout(predicate::str::contains("echo.value → upper.value"))
        .stdout(predicate::str::contains("upper.value"));
}

#[test]
fn test_run_prints_outputs_as_json() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "echo.yaml", ECHO);

    let output = wavegraph_cmd()
        .arg("run")
        .arg(&file)
        .args(["--input", "echo.value=\"hello\""])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["upper.value"], serde_json::json!("hello"));
}

#[test]
fn test_run_bare_text_input_is_a_string() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "echo.json", &serde_json::to_string(&serde_json::json!({
        "schema": "wavegraph/graph@1",
        "components": { "echo": { "type": "PassThrough", "params": { "type": "str" } } }
    })).unwrap());

    wavegraph_cmd()
        .arg("run")
        .arg(&file)
        .args(["-i", "echo.value=plain words", "--sequential"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"plain words\""));
}

#[test]
fn test_run_malformed_json_input_fails() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "echo.yaml", ECHO);

    for raw in ["echo.value={\"a\":1", "echo.value=[1, 2", "echo.value=\"unterminated"] {
        wavegraph_cmd()
            .arg("run")
            .arg(&file)
            .args(["--input", raw])
            .assert()
            .failure()
            .stderr(predicate::str::contains("WAVE-036"))
            .stderr(predicate::str::contains("invalid JSON"));
    }
}

#[test]
fn test_run_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "echo.yaml", ECHO);

    wavegraph_cmd()
        .arg("run")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("WAVE-035"));
}

#[test]
fn test_run_with_config_file() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "echo.yaml", ECHO);
    let config = write(&dir, "config.toml", "[run]\nmax_iterations = 0\n");

    wavegraph_cmd()
        .arg("run")
        .arg(&file)
        .args(["--input", "echo.value=\"x\"", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("WAVE-037"));
}
