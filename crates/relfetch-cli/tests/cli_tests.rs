//! Integration tests for the relfetch binary.
//!
//! These only exercise paths that fail or finish before any network access.

use std::process::{Command, Output};

use tempfile::TempDir;

fn relfetch(home: &TempDir, args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_relfetch"));
    for var in [
        "INPUT_REPO",
        "INPUT_TAG",
        "INPUT_PLATFORM",
        "INPUT_ARCH",
        "INPUT_CACHE",
        "INPUT_CHMOD",
        "INPUT_BINARIES_LOCATION",
        "GITHUB_PATH",
        "GITHUB_ACTIONS",
        "RUNNER_TOOL_CACHE",
        "RELFETCH_CACHE_DIR",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("RELFETCH_HOME", home.path())
        .env("HOME", home.path())
        .args(args)
        .output()
        .expect("Failed to execute relfetch")
}

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    let output = relfetch(&home, &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--repo"));
    assert!(stdout.contains("--binaries-location"));
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    let output = relfetch(&home, &["--version"]);
    assert!(output.status.success());
}

#[test]
fn test_repo_is_required() {
    let home = TempDir::new().unwrap();
    let output = relfetch(&home, &[]);
    assert!(!output.status.success());
}

#[test]
fn test_unsupported_platform_fails() {
    let home = TempDir::new().unwrap();
    let output = relfetch(
        &home,
        &["--repo", "acme/tool", "--tag", "v1.0.0", "--platform", "plan9"],
    );

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unsupported platform: plan9"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn test_unsupported_platform_as_workflow_error() {
    let home = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_relfetch"))
        .env("RELFETCH_HOME", home.path())
        .env("GITHUB_ACTIONS", "true")
        .env("INPUT_REPO", "acme/tool")
        .env("INPUT_PLATFORM", "plan9")
        .output()
        .expect("Failed to execute relfetch");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("::error::Unsupported platform: plan9"), "stderr: {stderr}");
}

#[test]
fn test_malformed_repo_fails() {
    let home = TempDir::new().unwrap();
    let output = relfetch(&home, &["--repo", "just-a-name"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("just-a-name"), "stderr: {stderr}");
}

#[test]
fn test_invalid_chmod_fails() {
    let home = TempDir::new().unwrap();
    let output = relfetch(&home, &["--repo", "acme/tool", "--chmod", "rwxr-xr-x"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid chmod mode"), "stderr: {stderr}");
}
