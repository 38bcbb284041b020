//! Integration tests for CLI help output and argument validation.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_lists_commands() {
    cargo_bin_cmd!("jarvis")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("logout"))
        .stdout(predicate::str::contains("resumes"));
}

#[test]
fn test_get_rejects_malformed_query() {
    cargo_bin_cmd!("jarvis")
        .args(["get", "/api/jobs", "--query", "novalue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected KEY=VALUE"));
}

#[test]
fn test_config_path_respects_jarvis_home() {
    let temp = tempfile::tempdir().unwrap();
    cargo_bin_cmd!("jarvis")
        .env("JARVIS_HOME", temp.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"))
        .stdout(predicate::str::contains(
            temp.path().to_string_lossy().as_ref(),
        ));
}
