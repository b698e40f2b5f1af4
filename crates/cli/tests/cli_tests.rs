#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;

fn workspace() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let document = json!({
        "version": 1,
        "defaultProject": "app",
        "projects": {
            "app": {
                "root": "app",
                "projectType": "application",
                "targets": {
                    "build": {
                        "builder": "@devkit/builders:noop",
                        "options": {"optimize": true},
                        "configurations": {"dev": {"optimize": false}}
                    },
                    "fail": {
                        "builder": "@devkit/builders:command",
                        "options": {"command": "sh", "args": ["-c", "exit 3"]}
                    },
                    "bad": {"builder": "@devkit/builders:command"}
                }
            }
        }
    });
    fs::create_dir_all(temp_dir.path().join("app")).unwrap();
    fs::write(
        temp_dir.path().join("angular.json"),
        serde_json::to_vec_pretty(&document).unwrap(),
    )
    .unwrap();
    temp_dir
}

fn architect(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("architect").unwrap();
    cmd.current_dir(dir.path()).env_remove("ARCHITECT_ROOT").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help() {
    let mut cmd = Command::cargo_bin("architect").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("describe"));
}

#[test]
fn test_validate_lists_targets() {
    let dir = workspace();
    architect(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Workspace is valid (1 projects)"))
        .stdout(predicate::str::contains("app (application): bad, build, fail"));
}

#[test]
fn test_validate_reports_schema_errors() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("angular.json"), r#"{"projects": {}}"#).unwrap();
    architect(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Schema validation failed"));
}

#[test]
fn test_missing_workspace_file() {
    let dir = TempDir::new().unwrap();
    architect(&dir)
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No workspace file found"));
}

#[test]
fn test_root_from_environment() {
    let dir = workspace();
    let elsewhere = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("architect").unwrap();
    cmd.current_dir(elsewhere.path())
        .env("ARCHITECT_ROOT", dir.path())
        .arg("validate")
        .assert()
        .success();
}

#[test]
fn test_target_applies_configuration_and_options() {
    let dir = workspace();
    let output = architect(&dir)
        .args(["target", "app:build:dev", "--option", "extra=[1,2]"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let target: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(target["builder"], "@devkit/builders:noop");
    assert_eq!(target["options"], json!({"optimize": false, "extra": [1, 2]}));
    assert!(target["root"].as_str().unwrap().ends_with("app"));
}

#[test]
fn test_target_missing_project() {
    let dir = workspace();
    architect(&dir)
        .args(["target", "web:build"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Project 'web' could not be found in workspace.",
        ));
}

#[test]
fn test_describe_builtin_builder() {
    let dir = workspace();
    architect(&dir)
        .args(["describe", "app:build"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"builder\": \"@devkit/builders:noop\""));
}

#[test]
fn test_run_prints_events() {
    let dir = workspace();
    architect(&dir)
        .args(["run", "app:build"])
        .assert()
        .success()
        .stdout("{\"success\":true}\n");
}

#[test]
fn test_run_rejects_invalid_options() {
    let dir = workspace();
    architect(&dir)
        .args(["run", "app:bad"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("command"));
}

#[cfg(unix)]
#[test]
fn test_run_failing_command_exits_non_zero() {
    let dir = workspace();
    architect(&dir)
        .args(["run", "app:fail"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"success\":false"))
        .stdout(predicate::str::contains("\"exitCode\":3"))
        .stderr(predicate::str::contains("did not complete successfully"));
}
