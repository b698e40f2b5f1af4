//! Built-in builders driven through a real architect on a temp workspace.

#![allow(clippy::unwrap_used, clippy::expect_used)]
#![cfg(unix)]

use devkit_architect::{
    BuilderRegistry, Error, LocalHost, PartialBuilderContext, TargetSpecifier,
};
use futures::StreamExt;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const SERVER_SCRIPT: &str = r#"#!/bin/sh
trap 'echo stopped > stopped; exit 0' TERM
echo started > started
while true; do sleep 0.1; done
"#;

fn workspace(dir: &Path, targets: Value) {
    let document = json!({
        "version": 1,
        "defaultProject": "app",
        "projects": {
            "app": {
                "root": "app",
                "projectType": "application",
                "targets": targets
            }
        }
    });
    std::fs::create_dir_all(dir.join("app")).unwrap();
    std::fs::write(
        dir.join("angular.json"),
        serde_json::to_vec_pretty(&document).unwrap(),
    )
    .unwrap();
}

fn server_targets() -> Value {
    json!({
        "build": {
            "builder": "@devkit/builders:command",
            "options": {
                "command": "sh",
                "args": ["-c", "mkdir -p ../dist && cp ../server.sh ../dist/server && chmod +x ../dist/server"],
                "output": "dist/server"
            }
        },
        "serve": {
            "builder": "@devkit/builders:binary",
            "options": {"buildTarget": "app:build"}
        },
        "broken": {
            "builder": "@devkit/builders:binary",
            "options": {"buildTarget": "app:missing"}
        },
        "idle": {"builder": "@devkit/builders:noop"},
        "bad": {"builder": "@devkit/builders:command", "options": {"args": []}}
    })
}

async fn setup() -> (TempDir, Arc<devkit_architect::Architect>) {
    let dir = tempfile::tempdir().unwrap();
    workspace(dir.path(), server_targets());
    std::fs::write(dir.path().join("server.sh"), SERVER_SCRIPT).unwrap();

    let architect =
        devkit_builders::architect(dir.path(), Arc::new(LocalHost::new()), BuilderRegistry::new());
    architect
        .load_workspace_from_host(Path::new("angular.json"))
        .await
        .unwrap();
    (dir, architect)
}

async fn wait_for_file(path: &Path) -> bool {
    for _ in 0..100 {
        if path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

fn target(name: &str) -> TargetSpecifier {
    TargetSpecifier::new().with_target(name)
}

#[tokio::test]
async fn test_noop_succeeds() {
    let (_dir, architect) = setup().await;
    let success = architect
        .run_specifier(&target("idle"), PartialBuilderContext::new())
        .await
        .unwrap()
        .last_success()
        .await
        .unwrap();
    assert!(success);
}

#[tokio::test]
async fn test_command_builds_output() {
    let (dir, architect) = setup().await;
    let mut stream = architect
        .run_specifier(&target("build"), PartialBuilderContext::new())
        .await
        .unwrap();

    let event = stream.next().await.unwrap().unwrap();
    assert!(event.success);
    assert_eq!(
        event.extra["outputPath"],
        json!(dir.path().join("dist/server").display().to_string())
    );
    assert!(dir.path().join("dist/server").exists());
}

#[tokio::test]
async fn test_command_options_are_validated() {
    let (_dir, architect) = setup().await;
    let err = architect
        .run_specifier(&target("bad"), PartialBuilderContext::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SchemaValidation { .. }));
}

#[tokio::test]
async fn test_binary_runs_and_tears_down() {
    let (dir, architect) = setup().await;
    let mut stream = architect
        .run_specifier(&target("serve"), PartialBuilderContext::new())
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(10), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(event.success);
    assert!(event.extra["pid"].is_u64());

    let app = dir.path().join("app");
    assert!(wait_for_file(&app.join("started")).await);

    drop(stream);
    assert!(wait_for_file(&app.join("stopped")).await);
}

#[tokio::test]
async fn test_binary_with_unknown_build_target() {
    let (_dir, architect) = setup().await;
    let mut stream = architect
        .run_specifier(&target("broken"), PartialBuilderContext::new())
        .await
        .unwrap();

    let err = stream.next().await.unwrap().unwrap_err();
    assert!(matches!(err, Error::TargetNotFound { name: Some(ref n) } if n == "missing"));
}
