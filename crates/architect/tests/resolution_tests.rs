//! Target resolution scenarios against a loaded workspace.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use devkit_architect::{
    Architect, BuilderRegistry, Error, JsonObject, LocalHost, MemoryHost, ProjectType,
    TargetSpecifier, shallow_merge,
};
use proptest::prelude::*;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn workspace_document() -> Value {
    json!({
        "version": 1,
        "defaultProject": "app",
        "projects": {
            "app": {
                "root": "projects/app",
                "projectType": "application",
                "defaultTarget": "build",
                "targets": {
                    "build": {
                        "builder": "pkg:browser",
                        "options": {"outputPath": "dist"},
                        "configurations": {"production": {"optimize": true}}
                    }
                }
            }
        }
    })
}

fn loaded_architect() -> Arc<Architect> {
    let architect = Architect::new("/ws", Arc::new(MemoryHost::new()), BuilderRegistry::new());
    architect.load_workspace_from_json(&workspace_document()).unwrap();
    architect
}

fn object(value: Value) -> JsonObject {
    value.as_object().cloned().unwrap()
}

#[test]
fn test_configuration_and_overrides_layer_over_options() {
    let architect = loaded_architect();
    let spec = TargetSpecifier::new()
        .with_configuration("production")
        .with_overrides(object(json!({"optimize": false})));

    let target = architect.get_target(&spec).unwrap();

    assert_eq!(
        Value::Object(target.options),
        json!({"outputPath": "dist", "optimize": false})
    );
    assert_eq!(target.builder, "pkg:browser");
    assert_eq!(target.project_type, ProjectType::Application);
    assert_eq!(target.root, PathBuf::from("/ws/projects/app"));
}

#[test]
fn test_missing_project_is_named() {
    let architect = loaded_architect();
    let err = architect
        .get_target(&TargetSpecifier::new().with_project("missing"))
        .unwrap_err();
    assert!(matches!(err, Error::ProjectNotFound { name: Some(ref n) } if n == "missing"));
    assert_eq!(err.to_string(), "Project 'missing' could not be found in workspace.");
}

#[test]
fn test_get_target_before_load() {
    let architect = Architect::new("/ws", Arc::new(MemoryHost::new()), BuilderRegistry::new());
    let err = architect.get_target(&TargetSpecifier::new()).unwrap_err();
    assert!(matches!(err, Error::WorkspaceNotYetLoaded));
}

#[test]
fn test_missing_configuration_is_named() {
    let architect = loaded_architect();
    let err = architect
        .get_target(&TargetSpecifier::new().with_configuration("staging"))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Configuration 'staging' could not be found in project."
    );
}

#[test]
fn test_resolution_never_mutates_workspace() {
    let architect = loaded_architect();
    let before = serde_json::to_string(&*architect.workspace().unwrap()).unwrap();

    for _ in 0..3 {
        let mut target = architect
            .get_target(
                &TargetSpecifier::new()
                    .with_configuration("production")
                    .with_overrides(object(json!({"outputPath": "out"}))),
            )
            .unwrap();
        target.options.insert("mutated".to_string(), json!(true));
    }

    let after = serde_json::to_string(&*architect.workspace().unwrap()).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_invalid_workspace_lists_every_error() {
    let architect = Architect::new("/ws", Arc::new(MemoryHost::new()), BuilderRegistry::new());
    let err = architect
        .load_workspace_from_json(&json!({
            "version": "one",
            "projects": {"app": {"root": 5}}
        }))
        .unwrap_err();

    let Error::SchemaValidation { errors } = &err else {
        panic!("expected schema validation error, got {err}");
    };
    assert!(errors.len() >= 2, "{errors:?}");
    let message = err.to_string();
    for error in errors {
        assert!(message.contains(error.as_str()));
    }
}

#[test]
fn test_schema_defaults_fill_empty_targets() {
    let architect = Architect::new("/ws", Arc::new(MemoryHost::new()), BuilderRegistry::new());
    let workspace = architect
        .load_workspace_from_json(&json!({
            "version": 1,
            "projects": {"lib": {"root": "lib", "projectType": "library"}}
        }))
        .unwrap();
    assert!(workspace.project("lib").unwrap().targets.is_empty());
}

#[tokio::test]
async fn test_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("angular.json"),
        serde_json::to_vec_pretty(&workspace_document()).unwrap(),
    )
    .unwrap();

    let architect = Architect::new(dir.path(), Arc::new(LocalHost::new()), BuilderRegistry::new());
    architect
        .load_workspace_from_host(Path::new("angular.json"))
        .await
        .unwrap();

    let target = architect.get_target(&TargetSpecifier::new()).unwrap();
    assert_eq!(target.root, dir.path().join("projects/app"));
}

#[tokio::test]
async fn test_load_reports_malformed_json() {
    let host = MemoryHost::new();
    host.insert("/ws/angular.json", "{\"version\": 1,");
    let architect = Architect::new("/ws", Arc::new(host), BuilderRegistry::new());

    let err = architect
        .load_workspace_from_host(Path::new("angular.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Json { ref path, .. } if path == Path::new("/ws/angular.json")));

    let err = architect
        .load_workspace_from_host(Path::new("missing.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
}

fn layer() -> impl Strategy<Value = JsonObject> {
    prop::collection::btree_map("[a-e]", any::<i32>(), 0..5).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(key, value)| (key, Value::from(value)))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_later_layers_win_and_earlier_keys_survive(
        options in layer(),
        configuration in layer(),
        overrides in layer(),
    ) {
        let merged = shallow_merge([&options, &configuration, &overrides]);

        for (key, value) in &merged {
            let expected = overrides
                .get(key)
                .or_else(|| configuration.get(key))
                .or_else(|| options.get(key));
            prop_assert_eq!(Some(value), expected);
        }
        for key in options.keys().chain(configuration.keys()).chain(overrides.keys()) {
            prop_assert!(merged.contains_key(key));
        }
    }
}
