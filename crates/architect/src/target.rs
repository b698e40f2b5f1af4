//! Target specifiers and target resolution.

use crate::host;
use crate::json::{JsonObject, shallow_merge};
use crate::workspace::{ProjectType, Workspace};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// A request to resolve a target. Every field is optional; missing project
/// and target names fall back to the workspace and project defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSpecifier {
    /// Project name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Target name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Configuration name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
    /// Top-level option overrides, applied last.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<JsonObject>,
}

impl TargetSpecifier {
    /// Specifier selecting the default project and target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a project.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Select a target.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Select a configuration.
    #[must_use]
    pub fn with_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }

    /// Set option overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: JsonObject) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Parse the `project:target[:configuration]` form. Empty segments are
    /// treated as absent, so `:build` selects the default project.
    ///
    /// # Errors
    ///
    /// Returns an error message when more than three segments are given.
    pub fn parse(spec: &str) -> std::result::Result<Self, String> {
        let segments: Vec<&str> = spec.split(':').collect();
        if segments.len() > 3 {
            return Err(format!(
                "invalid target specifier '{spec}': expected project:target[:configuration]"
            ));
        }

        let segment = |index: usize| {
            segments
                .get(index)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            project: segment(0),
            target: segment(1),
            configuration: segment(2),
            overrides: None,
        })
    }
}

impl FromStr for TargetSpecifier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A fully resolved target. Owns its data; never aliases the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTarget {
    /// Absolute project root.
    pub root: PathBuf,
    /// Kind of project.
    pub project_type: ProjectType,
    /// Builder id, `package:builderName`.
    pub builder: String,
    /// Merged options.
    pub options: JsonObject,
}

impl ResolvedTarget {
    /// Replace the options, keeping everything else.
    #[must_use]
    pub fn with_options(mut self, options: JsonObject) -> Self {
        self.options = options;
        self
    }
}

/// Resolve `specifier` against `workspace`, anchoring the project root at
/// `workspace_root`.
///
/// # Errors
///
/// Returns [`Error::ProjectNotFound`], [`Error::TargetNotFound`] or
/// [`Error::ConfigurationNotFound`] when a named (or default) entry is missing.
pub fn resolve_target(
    workspace: &Workspace,
    workspace_root: &Path,
    specifier: &TargetSpecifier,
) -> Result<ResolvedTarget> {
    let project_name = specifier
        .project
        .as_deref()
        .or(workspace.default_project.as_deref());
    let project = project_name
        .and_then(|name| workspace.project(name))
        .ok_or_else(|| Error::project_not_found(project_name))?;

    let target_name = specifier
        .target
        .as_deref()
        .or(project.default_target.as_deref());
    let definition = target_name
        .and_then(|name| project.target(name))
        .ok_or_else(|| Error::target_not_found(target_name))?;

    let configuration = match specifier.configuration.as_deref() {
        Some(name) => Some(definition.configuration(name).ok_or_else(|| {
            Error::ConfigurationNotFound {
                name: name.to_string(),
            }
        })?),
        None => None,
    };

    debug!(
        project = project_name.unwrap_or_default(),
        target = target_name.unwrap_or_default(),
        configuration = specifier.configuration.as_deref().unwrap_or_default(),
        "Resolving target"
    );

    let layers = std::iter::once(&definition.options)
        .chain(configuration)
        .chain(specifier.overrides.as_ref());

    Ok(ResolvedTarget {
        root: host::resolve(workspace_root, Path::new(&project.root)),
        project_type: project.project_type,
        builder: definition.builder.clone(),
        options: shallow_merge(layers),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn workspace() -> Workspace {
        Workspace::from_value(json!({
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
                            "options": {"outputPath": "dist", "styles": ["a.css", "b.css"]},
                            "configurations": {"production": {"optimize": true}}
                        },
                        "lint": {"builder": "pkg:lint", "options": {}}
                    }
                },
                "lib": {
                    "root": "projects/lib",
                    "projectType": "library",
                    "targets": {}
                }
            }
        }))
        .unwrap()
    }

    fn overrides(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_parse_specifier() {
        let spec = TargetSpecifier::parse("app:build:production").unwrap();
        assert_eq!(spec.project.as_deref(), Some("app"));
        assert_eq!(spec.target.as_deref(), Some("build"));
        assert_eq!(spec.configuration.as_deref(), Some("production"));

        let spec: TargetSpecifier = ":serve".parse().unwrap();
        assert_eq!(spec.project, None);
        assert_eq!(spec.target.as_deref(), Some("serve"));
        assert_eq!(spec.configuration, None);

        assert_eq!(TargetSpecifier::parse("").unwrap(), TargetSpecifier::new());
        assert!(TargetSpecifier::parse("a:b:c:d").is_err());
    }

    #[test]
    fn test_defaults_and_layering() {
        let spec = TargetSpecifier::new()
            .with_configuration("production")
            .with_overrides(overrides(json!({"optimize": false})));

        let target = resolve_target(&workspace(), Path::new("/ws"), &spec).unwrap();

        assert_eq!(target.root, PathBuf::from("/ws/projects/app"));
        assert_eq!(target.project_type, ProjectType::Application);
        assert_eq!(target.builder, "pkg:browser");
        assert_eq!(
            Value::Object(target.options),
            json!({"outputPath": "dist", "styles": ["a.css", "b.css"], "optimize": false})
        );
    }

    #[test]
    fn test_overrides_replace_arrays() {
        let spec = TargetSpecifier::new().with_overrides(overrides(json!({"styles": ["c.css"]})));
        let target = resolve_target(&workspace(), Path::new("/ws"), &spec).unwrap();
        assert_eq!(target.options["styles"], json!(["c.css"]));
    }

    #[test]
    fn test_missing_entries() {
        let ws = workspace();
        let root = Path::new("/ws");

        let err = resolve_target(&ws, root, &TargetSpecifier::new().with_project("missing"))
            .unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound { name: Some(ref n) } if n == "missing"));

        let err = resolve_target(&ws, root, &TargetSpecifier::new().with_project("lib"))
            .unwrap_err();
        assert!(matches!(err, Error::TargetNotFound { name: None }));

        let err = resolve_target(&ws, root, &TargetSpecifier::new().with_target("serve"))
            .unwrap_err();
        assert!(matches!(err, Error::TargetNotFound { name: Some(ref n) } if n == "serve"));

        let err = resolve_target(
            &ws,
            root,
            &TargetSpecifier::new().with_target("lint").with_configuration("production"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConfigurationNotFound { ref name } if name == "production"));

        let err = resolve_target(
            &ws,
            root,
            &TargetSpecifier::new().with_configuration("staging"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConfigurationNotFound { ref name } if name == "staging"));
    }

    #[test]
    fn test_no_default_project() {
        let mut ws = workspace();
        ws.default_project = None;
        let err = resolve_target(&ws, Path::new("/ws"), &TargetSpecifier::new()).unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound { name: None }));
        assert_eq!(err.to_string(), "Default project could not be found in workspace.");
    }
}
