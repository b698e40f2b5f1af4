//! Workspace document model.
//!
//! A workspace is the root configuration document describing every project
//! and its targets. It is validated against the built-in workspace schema
//! before it is deserialized into these types.

use crate::json::JsonObject;
use crate::{Error, Host, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// File names tried, in order, when looking for a workspace document.
pub const WORKSPACE_FILE_NAMES: &[&str] = &["angular.json", ".angular.json", "workspace.json"];

const WORKSPACE_SCHEMA_SOURCE: &str = include_str!("../schemas/workspace-schema.json");
const BUILDERS_SCHEMA_SOURCE: &str = include_str!("../schemas/builders-schema.json");

/// A validated workspace document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    /// Workspace name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Document format version.
    pub version: u32,
    /// Directory where new projects are created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_project_root: Option<String>,
    /// Project used when a specifier names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_project: Option<String>,
    /// Projects keyed by name.
    #[serde(default)]
    pub projects: BTreeMap<String, Project>,
    /// Top-level keys the engine does not interpret, kept as loaded.
    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Kind of project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    /// A deployable application.
    Application,
    /// A reusable library.
    Library,
}

impl ProjectType {
    /// The name used in workspace documents.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Library => "library",
        }
    }
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A project within the workspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Project root, relative to the workspace root.
    pub root: String,
    /// Source directory, relative to the workspace root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    /// Selector prefix used by code generators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Kind of project.
    pub project_type: ProjectType,
    /// Target used when a specifier names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_target: Option<String>,
    /// Targets keyed by name.
    #[serde(default)]
    pub targets: BTreeMap<String, TargetDefinition>,
}

/// A target bound to a builder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetDefinition {
    /// Builder id, `package:builderName`.
    pub builder: String,
    /// Base option layer.
    #[serde(default)]
    pub options: JsonObject,
    /// Named partial-option layers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configurations: Option<BTreeMap<String, JsonObject>>,
}

impl Workspace {
    /// Deserialize an already validated document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaValidation`] when the document does not fit the model.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|err| Error::SchemaValidation {
            errors: vec![err.to_string()],
        })
    }

    /// Look up a project by name.
    #[must_use]
    pub fn project(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    /// Names of all projects, sorted.
    pub fn project_names(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }
}

impl Project {
    /// Look up a target by name.
    #[must_use]
    pub fn target(&self, name: &str) -> Option<&TargetDefinition> {
        self.targets.get(name)
    }

    /// Names of all targets, sorted.
    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }
}

impl TargetDefinition {
    /// Look up a named configuration layer.
    #[must_use]
    pub fn configuration(&self, name: &str) -> Option<&JsonObject> {
        self.configurations.as_ref()?.get(name)
    }
}

/// The built-in workspace schema.
///
/// # Errors
///
/// Returns [`Error::SchemaCompile`] if the embedded document is malformed.
pub fn workspace_schema() -> Result<&'static Value> {
    embedded_schema(&WORKSPACE_SCHEMA, "workspace-schema.json", WORKSPACE_SCHEMA_SOURCE)
}

/// The built-in builder-map schema.
///
/// # Errors
///
/// Returns [`Error::SchemaCompile`] if the embedded document is malformed.
pub fn builders_schema() -> Result<&'static Value> {
    embedded_schema(&BUILDERS_SCHEMA, "builders-schema.json", BUILDERS_SCHEMA_SOURCE)
}

static WORKSPACE_SCHEMA: OnceLock<Option<Value>> = OnceLock::new();
static BUILDERS_SCHEMA: OnceLock<Option<Value>> = OnceLock::new();

fn embedded_schema(
    cell: &'static OnceLock<Option<Value>>,
    name: &str,
    source: &str,
) -> Result<&'static Value> {
    cell.get_or_init(|| serde_json::from_str(source).ok())
        .as_ref()
        .ok_or_else(|| Error::SchemaCompile {
            path: PathBuf::from(name),
            message: "embedded schema is not valid JSON".to_string(),
        })
}

/// Find the workspace document in `root`, probing [`WORKSPACE_FILE_NAMES`] in order.
pub async fn find_workspace_file(host: &dyn Host, root: &Path) -> Option<PathBuf> {
    for name in WORKSPACE_FILE_NAMES {
        let candidate = root.join(name);
        if host.is_file(&candidate).await {
            return Some(PathBuf::from(name));
        }
    }
    None
}
