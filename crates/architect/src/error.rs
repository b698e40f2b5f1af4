//! Error types for target resolution and builder execution.

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for architect operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or running a target.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The requested project (or the default project) is not in the workspace.
    #[error("{} could not be found in workspace.", describe("Project", name.as_deref()))]
    #[diagnostic(
        code(devkit::architect::project_not_found),
        help("Check the `projects` map of the workspace file, or set `defaultProject`")
    )]
    ProjectNotFound {
        /// Requested project name, `None` when the default was requested.
        name: Option<String>,
    },

    /// The requested target (or the project's default target) does not exist.
    #[error("{} could not be found in workspace.", describe("Target", name.as_deref()))]
    #[diagnostic(
        code(devkit::architect::target_not_found),
        help("Check the `targets` map of the project, or set `defaultTarget`")
    )]
    TargetNotFound {
        /// Requested target name, `None` when the default was requested.
        name: Option<String>,
    },

    /// The requested configuration is not defined for the target.
    #[error("Configuration '{name}' could not be found in project.")]
    #[diagnostic(code(devkit::architect::configuration_not_found))]
    ConfigurationNotFound {
        /// Requested configuration name.
        name: String,
    },

    /// A document failed JSON schema validation.
    #[error(
        "Schema validation failed with the following errors:\n  {}",
        errors.join("\n  ")
    )]
    #[diagnostic(code(devkit::architect::schema_validation))]
    SchemaValidation {
        /// Every error reported by the validator.
        errors: Vec<String>,
    },

    /// A builder id could not be mapped to a builder description.
    #[error("Builder '{builder}' cannot be resolved.")]
    #[diagnostic(code(devkit::architect::builder_cannot_be_resolved))]
    BuilderCannotBeResolved {
        /// The builder id, `package:name`.
        builder: String,
        /// Why resolution stopped.
        #[help]
        reason: Option<String>,
    },

    /// The builder was described on disk but no factory is registered for it.
    #[error("Builder '{builder}' is not registered with this architect.")]
    #[diagnostic(
        code(devkit::architect::builder_not_registered),
        help("Register a factory for the builder id with `BuilderRegistry::register`")
    )]
    BuilderNotRegistered {
        /// The builder id, `package:name`.
        builder: String,
    },

    /// An operation needed the workspace before one was loaded.
    #[error("Workspace needs to be loaded before Architect is used.")]
    #[diagnostic(code(devkit::architect::workspace_not_loaded))]
    WorkspaceNotYetLoaded,

    /// A host read failed.
    #[error("I/O error at {}: {source}", path.display())]
    #[diagnostic(code(devkit::architect::io_error))]
    Io {
        /// Path that was being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A document could not be parsed as JSON.
    #[error("Failed to parse JSON in {}: {message}", path.display())]
    #[diagnostic(code(devkit::architect::json_error))]
    Json {
        /// Document path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A schema document could not be compiled into a validator.
    #[error("Invalid JSON schema {}: {message}", path.display())]
    #[diagnostic(code(devkit::architect::schema_compile))]
    SchemaCompile {
        /// Schema path, or a symbolic name for built-in schemas.
        path: PathBuf,
        /// Compiler message.
        message: String,
    },

    /// A builder failed while running.
    #[error("Builder '{builder}' failed: {message}")]
    #[diagnostic(code(devkit::architect::builder_failed))]
    Builder {
        /// The builder id.
        builder: String,
        /// Failure description.
        message: String,
    },

    /// The run was cancelled before it completed.
    #[error("Build was cancelled")]
    #[diagnostic(code(devkit::architect::cancelled))]
    Cancelled,
}

fn describe(kind: &str, name: Option<&str>) -> String {
    match name {
        Some(name) if !name.is_empty() => format!("{kind} '{name}'"),
        _ => format!("Default {}", kind.to_lowercase()),
    }
}

impl Error {
    /// Create a [`Error::ProjectNotFound`] error.
    pub fn project_not_found(name: Option<&str>) -> Self {
        Self::ProjectNotFound {
            name: name.map(str::to_string),
        }
    }

    /// Create a [`Error::TargetNotFound`] error.
    pub fn target_not_found(name: Option<&str>) -> Self {
        Self::TargetNotFound {
            name: name.map(str::to_string),
        }
    }

    /// Create a [`Error::BuilderCannotBeResolved`] error with a reason.
    pub fn builder_cannot_be_resolved(builder: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BuilderCannotBeResolved {
            builder: builder.into(),
            reason: Some(reason.into()),
        }
    }

    /// Create an [`Error::Io`] error for `path`.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create an [`Error::Json`] error for `path`.
    pub fn json(path: &Path, message: impl Into<String>) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Create an [`Error::Builder`] error.
    pub fn builder(builder: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Builder {
            builder: builder.into(),
            message: message.into(),
        }
    }
}
