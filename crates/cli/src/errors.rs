use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("No workspace file found in {}", root.display())]
    #[diagnostic(
        code(devkit::cli::workspace_not_found),
        help("Create angular.json or .angular.json in the root, or pass --workspace")
    )]
    WorkspaceNotFound { root: PathBuf },

    #[error("{message}")]
    #[diagnostic(
        code(devkit::cli::invalid_target),
        help("Targets are written project:target[:configuration]")
    )]
    InvalidTarget { message: String },

    #[error("Target '{spec}' did not complete successfully")]
    #[diagnostic(code(devkit::cli::build_failed))]
    BuildFailed { spec: String },

    #[error("Failed to resolve workspace root {}: {source}", root.display())]
    #[diagnostic(code(devkit::cli::root))]
    Root {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output: {source}")]
    #[diagnostic(code(devkit::cli::output))]
    Output {
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize output: {source}")]
    #[diagnostic(code(devkit::cli::serialize))]
    Serialize {
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Architect(#[from] devkit_architect::Error),
}

impl From<serde_json::Error> for CliError {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize { source }
    }
}

impl From<std::io::Error> for CliError {
    fn from(source: std::io::Error) -> Self {
        Self::Output { source }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
