pub mod describe;
pub mod run;
pub mod target;
pub mod validate;

use crate::errors::{CliError, Result};
use devkit_architect::{
    Architect, BuilderRegistry, Host, JsonObject, TargetSpecifier, find_workspace_file,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Build an architect for `root` with the built-in builders and load its workspace.
///
/// `workspace` is relative to `root`; when absent the root is searched for one
/// of the well-known file names.
pub async fn open_workspace(
    root: &Path,
    workspace: Option<&Path>,
    host: Arc<dyn Host>,
) -> Result<Arc<Architect>> {
    let file = match workspace {
        Some(file) => file.to_path_buf(),
        None => find_workspace_file(host.as_ref(), root)
            .await
            .ok_or_else(|| CliError::WorkspaceNotFound {
                root: root.to_path_buf(),
            })?,
    };
    debug!(root = %root.display(), file = %file.display(), "Opening workspace");

    let architect = devkit_builders::architect(root, host, BuilderRegistry::new());
    architect.load_workspace_from_host(&file).await?;
    Ok(architect)
}

/// Absolute form of the `--root` argument.
pub fn absolute_root(root: &Path) -> Result<PathBuf> {
    if root.is_absolute() {
        return Ok(devkit_architect::host::normalize(root));
    }
    let cwd = std::env::current_dir().map_err(|source| CliError::Root {
        root: root.to_path_buf(),
        source,
    })?;
    Ok(devkit_architect::host::resolve(&cwd, root))
}

/// Parse `spec` and attach the `--option` overrides.
pub fn specifier(spec: &str, options: Vec<(String, Value)>) -> Result<TargetSpecifier> {
    let specifier =
        TargetSpecifier::parse(spec).map_err(|message| CliError::InvalidTarget { message })?;
    if options.is_empty() {
        return Ok(specifier);
    }
    let overrides: JsonObject = options.into_iter().collect();
    Ok(specifier.with_overrides(overrides))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use devkit_architect::MemoryHost;
    use serde_json::json;
    use std::path::Path;
    use std::sync::Arc;

    pub const ROOT: &str = "/repo";

    pub fn host() -> Arc<MemoryHost> {
        let host = Arc::new(MemoryHost::new());
        host.insert_json(
            Path::new("/repo/angular.json"),
            &json!({
                "version": 1,
                "defaultProject": "app",
                "projects": {
                    "app": {
                        "root": "projects/app",
                        "projectType": "application",
                        "defaultTarget": "build",
                        "targets": {
                            "build": {
                                "builder": "@devkit/builders:noop",
                                "options": {"optimize": true, "outputPath": "dist/app"},
                                "configurations": {"dev": {"optimize": false}}
                            },
                            "lint": {"builder": "@devkit/builders:command", "options": {}}
                        }
                    },
                    "lib": {"root": "projects/lib", "projectType": "library"}
                }
            }),
        );
        host
    }
}
