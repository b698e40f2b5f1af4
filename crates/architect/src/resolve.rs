//! Package manifest resolution.
//!
//! A builder id names a package. Before its builders can be described the
//! package's `package.json` has to be found, which is what a
//! [`PackageResolver`] does.

use crate::host::{self, Host};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::trace;

const MANIFEST: &str = "package.json";

/// Locates the manifest of a package.
#[async_trait]
pub trait PackageResolver: Send + Sync {
    /// Resolve the absolute path of `package`'s manifest, searching from `base`.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the package cannot be found.
    async fn resolve_manifest(
        &self,
        host: &dyn Host,
        package: &str,
        base: &Path,
    ) -> std::result::Result<PathBuf, String>;
}

/// Default resolver.
///
/// - `./pkg`, `../pkg` and absolute paths name a package directory (or a
///   manifest file directly).
/// - Anything else is looked up as `node_modules/<package>/package.json` in
///   `base` and each of its ancestors, nearest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeModulesResolver;

impl NodeModulesResolver {
    /// Create the default resolver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn is_path_like(package: &str) -> bool {
    package.starts_with("./")
        || package.starts_with("../")
        || package == "."
        || package == ".."
        || Path::new(package).is_absolute()
}

#[async_trait]
impl PackageResolver for NodeModulesResolver {
    async fn resolve_manifest(
        &self,
        host: &dyn Host,
        package: &str,
        base: &Path,
    ) -> std::result::Result<PathBuf, String> {
        if package.is_empty() {
            return Err("empty package name".to_string());
        }

        if is_path_like(package) {
            let target = host::resolve(base, Path::new(package));
            if host.is_file(&target).await {
                return Ok(target);
            }
            let manifest = target.join(MANIFEST);
            if host.is_file(&manifest).await {
                return Ok(manifest);
            }
            return Err(format!(
                "no {MANIFEST} found for package '{package}' at {}",
                target.display()
            ));
        }

        let base = host::normalize(base);
        for dir in base.ancestors() {
            let manifest = dir.join("node_modules").join(package).join(MANIFEST);
            trace!(candidate = %manifest.display(), "Probing package manifest");
            if host.is_file(&manifest).await {
                return Ok(manifest);
            }
        }

        Err(format!(
            "package '{package}' was not found in any node_modules directory above {}",
            base.display()
        ))
    }
}
