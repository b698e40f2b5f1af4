//! The built-in builder package.
//!
//! The package manifest, builder map and option schemas are compiled into the
//! binary and served from a virtual directory by [`BuiltinHost`], so the
//! built-in builders resolve without anything installed in the workspace.

use async_trait::async_trait;
use devkit_architect::host;
use devkit_architect::{Host, NodeModulesResolver, PackageResolver};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Package name of the built-in builders.
pub const PACKAGE: &str = "@devkit/builders";

/// Virtual directory holding the built-in package.
pub const PACKAGE_ROOT: &str = "/__devkit__/node_modules/@devkit/builders";

const FILES: &[(&str, &str)] = &[
    ("package.json", include_str!("../package.json")),
    ("builders.json", include_str!("../builders.json")),
    ("schemas/command.json", include_str!("../schemas/command.json")),
    ("schemas/binary.json", include_str!("../schemas/binary.json")),
    ("schemas/noop.json", include_str!("../schemas/noop.json")),
];

/// Path of the built-in package manifest.
#[must_use]
pub fn manifest_path() -> PathBuf {
    Path::new(PACKAGE_ROOT).join("package.json")
}

fn embedded(path: &Path) -> Option<&'static str> {
    let path = host::normalize(path);
    let relative = path.strip_prefix(PACKAGE_ROOT).ok()?;
    FILES
        .iter()
        .find(|(name, _)| relative == Path::new(name))
        .map(|(_, content)| *content)
}

/// Host overlay serving the built-in package, delegating everything else.
pub struct BuiltinHost {
    inner: Arc<dyn Host>,
}

impl BuiltinHost {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn Host>) -> Self {
        Self { inner }
    }
}

impl std::fmt::Debug for BuiltinHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinHost")
            .field("root", &PACKAGE_ROOT)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Host for BuiltinHost {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        match embedded(path) {
            Some(content) => Ok(content.as_bytes().to_vec()),
            None => self.inner.read(path).await,
        }
    }

    async fn exists(&self, path: &Path) -> bool {
        let normalized = host::normalize(path);
        let builtin = FILES
            .iter()
            .any(|(name, _)| Path::new(PACKAGE_ROOT).join(name).starts_with(&normalized));
        builtin || self.inner.exists(path).await
    }

    async fn is_file(&self, path: &Path) -> bool {
        embedded(path).is_some() || self.inner.is_file(path).await
    }
}

/// Resolver that maps [`PACKAGE`] to the virtual package and everything
/// else to [`NodeModulesResolver`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinResolver {
    fallback: NodeModulesResolver,
}

impl BuiltinResolver {
    /// Create the resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PackageResolver for BuiltinResolver {
    async fn resolve_manifest(
        &self,
        host: &dyn Host,
        package: &str,
        base: &Path,
    ) -> std::result::Result<PathBuf, String> {
        match self.fallback.resolve_manifest(host, package, base).await {
            Ok(manifest) => Ok(manifest),
            Err(_) if package == PACKAGE => Ok(manifest_path()),
            Err(reason) => Err(reason),
        }
    }
}
