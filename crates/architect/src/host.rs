//! Virtual host abstraction for all workspace and builder I/O.
//!
//! The architect never touches the filesystem directly. Every workspace file,
//! package manifest, builder map and option schema is read through a [`Host`],
//! so embedders can serve documents from memory, an archive, or a remote store.
//!
//! - [`LocalHost`] reads the real filesystem with `tokio::fs`.
//! - [`MemoryHost`] keeps files in a map; it backs most tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Read capability consumed by the architect.
#[async_trait]
pub trait Host: Send + Sync {
    /// Read the full contents of the file at `path`.
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Whether anything (file or directory) exists at `path`.
    async fn exists(&self, path: &Path) -> bool;

    /// Whether `path` is a regular file.
    async fn is_file(&self, path: &Path) -> bool;
}

/// Host backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalHost;

impl LocalHost {
    /// Create a new local host.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Host for LocalHost {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn is_file(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }
}

/// Host that serves files from memory.
///
/// Paths are normalized on insert and lookup, so `/ws/./a/../b.json` and
/// `/ws/b.json` name the same file. Directories exist implicitly when any file
/// lives below them.
#[derive(Debug, Default)]
pub struct MemoryHost {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryHost {
    /// Create an empty in-memory host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        files.insert(normalize(path.as_ref()), content.into());
    }

    /// Add or replace a file with a pretty-printed JSON document.
    pub fn insert_json(&self, path: impl AsRef<Path>, value: &serde_json::Value) {
        let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        self.insert(path, text);
    }

    /// Remove a file, returning its previous contents.
    pub fn remove(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        files.remove(&normalize(path.as_ref()))
    }

    /// Number of files held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the host holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Host for MemoryHost {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }

    async fn exists(&self, path: &Path) -> bool {
        let path = normalize(path);
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        files.contains_key(&path) || files.keys().any(|file| file.starts_with(&path))
    }

    async fn is_file(&self, path: &Path) -> bool {
        let files = self.files.read().unwrap_or_else(PoisonError::into_inner);
        files.contains_key(&normalize(path))
    }
}

/// Lexically normalize a path, resolving `.` and `..` without touching the disk.
///
/// `..` at the root of an absolute path is dropped; leading `..` of a relative
/// path is kept.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Resolve `path` against `base`: absolute paths win, relative ones are joined.
/// The result is normalized.
#[must_use]
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Directory containing `path` (`.` for a bare file name).
#[must_use]
pub fn dirname(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
