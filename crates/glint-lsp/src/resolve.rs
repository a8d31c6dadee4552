//! Include resolution for build cycles.
//!
//! An include is resolved relative to the directory of the document that
//! contains it. Open documents take precedence over files on disk, so an
//! unsaved edit to an included file is seen by every document including it.

use crate::vfs::DocumentSet;
use glint_core::{IncludeResolver, Source};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Read access to persistent storage.
pub trait FileSystem: Send + Sync {
    /// Read a whole file as UTF-8, or `None` if it cannot be read.
    fn read_to_string(&self, path: &Path) -> Option<String>;
}

/// The real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileSystem;

impl FileSystem for DiskFileSystem {
    fn read_to_string(&self, path: &Path) -> Option<String> {
        match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!("Cannot read {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// An in-memory file system.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<HashMap<PathBuf, String>>,
}

impl MemoryFileSystem {
    /// Create an empty file system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a file.
    pub fn insert(&self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.write().insert(path.into(), text.into());
    }

    /// Delete a file.
    pub fn remove(&self, path: &Path) {
        self.files.write().remove(path);
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> Option<String> {
        self.files.read().get(path).cloned()
    }
}

/// Convert a `file://` URI to a file path.
#[cfg(not(windows))]
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    let path = uri.strip_prefix("file://")?;
    let decoded = urlencoding::decode(path).ok()?;
    Some(PathBuf::from(decoded.into_owned()))
}

/// Convert a `file://` URI to a file path (Windows version).
#[cfg(windows)]
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    let path = uri.strip_prefix("file://")?;
    let decoded = urlencoding::decode(path).ok()?;
    // Handle Windows paths like file:///C:/...
    let decoded = decoded.strip_prefix('/').unwrap_or(&decoded);
    Some(PathBuf::from(decoded))
}

/// Convert an absolute path to a `file://` URI, percent-encoding each segment.
pub fn path_to_uri(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    let encoded: Vec<String> = text
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    let joined = encoded.join("/");
    if joined.starts_with('/') {
        format!("file://{joined}")
    } else {
        format!("file:///{joined}")
    }
}

/// Lexically normalise a path, resolving `.` and `..` without touching disk.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}

/// Resolves includes against the open documents of one build cycle, then
/// against the file system.
pub struct WorkspaceResolver<'a> {
    documents: &'a DocumentSet,
    fs: &'a dyn FileSystem,
    base_dir: PathBuf,
}

impl<'a> WorkspaceResolver<'a> {
    /// Create a resolver. Includes from documents without a file path are
    /// resolved against the working directory.
    pub fn new(documents: &'a DocumentSet, fs: &'a dyn FileSystem) -> Self {
        let base_dir = std::env::current_dir().unwrap_or_default();
        Self::with_base_dir(documents, fs, base_dir)
    }

    /// Create a resolver with an explicit fallback directory.
    pub fn with_base_dir(
        documents: &'a DocumentSet,
        fs: &'a dyn FileSystem,
        base_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            documents,
            fs,
            base_dir: base_dir.into(),
        }
    }

    /// The absolute path an include refers to.
    pub fn include_path(&self, include: &str, requester: &str) -> PathBuf {
        let dir = uri_to_path(requester)
            .and_then(|path| path.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| self.base_dir.clone());
        normalize(&dir.join(include))
    }
}

impl IncludeResolver for WorkspaceResolver<'_> {
    fn resolve(&self, include: &str, requester: &str) -> Option<Source> {
        let path = self.include_path(include, requester);
        let uri = path_to_uri(&path);

        // Open documents take precedence
        if let Some(entry) = self.documents.get(&uri) {
            tracing::debug!("Include {} resolved from open document {}", include, uri);
            return Some(Source::new(uri, entry.text.clone()));
        }

        let text = self.fs.read_to_string(&path)?;
        tracing::debug!("Include {} resolved from disk {}", include, path.display());
        Some(Source::new(uri, text))
    }
}
