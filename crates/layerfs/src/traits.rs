//! Core provider traits and types.
//!
//! A provider must be able to [`open`](Filesystem::open) a path. Everything
//! else is an optional capability, probed per call through the `as_*`
//! methods. Callers that want an operation regardless of capability go
//! through [`crate::ops`], which falls back to `open` when the native
//! capability is missing.

use async_trait::async_trait;
use serde::Serialize;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::io::AsyncRead;

/// Kind of directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirEntryKind {
    File,
    Directory,
}

/// A directory entry, also the result of `stat`.
///
/// Returned by directory listings and by `stat`. Within a listing the
/// `name` is a single path segment and is the identity used when merging
/// listings across layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntry {
    /// Name of the entry (not full path).
    pub name: String,
    /// Kind of entry.
    pub kind: DirEntryKind,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modification time, if available.
    pub modified: Option<SystemTime>,
    /// Unix permissions (e.g., 0o644), if available.
    pub permissions: Option<u32>,
}

impl DirEntry {
    /// Create a new directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DirEntryKind::Directory,
            size: 0,
            modified: None,
            permissions: None,
        }
    }

    /// Create a new file entry.
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: DirEntryKind::File,
            size,
            modified: None,
            permissions: None,
        }
    }

    pub fn with_modified(mut self, modified: SystemTime) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn is_dir(&self) -> bool {
        self.kind == DirEntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == DirEntryKind::File
    }
}

/// How many entries a [`DirHandle::read_entries`] call may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadLimit {
    /// Every remaining entry.
    All,
    /// At most this many entries. `Up(0)` behaves like `All`.
    Up(usize),
}

/// One batch of entries from a directory handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryBatch {
    pub entries: Vec<DirEntry>,
    /// True once the handle has nothing left to return.
    pub end: bool,
}

/// A handle that can enumerate directory entries.
///
/// Each handle owns its cursor; reading advances it and there is no rewind.
/// Open the path again to start over.
#[async_trait]
pub trait DirHandle: Send {
    /// Read the next batch of entries.
    ///
    /// With [`ReadLimit::All`] the remaining entries come back in one batch and
    /// `end` is only set on the following call, when nothing is left. With
    /// [`ReadLimit::Up`] `end` is set as soon as the cursor reaches the end.
    async fn read_entries(&mut self, limit: ReadLimit) -> io::Result<EntryBatch>;
}

/// An open file or directory.
///
/// Byte reads go through [`AsyncRead`]; reading a directory handle fails.
#[async_trait]
pub trait File: AsyncRead + Send + Sync + Unpin {
    /// Metadata for the opened path.
    async fn stat(&self) -> io::Result<DirEntry>;

    /// Directory enumeration, when this handle is a directory.
    fn as_dir(&mut self) -> Option<&mut dyn DirHandle> {
        None
    }
}

/// Native `stat` capability.
#[async_trait]
pub trait StatFs: Send + Sync {
    async fn stat(&self, path: &Path) -> io::Result<DirEntry>;
}

/// Native directory listing capability.
#[async_trait]
pub trait ReadDirFs: Send + Sync {
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;
}

/// Native whole-file read capability.
#[async_trait]
pub trait ReadFileFs: Send + Sync {
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Native re-rooting capability.
#[async_trait]
pub trait SubFs: Send + Sync {
    /// A filesystem whose root is `dir` within this one.
    async fn sub(&self, dir: &Path) -> io::Result<Arc<dyn Filesystem>>;
}

/// Abstract read-only filesystem interface.
///
/// All operations use paths relative to the filesystem root. A missing path
/// must be reported as [`io::ErrorKind::NotFound`]; every other error kind is
/// treated as a failure of the provider itself.
#[async_trait]
pub trait Filesystem: Send + Sync {
    /// Open a file or directory for reading.
    async fn open(&self, path: &Path) -> io::Result<Box<dyn File>>;

    fn as_stat(&self) -> Option<&dyn StatFs> {
        None
    }

    fn as_read_dir(&self) -> Option<&dyn ReadDirFs> {
        None
    }

    fn as_read_file(&self) -> Option<&dyn ReadFileFs> {
        None
    }

    fn as_sub(&self) -> Option<&dyn SubFs> {
        None
    }
}
