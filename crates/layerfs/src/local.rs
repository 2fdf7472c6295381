//! Local filesystem backend.
//!
//! Read-only access to a directory on the host, for development override
//! layers and on-disk asset trees.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::fs;
use tokio::io::{AsyncRead, ReadBuf};

use crate::handle::{EntryCursor, is_a_directory};
use crate::path;
use crate::traits::{
    DirEntry, DirEntryKind, DirHandle, EntryBatch, File, Filesystem, ReadDirFs, ReadFileFs,
    ReadLimit, StatFs, SubFs,
};

/// Local filesystem backend.
///
/// All operations are relative to `root`. For example, if `root` is
/// `/srv/app/templates`, then `open("views/home.html")` opens
/// `/srv/app/templates/views/home.html`. Symlinks are followed, but a path
/// that resolves outside the root is refused.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    /// Create a local filesystem rooted at the given path.
    ///
    /// The root is not checked here; operations fail if it is missing.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path to an absolute path within the root.
    ///
    /// Returns an error if the resolved path escapes the root (via symlinks;
    /// `..` is already clamped lexically).
    async fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let full = self.root.join(path::clean(path));

        // Canonicalize to resolve symlinks; a missing path fails NotFound here
        let canonical = fs::canonicalize(&full).await?;

        // Verify we haven't escaped the root
        let canonical_root = fs::canonicalize(&self.root)
            .await
            .unwrap_or_else(|_| self.root.clone());
        if !canonical.starts_with(&canonical_root) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!(
                    "path escapes root: {} is not under {}",
                    canonical.display(),
                    canonical_root.display()
                ),
            ));
        }

        Ok(canonical)
    }

    /// Extract permissions from std::fs::Metadata (unix only).
    #[cfg(unix)]
    fn extract_permissions(meta: &std::fs::Metadata) -> Option<u32> {
        use std::os::unix::fs::PermissionsExt;
        Some(meta.permissions().mode())
    }

    #[cfg(not(unix))]
    fn extract_permissions(_meta: &std::fs::Metadata) -> Option<u32> {
        None
    }

    fn entry(name: String, meta: &std::fs::Metadata) -> DirEntry {
        // Special files (sockets, pipes, devices) are reported as files.
        let kind = if meta.is_dir() {
            DirEntryKind::Directory
        } else {
            DirEntryKind::File
        };

        DirEntry {
            name,
            kind,
            size: if meta.is_dir() { 0 } else { meta.len() },
            modified: meta.modified().ok(),
            permissions: Self::extract_permissions(meta),
        }
    }

    async fn list(full_path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(full_path).await?;

        while let Some(entry) = dir.next_entry().await? {
            // Follow symlinks so links to directories list as directories
            let metadata = match fs::metadata(entry.path()).await {
                Ok(meta) => meta,
                // Dangling symlink: fall back to the link itself
                Err(e) if e.kind() == io::ErrorKind::NotFound => entry.metadata().await?,
                Err(e) => return Err(e),
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push(Self::entry(name, &metadata));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[async_trait]
impl Filesystem for LocalFs {
    async fn open(&self, path: &Path) -> io::Result<Box<dyn File>> {
        let full_path = self.resolve(path).await?;
        let meta = fs::metadata(&full_path).await?;
        let info = Self::entry(path::base_name(&path::clean(path)), &meta);

        if meta.is_dir() {
            return Ok(Box::new(LocalDir {
                path: full_path,
                info,
                cursor: None,
            }));
        }

        let file = fs::File::open(&full_path).await?;
        Ok(Box::new(LocalFile { file, info }))
    }

    fn as_stat(&self) -> Option<&dyn StatFs> {
        Some(self)
    }

    fn as_read_dir(&self) -> Option<&dyn ReadDirFs> {
        Some(self)
    }

    fn as_read_file(&self) -> Option<&dyn ReadFileFs> {
        Some(self)
    }

    fn as_sub(&self) -> Option<&dyn SubFs> {
        Some(self)
    }
}

#[async_trait]
impl StatFs for LocalFs {
    async fn stat(&self, path: &Path) -> io::Result<DirEntry> {
        let full_path = self.resolve(path).await?;
        // stat follows symlinks
        let meta = fs::metadata(&full_path).await?;
        Ok(Self::entry(path::base_name(&path::clean(path)), &meta))
    }
}

#[async_trait]
impl ReadDirFs for LocalFs {
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let full_path = self.resolve(path).await?;
        Self::list(&full_path).await
    }
}

#[async_trait]
impl ReadFileFs for LocalFs {
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        let full_path = self.resolve(path).await?;
        fs::read(&full_path).await
    }
}

#[async_trait]
impl SubFs for LocalFs {
    async fn sub(&self, dir: &Path) -> io::Result<Arc<dyn Filesystem>> {
        let full_path = self.resolve(dir).await?;
        let meta = fs::metadata(&full_path).await?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {}", dir.display()),
            ));
        }
        Ok(Arc::new(LocalFs::new(full_path)))
    }
}

/// Open regular file on the host.
#[derive(Debug)]
struct LocalFile {
    file: fs::File,
    info: DirEntry,
}

impl AsyncRead for LocalFile {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_read(cx, buf)
    }
}

#[async_trait]
impl File for LocalFile {
    async fn stat(&self) -> io::Result<DirEntry> {
        Ok(self.info.clone())
    }
}

/// Open directory on the host. Entries are listed on first read.
#[derive(Debug)]
struct LocalDir {
    path: PathBuf,
    info: DirEntry,
    cursor: Option<EntryCursor>,
}

impl AsyncRead for LocalDir {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(is_a_directory(&self.info.name)))
    }
}

#[async_trait]
impl File for LocalDir {
    async fn stat(&self) -> io::Result<DirEntry> {
        Ok(self.info.clone())
    }

    fn as_dir(&mut self) -> Option<&mut dyn DirHandle> {
        Some(self)
    }
}

#[async_trait]
impl DirHandle for LocalDir {
    async fn read_entries(&mut self, limit: ReadLimit) -> io::Result<EntryBatch> {
        if self.cursor.is_none() {
            self.cursor = Some(EntryCursor::new(LocalFs::list(&self.path).await?));
        }
        Ok(self
            .cursor
            .as_mut()
            .map(|cursor| cursor.take(limit))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn setup() -> (LocalFs, TempDir) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("file.txt"), b"content").unwrap();
        std::fs::create_dir_all(dir.path().join("sub/inner")).unwrap();
        std::fs::write(dir.path().join("sub/a.txt"), b"a").unwrap();
        (LocalFs::new(dir.path()), dir)
    }

    #[tokio::test]
    async fn test_read_file() {
        let (fs, _dir) = setup();
        let data = fs.read_file(Path::new("file.txt")).await.unwrap();
        assert_eq!(data, b"content");
    }

    #[tokio::test]
    async fn test_missing_is_not_found() {
        let (fs, _dir) = setup();
        let err = fs.read_file(Path::new("nope.txt")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        let err = fs.open(Path::new("nope.txt")).await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list() {
        let (fs, _dir) = setup();
        let entries = fs.read_dir(Path::new("")).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["file.txt", "sub"]);
        assert!(entries[1].is_dir());
    }

    #[tokio::test]
    async fn test_stat() {
        let (fs, _dir) = setup();

        let file_entry = fs.stat(Path::new("file.txt")).await.unwrap();
        assert!(file_entry.is_file());
        assert_eq!(file_entry.size, 7);

        let dir_entry = fs.stat(Path::new("sub")).await.unwrap();
        assert!(dir_entry.is_dir());
    }

    #[tokio::test]
    async fn test_open_file_and_directory() {
        let (fs, _dir) = setup();

        let mut file = fs.open(Path::new("file.txt")).await.unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "content");

        let mut dir = fs.open(Path::new("sub")).await.unwrap();
        assert!(dir.stat().await.unwrap().is_dir());
        let batch = dir
            .as_dir()
            .unwrap()
            .read_entries(ReadLimit::All)
            .await
            .unwrap();
        let names: Vec<_> = batch.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "inner"]);
    }

    #[tokio::test]
    async fn test_parent_components_stay_inside_root() {
        let (fs, _dir) = setup();
        // `..` is clamped at the root, so this looks for <root>/etc/passwd
        let err = fs.read_file(Path::new("../../../etc/passwd")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_blocked() {
        let (fs, dir) = setup();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.txt"), b"secret").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("escape")).unwrap();

        let err = fs.read_file(Path::new("escape/secret.txt")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_sub() {
        let (fs, _dir) = setup();
        let sub = fs.sub(Path::new("sub")).await.unwrap();
        assert_eq!(ops::read_file(&*sub, Path::new("a.txt")).await.unwrap(), b"a");

        let err = fs.sub(Path::new("file.txt")).await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotADirectory);
    }
}
