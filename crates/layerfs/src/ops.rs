//! Single-provider operations with capability fallback.
//!
//! Each helper uses the provider's native capability when it has one and
//! otherwise emulates the operation through [`Filesystem::open`].

use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

use crate::path;
use crate::scoped::ScopedFs;
use crate::traits::{DirEntry, Filesystem, ReadLimit};

/// Metadata for `path`: native `stat`, else `open` + [`crate::File::stat`].
pub async fn stat(fs: &dyn Filesystem, path: &Path) -> io::Result<DirEntry> {
    if let Some(native) = fs.as_stat() {
        return native.stat(path).await;
    }
    let file = fs.open(path).await?;
    file.stat().await
}

/// Whole contents of `path`: native `read_file`, else `open` + read to end.
pub async fn read_file(fs: &dyn Filesystem, path: &Path) -> io::Result<Vec<u8>> {
    if let Some(native) = fs.as_read_file() {
        return native.read_file(path).await;
    }
    let mut file = fs.open(path).await?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).await?;
    Ok(data)
}

/// Entries of the directory at `path`: native `read_dir`, else `open` and
/// drain the handle's directory capability.
///
/// A handle without directory capability fails with
/// [`io::ErrorKind::InvalidInput`].
pub async fn read_dir(fs: &dyn Filesystem, path: &Path) -> io::Result<Vec<DirEntry>> {
    if let Some(native) = fs.as_read_dir() {
        return native.read_dir(path).await;
    }
    let mut file = fs.open(path).await?;
    match file.as_dir() {
        Some(dir) => Ok(dir.read_entries(ReadLimit::All).await?.entries),
        None => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("readdir {}: handle is not a directory", path.display()),
        )),
    }
}

/// Re-root `fs` at `dir`: native `sub`, else a [`ScopedFs`] view.
///
/// The fallback checks that `dir` is a directory before scoping to it. The
/// root itself returns `fs` unchanged.
pub async fn sub(fs: Arc<dyn Filesystem>, dir: &Path) -> io::Result<Arc<dyn Filesystem>> {
    if let Some(native) = fs.as_sub() {
        return native.sub(dir).await;
    }

    let dir = path::clean(dir);
    if dir.as_os_str().is_empty() {
        return Ok(fs);
    }

    let info = stat(&*fs, &dir).await?;
    if !info.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("not a directory: {}", dir.display()),
        ));
    }
    Ok(Arc::new(ScopedFs::new(fs, dir)))
}

/// Whether `path` exists.
pub async fn exists(fs: &dyn Filesystem, path: &Path) -> bool {
    stat(fs, path).await.is_ok()
}
