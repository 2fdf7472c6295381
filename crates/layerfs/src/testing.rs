//! Providers for exercising layered resolution in tests.
//!
//! These wrap or stand in for real providers to inject failures, hide
//! capabilities, and observe which layers an operation consulted.

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::ops;
use crate::traits::{DirEntry, File, Filesystem, ReadDirFs, ReadFileFs, StatFs, SubFs};

/// A provider on which every operation fails with the same error kind.
///
/// Every capability is advertised, so native and fallback paths both fail.
#[derive(Debug, Clone, Copy)]
pub struct FaultyFs {
    kind: io::ErrorKind,
}

impl FaultyFs {
    pub fn new(kind: io::ErrorKind) -> Self {
        Self { kind }
    }

    /// Fails with [`io::ErrorKind::PermissionDenied`].
    pub fn denied() -> Self {
        Self::new(io::ErrorKind::PermissionDenied)
    }

    fn fail(&self, op: &str, path: &Path) -> io::Error {
        io::Error::new(self.kind, format!("injected {op} fault: {}", path.display()))
    }
}

#[async_trait]
impl Filesystem for FaultyFs {
    async fn open(&self, path: &Path) -> io::Result<Box<dyn File>> {
        Err(self.fail("open", path))
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
impl StatFs for FaultyFs {
    async fn stat(&self, path: &Path) -> io::Result<DirEntry> {
        Err(self.fail("stat", path))
    }
}

#[async_trait]
impl ReadDirFs for FaultyFs {
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        Err(self.fail("readdir", path))
    }
}

#[async_trait]
impl ReadFileFs for FaultyFs {
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        Err(self.fail("read", path))
    }
}

#[async_trait]
impl SubFs for FaultyFs {
    async fn sub(&self, dir: &Path) -> io::Result<Arc<dyn Filesystem>> {
        Err(self.fail("sub", dir))
    }
}

/// Exposes only `open` of the wrapped provider.
#[derive(Clone)]
pub struct OpenOnly {
    inner: Arc<dyn Filesystem>,
}

impl fmt::Debug for OpenOnly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenOnly").finish_non_exhaustive()
    }
}

impl OpenOnly {
    pub fn new(inner: Arc<dyn Filesystem>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Filesystem for OpenOnly {
    async fn open(&self, path: &Path) -> io::Result<Box<dyn File>> {
        self.inner.open(path).await
    }
}

/// Counts every operation made against the wrapped provider.
///
/// Advertises all capabilities and forwards through [`ops`], so one
/// logical operation counts as one call.
pub struct CountingFs {
    inner: Arc<dyn Filesystem>,
    calls: AtomicUsize,
}

impl fmt::Debug for CountingFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountingFs")
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

impl CountingFs {
    pub fn new(inner: Arc<dyn Filesystem>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Filesystem for CountingFs {
    async fn open(&self, path: &Path) -> io::Result<Box<dyn File>> {
        self.hit();
        self.inner.open(path).await
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
impl StatFs for CountingFs {
    async fn stat(&self, path: &Path) -> io::Result<DirEntry> {
        self.hit();
        ops::stat(&*self.inner, path).await
    }
}

#[async_trait]
impl ReadDirFs for CountingFs {
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        self.hit();
        ops::read_dir(&*self.inner, path).await
    }
}

#[async_trait]
impl ReadFileFs for CountingFs {
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.hit();
        ops::read_file(&*self.inner, path).await
    }
}

#[async_trait]
impl SubFs for CountingFs {
    async fn sub(&self, dir: &Path) -> io::Result<Arc<dyn Filesystem>> {
        self.hit();
        ops::sub(Arc::clone(&self.inner), dir).await
    }
}
