//! A filesystem view scoped to a subdirectory of another provider.

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ops;
use crate::path;
use crate::traits::{DirEntry, File, Filesystem, ReadDirFs, ReadFileFs, StatFs, SubFs};

/// Prefixes every path with `root` before handing it to the inner provider.
///
/// Built by [`ops::sub`] for providers that cannot re-root themselves.
/// Optional operations go through [`ops`], so the view supports all of them
/// whatever the inner provider offers natively.
#[derive(Clone)]
pub struct ScopedFs {
    inner: Arc<dyn Filesystem>,
    root: PathBuf,
}

impl fmt::Debug for ScopedFs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedFs").field("root", &self.root).finish()
    }
}

impl ScopedFs {
    pub fn new(inner: Arc<dyn Filesystem>, root: impl AsRef<Path>) -> Self {
        Self {
            inner,
            root: path::clean(root.as_ref()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path::clean(path))
    }
}

#[async_trait]
impl Filesystem for ScopedFs {
    async fn open(&self, path: &Path) -> io::Result<Box<dyn File>> {
        self.inner.open(&self.resolve(path)).await
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
impl StatFs for ScopedFs {
    async fn stat(&self, path: &Path) -> io::Result<DirEntry> {
        ops::stat(&*self.inner, &self.resolve(path)).await
    }
}

#[async_trait]
impl ReadDirFs for ScopedFs {
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        ops::read_dir(&*self.inner, &self.resolve(path)).await
    }
}

#[async_trait]
impl ReadFileFs for ScopedFs {
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        ops::read_file(&*self.inner, &self.resolve(path)).await
    }
}

#[async_trait]
impl SubFs for ScopedFs {
    async fn sub(&self, dir: &Path) -> io::Result<Arc<dyn Filesystem>> {
        ops::sub(Arc::clone(&self.inner), &self.resolve(dir)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryFs;
    use crate::testing::OpenOnly;

    fn scoped() -> ScopedFs {
        let inner = OpenOnly::new(Arc::new(MemoryFs::from_files([
            ("site/views/home.html", "home"),
            ("site/views/partials/nav.html", "nav"),
            ("other.txt", "other"),
        ])));
        ScopedFs::new(Arc::new(inner), "site")
    }

    #[tokio::test]
    async fn test_paths_resolve_under_root() {
        let fs = scoped();
        let data = ops::read_file(&fs, Path::new("views/home.html")).await.unwrap();
        assert_eq!(data, b"home");
    }

    #[tokio::test]
    async fn test_parent_components_cannot_escape() {
        let fs = scoped();
        let err = ops::read_file(&fs, Path::new("../other.txt")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_lists_through_open_only_inner() {
        let fs = scoped();
        let entries = ops::read_dir(&fs, Path::new("views")).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["home.html", "partials"]);
    }

    #[tokio::test]
    async fn test_nested_sub() {
        let fs = scoped();
        let nested = SubFs::sub(&fs, Path::new("views/partials")).await.unwrap();
        let data = ops::read_file(&*nested, Path::new("nav.html")).await.unwrap();
        assert_eq!(data, b"nav");
    }
}
