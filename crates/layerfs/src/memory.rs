//! In-memory filesystem implementation.
//!
//! Used for override layers built at runtime and for testing. All data is
//! ephemeral.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::RwLock;

use crate::handle::{BytesFile, ListedDir};
use crate::path;
use crate::traits::{DirEntry, File, Filesystem, ReadDirFs, ReadFileFs, StatFs, SubFs};

/// Entry in the memory filesystem.
#[derive(Debug, Clone)]
enum Entry {
    File { data: Arc<[u8]>, modified: SystemTime },
    Directory { modified: SystemTime },
}

type Tree = HashMap<PathBuf, Entry>;

/// In-memory filesystem.
///
/// Thread-safe via internal `RwLock`. Clones and [`sub`](SubFs::sub) views
/// share the same tree; a view only sees paths under its own root.
#[derive(Debug, Clone)]
pub struct MemoryFs {
    entries: Arc<RwLock<Tree>>,
    root: PathBuf,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    /// Create a new empty in-memory filesystem.
    pub fn new() -> Self {
        Self::from_tree(Self::empty_tree())
    }

    /// Build a filesystem from `(path, contents)` pairs.
    ///
    /// Parent directories are created implicitly. Later pairs overwrite
    /// earlier ones. A pair that would turn a directory into a file, or that
    /// nests under an existing file, is skipped.
    pub fn from_files<I, P, D>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, D)>,
        P: AsRef<Path>,
        D: AsRef<[u8]>,
    {
        let mut tree = Self::empty_tree();
        for (file_path, data) in files {
            let normalized = path::clean(file_path.as_ref());
            if normalized.as_os_str().is_empty() {
                continue;
            }
            if let Some(Entry::Directory { .. }) = tree.get(&normalized) {
                continue;
            }
            if Self::ensure_parents(&mut tree, &normalized).is_err() {
                continue;
            }
            tree.insert(
                normalized,
                Entry::File {
                    data: Arc::from(data.as_ref()),
                    modified: SystemTime::now(),
                },
            );
        }
        Self::from_tree(tree)
    }

    fn from_tree(tree: Tree) -> Self {
        Self {
            entries: Arc::new(RwLock::new(tree)),
            root: PathBuf::new(),
        }
    }

    fn empty_tree() -> Tree {
        let mut entries = HashMap::new();
        // Root directory always exists
        entries.insert(
            PathBuf::new(),
            Entry::Directory {
                modified: SystemTime::now(),
            },
        );
        entries
    }

    /// Map a caller path to its key in the shared tree.
    fn key(&self, path: &Path) -> PathBuf {
        self.root.join(path::clean(path))
    }

    /// Ensure all parent directories exist.
    ///
    /// Fails with `NotADirectory`, leaving the tree untouched, when any
    /// ancestor of `path` is a file.
    fn ensure_parents(tree: &mut Tree, path: &Path) -> io::Result<()> {
        let mut ancestors = Vec::new();
        let mut current = PathBuf::new();
        for component in path.parent().into_iter().flat_map(|p| p.components()) {
            if let Component::Normal(s) = component {
                current.push(s);
                if let Some(Entry::File { .. }) = tree.get(&current) {
                    return Err(io::Error::new(
                        io::ErrorKind::NotADirectory,
                        format!("not a directory: {}", path::display(&current)),
                    ));
                }
                ancestors.push(current.clone());
            }
        }

        for dir in ancestors {
            tree.entry(dir).or_insert(Entry::Directory {
                modified: SystemTime::now(),
            });
        }
        Ok(())
    }

    /// Write data to a file, creating parent directories.
    pub async fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let key = self.key(path);
        let mut entries = self.entries.write().await;

        // Check we're not overwriting a directory
        if let Some(Entry::Directory { .. }) = entries.get(&key) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            ));
        }

        Self::ensure_parents(&mut entries, &key)?;
        entries.insert(
            key,
            Entry::File {
                data: Arc::from(data),
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    /// Create a directory (and parent directories if needed).
    pub async fn mkdir(&self, path: &Path) -> io::Result<()> {
        let key = self.key(path);
        let mut entries = self.entries.write().await;

        if let Some(Entry::File { .. }) = entries.get(&key) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("file exists: {}", path.display()),
            ));
        }

        Self::ensure_parents(&mut entries, &key)?;
        entries.entry(key).or_insert(Entry::Directory {
            modified: SystemTime::now(),
        });
        Ok(())
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("not found: {}", path::display(path)),
        )
    }

    fn describe(name: String, entry: &Entry) -> DirEntry {
        match entry {
            Entry::File { data, modified } => {
                DirEntry::file(name, data.len() as u64).with_modified(*modified)
            }
            Entry::Directory { modified } => DirEntry::directory(name).with_modified(*modified),
        }
    }

    /// Direct children of `key`, sorted by name.
    fn children(tree: &Tree, key: &Path) -> Vec<DirEntry> {
        let mut result: Vec<DirEntry> = tree
            .iter()
            .filter(|(entry_path, _)| entry_path.parent() == Some(key))
            .filter_map(|(entry_path, entry)| {
                let name = entry_path.file_name()?.to_string_lossy().into_owned();
                Some(Self::describe(name, entry))
            })
            .collect();

        // Sort for consistent ordering
        result.sort_by(|a, b| a.name.cmp(&b.name));
        result
    }
}

#[async_trait]
impl Filesystem for MemoryFs {
    async fn open(&self, path: &Path) -> io::Result<Box<dyn File>> {
        let key = self.key(path);
        let entries = self.entries.read().await;
        let name = path::base_name(&path::clean(path));

        match entries.get(&key) {
            Some(Entry::File { data, modified }) => {
                let info = DirEntry::file(name, data.len() as u64).with_modified(*modified);
                Ok(Box::new(BytesFile::new(info, Arc::clone(data))))
            }
            Some(dir @ Entry::Directory { .. }) => {
                let info = Self::describe(name, dir);
                Ok(Box::new(ListedDir::new(info, Self::children(&entries, &key))))
            }
            None => Err(Self::not_found(path)),
        }
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
impl StatFs for MemoryFs {
    async fn stat(&self, path: &Path) -> io::Result<DirEntry> {
        let key = self.key(path);
        let entries = self.entries.read().await;
        let name = path::base_name(&path::clean(path));

        entries
            .get(&key)
            .map(|entry| Self::describe(name, entry))
            .ok_or_else(|| Self::not_found(path))
    }
}

#[async_trait]
impl ReadDirFs for MemoryFs {
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let key = self.key(path);
        let entries = self.entries.read().await;

        // Verify the path is a directory
        match entries.get(&key) {
            Some(Entry::Directory { .. }) => Ok(Self::children(&entries, &key)),
            Some(Entry::File { .. }) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {}", path.display()),
            )),
            None => Err(Self::not_found(path)),
        }
    }
}

#[async_trait]
impl ReadFileFs for MemoryFs {
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        let key = self.key(path);
        let entries = self.entries.read().await;

        match entries.get(&key) {
            Some(Entry::File { data, .. }) => Ok(data.to_vec()),
            Some(Entry::Directory { .. }) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path.display()),
            )),
            None => Err(Self::not_found(path)),
        }
    }
}

#[async_trait]
impl SubFs for MemoryFs {
    async fn sub(&self, dir: &Path) -> io::Result<Arc<dyn Filesystem>> {
        let key = self.key(dir);
        let entries = self.entries.read().await;

        match entries.get(&key) {
            Some(Entry::Directory { .. }) => Ok(Arc::new(MemoryFs {
                entries: Arc::clone(&self.entries),
                root: key,
            })),
            Some(Entry::File { .. }) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("not a directory: {}", dir.display()),
            )),
            None => Err(Self::not_found(dir)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;
    use crate::traits::ReadLimit;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_write_and_read() {
        let fs = MemoryFs::new();
        fs.write(Path::new("test.txt"), b"hello world").await.unwrap();
        let data = fs.read_file(Path::new("test.txt")).await.unwrap();
        assert_eq!(data, b"hello world");
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let fs = MemoryFs::new();
        let result = fs.read_file(Path::new("nonexistent.txt")).await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_nested_directories() {
        let fs = MemoryFs::new();
        fs.write(Path::new("a/b/c/file.txt"), b"nested").await.unwrap();

        // Should have created parent directories
        for dir in ["a", "a/b", "a/b/c"] {
            let meta = fs.stat(Path::new(dir)).await.unwrap();
            assert!(meta.is_dir(), "{dir} should be a directory");
        }

        let data = fs.read_file(Path::new("a/b/c/file.txt")).await.unwrap();
        assert_eq!(data, b"nested");
    }

    #[tokio::test]
    async fn test_list_directory() {
        let fs = MemoryFs::new();
        fs.write(Path::new("b.txt"), b"b").await.unwrap();
        fs.write(Path::new("a.txt"), b"a").await.unwrap();
        fs.mkdir(Path::new("subdir")).await.unwrap();

        let entries = fs.read_dir(Path::new("")).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "subdir"]);
        assert!(entries[2].is_dir());
    }

    #[tokio::test]
    async fn test_read_dir_on_file_fails() {
        let fs = MemoryFs::from_files([("f.txt", "x")]);
        let err = fs.read_dir(Path::new("f.txt")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotADirectory);
    }

    #[tokio::test]
    async fn test_write_over_directory_fails() {
        let fs = MemoryFs::new();
        fs.mkdir(Path::new("dir")).await.unwrap();
        let err = fs.write(Path::new("dir"), b"x").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::IsADirectory);
    }

    #[tokio::test]
    async fn test_path_normalization() {
        let fs = MemoryFs::new();
        fs.write(Path::new("/a/b/c.txt"), b"data").await.unwrap();

        // Various path forms should all work
        for form in ["a/b/c.txt", "/a/b/c.txt", "a/./b/c.txt", "a/b/../b/c.txt"] {
            let data = fs.read_file(Path::new(form)).await.unwrap();
            assert_eq!(data, b"data", "form {form}");
        }
    }

    #[tokio::test]
    async fn test_open_file_reads_bytes() {
        let fs = MemoryFs::from_files([("dir/hello.txt", "hi there")]);
        let mut file = fs.open(Path::new("dir/hello.txt")).await.unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hi there");

        let info = file.stat().await.unwrap();
        assert_eq!(info.name, "hello.txt");
        assert_eq!(info.size, 8);
    }

    #[tokio::test]
    async fn test_open_directory_lists_entries() {
        let fs = MemoryFs::from_files([("dir/a", "1"), ("dir/b", "2")]);
        let mut handle = fs.open(Path::new("dir")).await.unwrap();
        assert!(handle.stat().await.unwrap().is_dir());

        let dir = handle.as_dir().unwrap();
        let batch = dir.read_entries(ReadLimit::Up(1)).await.unwrap();
        assert_eq!(batch.entries[0].name, "a");
        assert!(!batch.end);
        let batch = dir.read_entries(ReadLimit::Up(1)).await.unwrap();
        assert_eq!(batch.entries[0].name, "b");
        assert!(batch.end);
    }

    #[tokio::test]
    async fn test_root_stat_is_directory() {
        let fs = MemoryFs::new();
        let meta = fs.stat(Path::new("/")).await.unwrap();
        assert!(meta.is_dir());
        assert_eq!(meta.name, ".");
    }

    #[tokio::test]
    async fn test_sub_shares_tree() {
        let fs = MemoryFs::from_files([("views/home.html", "home")]);
        let views = fs.sub(Path::new("views")).await.unwrap();
        assert_eq!(
            ops::read_file(&*views, Path::new("home.html")).await.unwrap(),
            b"home"
        );

        // Writes through the parent are visible in the view
        fs.write(Path::new("views/about.html"), b"about").await.unwrap();
        assert!(ops::exists(&*views, Path::new("about.html")).await);

        // The view cannot see outside its root
        assert!(!ops::exists(&*views, Path::new("../views/home.html")).await);
    }

    #[tokio::test]
    async fn test_sub_on_file_fails() {
        let fs = MemoryFs::from_files([("f.txt", "x")]);
        let err = fs.sub(Path::new("f.txt")).await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotADirectory);
    }

    #[tokio::test]
    async fn test_from_files_keeps_directories() {
        let fs = MemoryFs::from_files([("d/x", "1"), ("d", "clobber")]);
        assert!(fs.stat(Path::new("d")).await.unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_from_files_skips_path_under_file() {
        let fs = MemoryFs::from_files([("a", "x"), ("a/b", "y")]);
        assert_eq!(fs.read_file(Path::new("a")).await.unwrap(), b"x");

        let err = fs.stat(Path::new("a/b")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(fs.read_dir(Path::new("")).await.unwrap()[0].is_file());
    }

    #[tokio::test]
    async fn test_write_under_file_fails() {
        let fs = MemoryFs::from_files([("a", "x")]);
        let err = fs.write(Path::new("a/b/c"), b"y").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotADirectory);

        let err = fs.mkdir(Path::new("a/b")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotADirectory);

        // Nothing was created on the way down
        assert!(!ops::exists(&fs, Path::new("a/b")).await);
        assert_eq!(fs.read_file(Path::new("a")).await.unwrap(), b"x");
    }
}
