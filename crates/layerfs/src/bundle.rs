//! Embedded resource bundles.
//!
//! A [`StaticFs`] serves files compiled into the binary, typically with
//! `include_bytes!`. It only implements `open` and `read_file`; stat,
//! listing and re-rooting go through the [`crate::ops`] fallbacks.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::handle::{BytesFile, ListedDir};
use crate::path;
use crate::traits::{DirEntry, File, Filesystem, ReadFileFs};

/// Read-only filesystem over `(path, bytes)` pairs known at compile time.
///
/// ```
/// use layerfs::StaticFs;
///
/// static ASSETS: &[(&str, &[u8])] = &[
///     ("views/home.html", b"<h1>home</h1>"),
///     ("views/about.html", b"<h1>about</h1>"),
/// ];
///
/// let bundle = StaticFs::new(ASSETS);
/// assert_eq!(bundle.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct StaticFs {
    files: BTreeMap<PathBuf, Arc<[u8]>>,
    dirs: BTreeSet<PathBuf>,
}

impl StaticFs {
    pub fn new(files: &'static [(&'static str, &'static [u8])]) -> Self {
        let mut map = BTreeMap::new();
        let mut dirs = BTreeSet::new();
        dirs.insert(PathBuf::new());

        for (name, data) in files {
            let normalized = path::clean(Path::new(name));
            if normalized.as_os_str().is_empty() {
                continue;
            }
            let mut current = PathBuf::new();
            for component in normalized.parent().into_iter().flat_map(|p| p.components()) {
                if let Component::Normal(s) = component {
                    current.push(s);
                    dirs.insert(current.clone());
                }
            }
            map.insert(normalized, Arc::from(*data));
        }

        // A path that is a directory prefix of another entry stays a directory
        map.retain(|p, _| !dirs.contains(p));
        Self { files: map, dirs }
    }

    /// Number of files in the bundle.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn children(&self, dir: &Path) -> Vec<DirEntry> {
        let subdirs = self
            .dirs
            .iter()
            .filter(|d| d.parent() == Some(dir))
            .filter_map(|d| Some(DirEntry::directory(d.file_name()?.to_string_lossy())));
        let files = self
            .files
            .iter()
            .filter(|(f, _)| f.parent() == Some(dir))
            .filter_map(|(f, data)| {
                Some(DirEntry::file(
                    f.file_name()?.to_string_lossy(),
                    data.len() as u64,
                ))
            });

        let mut entries: Vec<DirEntry> = subdirs.chain(files).collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    fn not_found(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("not in bundle: {}", path::display(path)),
        )
    }
}

#[async_trait]
impl Filesystem for StaticFs {
    async fn open(&self, path: &Path) -> io::Result<Box<dyn File>> {
        let key = path::clean(path);
        let name = path::base_name(&key);

        if let Some(data) = self.files.get(&key) {
            let info = DirEntry::file(name, data.len() as u64).with_permissions(0o444);
            return Ok(Box::new(BytesFile::new(info, Arc::clone(data))));
        }
        if self.dirs.contains(&key) {
            let info = DirEntry::directory(name).with_permissions(0o555);
            return Ok(Box::new(ListedDir::new(info, self.children(&key))));
        }
        Err(Self::not_found(&key))
    }

    fn as_read_file(&self) -> Option<&dyn ReadFileFs> {
        Some(self)
    }
}

#[async_trait]
impl ReadFileFs for StaticFs {
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        let key = path::clean(path);
        match self.files.get(&key) {
            Some(data) => Ok(data.to_vec()),
            None if self.dirs.contains(&key) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("is a directory: {}", path::display(&key)),
            )),
            None => Err(Self::not_found(&key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;

    static THEME: &[(&str, &[u8])] = &[
        ("views/contact.html", b"THEME: contact"),
        ("views/partials/nav.html", b"THEME: nav"),
        ("style.css", b"body {}"),
    ];

    #[tokio::test]
    async fn test_read_file() {
        let fs = StaticFs::new(THEME);
        let data = fs.read_file(Path::new("/views/contact.html")).await.unwrap();
        assert_eq!(data, b"THEME: contact");
    }

    #[tokio::test]
    async fn test_read_file_on_directory() {
        let fs = StaticFs::new(THEME);
        let err = fs.read_file(Path::new("views")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::IsADirectory);
    }

    #[tokio::test]
    async fn test_implicit_directories_list() {
        let fs = StaticFs::new(THEME);
        let entries = ops::read_dir(&fs, Path::new("views")).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["contact.html", "partials"]);
        assert!(entries[1].is_dir());

        let root = ops::read_dir(&fs, Path::new("")).await.unwrap();
        assert_eq!(root.len(), 2);
    }

    #[tokio::test]
    async fn test_stat_through_open() {
        let fs = StaticFs::new(THEME);
        assert!(fs.as_stat().is_none());
        let info = ops::stat(&fs, Path::new("style.css")).await.unwrap();
        assert_eq!(info.size, 7);
        assert_eq!(info.permissions, Some(0o444));
    }

    #[tokio::test]
    async fn test_missing_is_not_found() {
        let fs = StaticFs::new(THEME);
        let err = fs.open(Path::new("views/home.html")).await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_len() {
        assert_eq!(StaticFs::new(THEME).len(), 3);
        assert!(StaticFs::new(&[]).is_empty());
    }
}
