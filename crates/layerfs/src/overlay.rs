//! Overlay directories: one directory handle over every layer's entries.

use async_trait::async_trait;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::{Collector, LayerError, Target};
use crate::handle::EntryCursor;
use crate::layered::LayeredFs;
use crate::ops;
use crate::path;
use crate::traits::{DirEntry, DirHandle, EntryBatch, File, ReadLimit};

/// Name-deduplicated entry list that keeps the first contributor.
#[derive(Debug, Default)]
pub(crate) struct MergedEntries {
    seen: HashSet<String>,
    entries: Vec<DirEntry>,
}

impl MergedEntries {
    pub(crate) fn extend(&mut self, entries: Vec<DirEntry>) {
        for entry in entries {
            if self.seen.contains(&entry.name) {
                tracing::trace!(name = %entry.name, "entry shadowed by higher layer");
                continue;
            }
            self.seen.insert(entry.name.clone());
            self.entries.push(entry);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn into_entries(self) -> Vec<DirEntry> {
        self.entries
    }
}

/// Overlay-mode open.
///
/// A regular file in the highest layer that has the path wins as long as no
/// higher layer has a directory there. Once a directory is seen, files
/// further down are masked and every directory below contributes entries.
pub(crate) async fn open(fs: &LayeredFs, path: &Path) -> Result<Box<dyn File>, LayerError> {
    let mut collector = Collector::new(fs.policy().tolerance, Target::File, path);
    let mut merged = MergedEntries::default();
    let mut info: Option<DirEntry> = None;
    let mut listed = false;

    for (layer, provider) in fs.layers().iter().enumerate() {
        let file = match provider.open(path).await {
            Ok(file) => file,
            Err(err) => {
                collector.record(layer, err)?;
                continue;
            }
        };
        let stat = match file.stat().await {
            Ok(stat) => stat,
            Err(err) => {
                collector.record(layer, err)?;
                continue;
            }
        };

        if !stat.is_dir() {
            if info.is_none() {
                tracing::debug!(layer, path = %path::display(path), "resolved file");
                return Ok(file);
            }
            tracing::trace!(layer, "file masked by directory in higher layer");
            continue;
        }

        if info.is_none() {
            collector.mark_found();
            collector.retarget(Target::Directory);
            info = Some(stat);
        }
        drop(file);

        match ops::read_dir(&**provider, path).await {
            Ok(entries) => {
                listed = true;
                merged.extend(entries);
            }
            Err(err) => collector.record(layer, err)?,
        }
    }

    if !listed {
        return Err(collector.finish());
    }
    tracing::debug!(
        path = %path::display(path),
        entries = merged.len(),
        "synthesized overlay directory"
    );
    Ok(Box::new(OverlayDir::new(path, info, merged.into_entries())))
}

/// Synthetic directory handle over merged layer listings.
///
/// The entry list is fixed when the handle is created. Each handle has its
/// own cursor.
#[derive(Debug)]
pub struct OverlayDir {
    path: PathBuf,
    info: Option<DirEntry>,
    cursor: EntryCursor,
}

impl OverlayDir {
    /// `info` is reported by [`File::stat`]; without it a read-only
    /// directory entry named after `path` is synthesized.
    pub fn new(path: &Path, info: Option<DirEntry>, entries: Vec<DirEntry>) -> Self {
        Self {
            path: path::clean(path),
            info,
            cursor: EntryCursor::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries not yet returned by [`DirHandle::read_entries`].
    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }
}

impl AsyncRead for OverlayDir {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("read {}: overlay directory", path::display(&self.path)),
        )))
    }
}

#[async_trait]
impl File for OverlayDir {
    async fn stat(&self) -> io::Result<DirEntry> {
        Ok(self.info.clone().unwrap_or_else(|| {
            DirEntry::directory(path::base_name(&self.path)).with_permissions(0o555)
        }))
    }

    fn as_dir(&mut self) -> Option<&mut dyn DirHandle> {
        Some(self)
    }
}

#[async_trait]
impl DirHandle for OverlayDir {
    async fn read_entries(&mut self, limit: ReadLimit) -> io::Result<EntryBatch> {
        Ok(self.cursor.take(limit))
    }
}
