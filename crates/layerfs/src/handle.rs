//! Ready-made handles for providers that hold their data in memory.

use async_trait::async_trait;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

use crate::traits::{DirEntry, DirHandle, EntryBatch, File, ReadLimit};

/// Monotonic cursor over a fixed entry list.
#[derive(Debug, Clone, Default)]
pub struct EntryCursor {
    entries: Vec<DirEntry>,
    pos: usize,
}

impl EntryCursor {
    pub fn new(entries: Vec<DirEntry>) -> Self {
        Self { entries, pos: 0 }
    }

    /// Entries not yet returned.
    pub fn remaining(&self) -> usize {
        self.entries.len() - self.pos
    }

    pub fn take(&mut self, limit: ReadLimit) -> EntryBatch {
        let remaining = self.remaining();
        let count = match limit {
            ReadLimit::All | ReadLimit::Up(0) => {
                let entries = self.entries[self.pos..].to_vec();
                self.pos = self.entries.len();
                return EntryBatch {
                    entries,
                    end: remaining == 0,
                };
            }
            ReadLimit::Up(n) => n.min(remaining),
        };

        let entries = self.entries[self.pos..self.pos + count].to_vec();
        self.pos += count;
        EntryBatch {
            entries,
            end: self.pos >= self.entries.len(),
        }
    }
}

/// File handle over shared bytes.
#[derive(Debug)]
pub struct BytesFile {
    info: DirEntry,
    data: Cursor<Arc<[u8]>>,
}

impl BytesFile {
    pub fn new(info: DirEntry, data: Arc<[u8]>) -> Self {
        Self {
            info,
            data: Cursor::new(data),
        }
    }
}

impl AsyncRead for BytesFile {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.data).poll_read(cx, buf)
    }
}

#[async_trait]
impl File for BytesFile {
    async fn stat(&self) -> io::Result<DirEntry> {
        Ok(self.info.clone())
    }
}

/// Directory handle over a listing taken at open time.
#[derive(Debug)]
pub struct ListedDir {
    info: DirEntry,
    cursor: EntryCursor,
}

impl ListedDir {
    pub fn new(info: DirEntry, entries: Vec<DirEntry>) -> Self {
        Self {
            info,
            cursor: EntryCursor::new(entries),
        }
    }
}

impl AsyncRead for ListedDir {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(is_a_directory(&self.info.name)))
    }
}

#[async_trait]
impl File for ListedDir {
    async fn stat(&self) -> io::Result<DirEntry> {
        Ok(self.info.clone())
    }

    fn as_dir(&mut self) -> Option<&mut dyn DirHandle> {
        Some(self)
    }
}

#[async_trait]
impl DirHandle for ListedDir {
    async fn read_entries(&mut self, limit: ReadLimit) -> io::Result<EntryBatch> {
        Ok(self.cursor.take(limit))
    }
}

pub(crate) fn is_a_directory(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::IsADirectory, format!("is a directory: {}", name))
}
