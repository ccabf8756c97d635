//! The set of currently open buffers.
//!
//! A [`DocumentSet`] owns every open [`TextBuffer`] under a stable [`BufferId`]. Ids are handed
//! out in increasing order and never reused, so iteration in id order is also opening order.
//! Closing a buffer discards it without touching the file on disk.
//!
//! Cross-file search and replace ([`crate::search`]) only ever see buffers held here.

use crate::buffer::TextBuffer;
use crate::config::EditorConfig;
use crate::io::{DocumentIo, FileIoError};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Opaque identifier for an open buffer in a [`DocumentSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(u64);

impl BufferId {
    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors from opening and closing documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// No open buffer has this id.
    #[error("buffer {0} is not open")]
    BufferNotFound(BufferId),
    /// A buffer for this path is already open.
    #[error("{} is already open", .0.display())]
    PathAlreadyOpen(PathBuf),
    /// Loading the file failed.
    #[error(transparent)]
    Io(#[from] FileIoError),
}

/// Open buffers, keyed by [`BufferId`].
#[derive(Debug, Default)]
pub struct DocumentSet {
    next_id: u64,
    buffers: BTreeMap<BufferId, TextBuffer>,
}

impl DocumentSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of open buffers.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Returns `true` if there are no open buffers.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Take ownership of `buffer`.
    ///
    /// Fails with [`DocumentError::PathAlreadyOpen`] if another open buffer has the same path.
    pub fn open(&mut self, buffer: TextBuffer) -> Result<BufferId, DocumentError> {
        if let Some(path) = buffer.path()
            && self.find_by_path(path).is_some()
        {
            return Err(DocumentError::PathAlreadyOpen(path.to_path_buf()));
        }

        let id = BufferId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        log::debug!("opened {} as buffer {id}", buffer.display_name());
        self.buffers.insert(id, buffer);
        Ok(id)
    }

    /// Load `path` through `io` and open it.
    pub fn open_path(
        &mut self,
        path: impl AsRef<Path>,
        io: &dyn DocumentIo,
        config: &EditorConfig,
    ) -> Result<BufferId, DocumentError> {
        let path = path.as_ref();
        if self.find_by_path(path).is_some() {
            return Err(DocumentError::PathAlreadyOpen(path.to_path_buf()));
        }
        let buffer = TextBuffer::load(path, io, config)?;
        self.open(buffer)
    }

    /// Close a buffer and hand it back. Unsaved changes are the caller's concern.
    pub fn close(&mut self, id: BufferId) -> Result<TextBuffer, DocumentError> {
        let buffer = self
            .buffers
            .remove(&id)
            .ok_or(DocumentError::BufferNotFound(id))?;
        if buffer.is_modified() {
            log::debug!("closed buffer {id} with unsaved changes");
        }
        Ok(buffer)
    }

    /// Borrow an open buffer.
    pub fn get(&self, id: BufferId) -> Option<&TextBuffer> {
        self.buffers.get(&id)
    }

    /// Mutably borrow an open buffer.
    pub fn get_mut(&mut self, id: BufferId) -> Option<&mut TextBuffer> {
        self.buffers.get_mut(&id)
    }

    /// Returns `true` if `id` is open.
    pub fn contains(&self, id: BufferId) -> bool {
        self.buffers.contains_key(&id)
    }

    /// Open buffers in id order.
    pub fn iter(&self) -> impl Iterator<Item = (BufferId, &TextBuffer)> {
        self.buffers.iter().map(|(id, buffer)| (*id, buffer))
    }

    /// Open buffer ids in ascending order.
    pub fn ids(&self) -> Vec<BufferId> {
        self.buffers.keys().copied().collect()
    }

    /// Id of the open buffer backed by `path`.
    pub fn find_by_path(&self, path: &Path) -> Option<BufferId> {
        self.buffers
            .iter()
            .find(|(_, buffer)| buffer.path() == Some(path))
            .map(|(id, _)| *id)
    }
}
