//! Backing stores for evicted sessions.
//!
//! A backing store is an opaque key/value blob store keyed by session
//! identity. The store never interprets the blobs; the eviction bridge owns
//! their format.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::Result;
use crate::id::SessionId;

/// Key/value blob storage for evicted sessions.
pub trait BackingStore: Send + Sync {
    /// Store (or overwrite) the blob for a session.
    fn write(&self, id: &SessionId, blob: &[u8]) -> Result<()>;

    /// Fetch the blob for a session. `Ok(None)` means nothing is stored.
    fn read(&self, id: &SessionId) -> Result<Option<Vec<u8>>>;

    /// Remove the blob for a session. Removing a missing blob succeeds.
    fn delete(&self, id: &SessionId) -> Result<()>;
}

/// Process-local backing store.
#[derive(Debug, Default)]
pub struct MemoryBackingStore {
    blobs: RwLock<HashMap<SessionId, Vec<u8>>>,
}

impl MemoryBackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.blobs.read().contains_key(id)
    }
}

impl BackingStore for MemoryBackingStore {
    fn write(&self, id: &SessionId, blob: &[u8]) -> Result<()> {
        self.blobs.write().insert(id.clone(), blob.to_vec());
        Ok(())
    }

    fn read(&self, id: &SessionId) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.read().get(id).cloned())
    }

    fn delete(&self, id: &SessionId) -> Result<()> {
        self.blobs.write().remove(id);
        Ok(())
    }
}

/// One file per session under a directory.
///
/// Layout: `{dir}/{hex(session_id)}.session`
#[derive(Debug, Clone)]
pub struct FileBackingStore {
    dir: PathBuf,
}

impl FileBackingStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the blob for a session.
    pub fn blob_path(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}.session", id.to_hex()))
    }
}

impl BackingStore for FileBackingStore {
    fn write(&self, id: &SessionId, blob: &[u8]) -> Result<()> {
        let path = self.blob_path(id);
        let tmp = path.with_extension("session.tmp");

        let mut file = fs::File::create(&tmp)?;
        file.write_all(blob)?;
        // Ensure data is on disk before the rename publishes it
        file.sync_all()?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn read(&self, id: &SessionId) -> Result<Option<Vec<u8>>> {
        match fs::read(self.blob_path(id)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, id: &SessionId) -> Result<()> {
        match fs::remove_file(self.blob_path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
