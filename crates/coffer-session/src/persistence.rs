//! The boundary between in-memory records and the backing store.
//!
//! [`EvictionBridge`] turns a record into a blob (encoding dirty attributes
//! through the codec registry) and rebuilds records from blobs. Codec
//! failures are isolated per attribute: a value that cannot be encoded is
//! left out of the blob, and a stored value that cannot be decoded is left
//! out of the rebuilt record. Neither aborts the rest of the session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::backing::BackingStore;
use crate::codec::{CodecError, CodecRegistry, EncodedAttribute};
use crate::error::{Error, Result};
use crate::id::SessionId;
use crate::record::{AttributeEntry, RecordState, SessionRecord};

/// Persisted form of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    id: SessionId,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    #[serde(default)]
    max_inactive_ms: Option<u64>,
    attributes: Vec<PersistedAttribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedAttribute {
    name: String,
    #[serde(flatten)]
    encoded: EncodedAttribute,
}

/// An attribute left behind by a persist or a reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAttribute {
    pub name: String,
    pub error: CodecError,
}

/// Result of persisting one session.
#[derive(Debug, Clone, Default)]
pub struct EvictionReport {
    /// Attributes written to the backing store.
    pub persisted: usize,

    /// Of those, how many went through the codec (the rest reused a cached
    /// encoding).
    pub encoded: usize,

    /// Attributes that could not be encoded and were not persisted.
    pub skipped: Vec<SkippedAttribute>,
}

/// A session rebuilt from the backing store, not yet in memory.
#[derive(Debug)]
pub struct Reconstructed {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    /// Last access recorded at eviction time.
    pub last_accessed_at: DateTime<Utc>,
    pub max_inactive: Option<Duration>,
    pub attributes: HashMap<String, AttributeEntry>,
    /// Attributes that could not be decoded and were dropped.
    pub dropped: Vec<SkippedAttribute>,
}

impl Reconstructed {
    /// Build the in-memory record, accessed at `now`.
    pub fn into_record(self, now: DateTime<Utc>) -> SessionRecord {
        let record = SessionRecord::restore(
            self.id,
            self.created_at,
            self.last_accessed_at,
            self.max_inactive,
            self.attributes,
        );
        record.touch(now);
        record
    }
}

/// Moves records between memory and a [`BackingStore`].
#[derive(Clone)]
pub struct EvictionBridge {
    codecs: Arc<CodecRegistry>,
    backing: Arc<dyn BackingStore>,
}

impl EvictionBridge {
    pub fn new(codecs: Arc<CodecRegistry>, backing: Arc<dyn BackingStore>) -> Self {
        Self { codecs, backing }
    }

    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    pub fn backing(&self) -> &Arc<dyn BackingStore> {
        &self.backing
    }

    /// Write a record to the backing store.
    ///
    /// The caller holds the record's write lock and passes its state. Dirty
    /// entries are marked clean only after the write succeeds; on a write
    /// failure the state is left untouched.
    pub fn persist(&self, record: &SessionRecord, state: &mut RecordState) -> Result<EvictionReport> {
        let mut report = EvictionReport::default();
        let mut attributes = Vec::with_capacity(state.attributes.len());
        let mut freshly_encoded = Vec::new();

        for (name, entry) in &state.attributes {
            let encoded = if entry.needs_encoding() {
                match self.codecs.encode(&entry.value) {
                    Ok(encoded) => {
                        report.encoded += 1;
                        freshly_encoded.push((name.clone(), encoded.clone()));
                        encoded
                    }
                    Err(error) => {
                        warn!(
                            session_id = %record.id(),
                            attribute = %name,
                            error = %error,
                            "Attribute not persisted"
                        );
                        report.skipped.push(SkippedAttribute {
                            name: name.clone(),
                            error,
                        });
                        continue;
                    }
                }
            } else {
                match &entry.encoded {
                    Some(cached) => cached.clone(),
                    None => continue,
                }
            };

            attributes.push(PersistedAttribute {
                name: name.clone(),
                encoded,
            });
        }

        report.persisted = attributes.len();

        let persisted = PersistedSession {
            id: record.id().clone(),
            created_at: record.created_at(),
            last_accessed_at: record.last_accessed_at(),
            max_inactive_ms: record
                .max_inactive()
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            attributes,
        };
        let blob = serde_json::to_vec(&persisted)?;

        self.backing.write(record.id(), &blob)?;

        for (name, encoded) in freshly_encoded {
            if let Some(entry) = state.attributes.get_mut(&name) {
                entry.mark_clean(encoded);
            }
        }

        debug!(
            session_id = %record.id(),
            persisted = report.persisted,
            encoded = report.encoded,
            skipped = report.skipped.len(),
            bytes = blob.len(),
            "Session persisted"
        );

        Ok(report)
    }

    /// Read and decode a session from the backing store.
    ///
    /// Returns `Ok(None)` if nothing is stored. Attributes that fail to
    /// decode are dropped and listed in [`Reconstructed::dropped`].
    pub fn load(&self, id: &SessionId) -> Result<Option<Reconstructed>> {
        let Some(blob) = self.backing.read(id)? else {
            trace!(session_id = %id, "No persisted session");
            return Ok(None);
        };

        let persisted: PersistedSession = serde_json::from_slice(&blob)?;
        if &persisted.id != id {
            return Err(Error::Persistence(format!(
                "blob for {id} belongs to session {}",
                persisted.id
            )));
        }

        let mut attributes = HashMap::with_capacity(persisted.attributes.len());
        let mut dropped = Vec::new();

        for attr in persisted.attributes {
            match self.codecs.decode(&attr.encoded) {
                Ok(value) => {
                    attributes.insert(attr.name, AttributeEntry::restored(value, attr.encoded));
                }
                Err(error) => {
                    warn!(
                        session_id = %id,
                        attribute = %attr.name,
                        error = %error,
                        "Dropping attribute that cannot be restored"
                    );
                    dropped.push(SkippedAttribute {
                        name: attr.name,
                        error,
                    });
                }
            }
        }

        debug!(
            session_id = %id,
            restored = attributes.len(),
            dropped = dropped.len(),
            "Session reconstructed from backing store"
        );

        Ok(Some(Reconstructed {
            id: persisted.id,
            created_at: persisted.created_at,
            last_accessed_at: persisted.last_accessed_at,
            max_inactive: persisted.max_inactive_ms.map(Duration::from_millis),
            attributes,
            dropped,
        }))
    }

    /// Remove a session's blob.
    pub fn discard(&self, id: &SessionId) -> Result<()> {
        self.backing.delete(id)
    }
}
