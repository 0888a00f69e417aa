//! In-memory session records.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::codec::{AttributeValue, EncodedAttribute};
use crate::id::SessionId;

/// One named attribute plus its persistence bookkeeping.
#[derive(Debug, Clone)]
pub struct AttributeEntry {
    /// Current value.
    pub value: AttributeValue,

    /// Whether `value` changed since it was last encoded.
    pub dirty: bool,

    /// Encoding from the last successful persist or reconstruction.
    pub encoded: Option<EncodedAttribute>,
}

impl AttributeEntry {
    /// A freshly written attribute.
    pub fn new(value: AttributeValue) -> Self {
        Self {
            value,
            dirty: true,
            encoded: None,
        }
    }

    /// An attribute rebuilt from its persisted form.
    pub fn restored(value: AttributeValue, encoded: EncodedAttribute) -> Self {
        Self {
            value,
            dirty: false,
            encoded: Some(encoded),
        }
    }

    /// Record a successful encoding.
    pub fn mark_clean(&mut self, encoded: EncodedAttribute) {
        self.encoded = Some(encoded);
        self.dirty = false;
    }

    /// Whether the entry needs to go through the codec before persisting.
    pub fn needs_encoding(&self) -> bool {
        self.dirty || self.encoded.is_none()
    }
}

/// Mutable part of a record, guarded by the record lock.
#[derive(Debug, Default)]
pub struct RecordState {
    pub attributes: HashMap<String, AttributeEntry>,
}

/// Outcome of storing an attribute.
#[derive(Debug, Clone)]
pub enum PutOutcome {
    /// The name was not present before.
    Inserted,
    /// The name existed; carries the replaced value.
    Replaced(AttributeValue),
}

impl PutOutcome {
    /// Whether the put created a new attribute name.
    pub fn is_new_key(&self) -> bool {
        matches!(self, Self::Inserted)
    }
}

/// The in-memory form of one session.
///
/// Attribute access goes through a per-record read/write lock, so
/// different sessions never contend with each other. The last access time
/// is kept outside the lock and only ever moves forward.
#[derive(Debug)]
pub struct SessionRecord {
    id: SessionId,
    created_at: DateTime<Utc>,
    last_accessed_micros: AtomicI64,
    detached: AtomicBool,
    max_inactive: Mutex<Option<Duration>>,
    state: RwLock<RecordState>,
}

impl SessionRecord {
    /// Create an empty record at `now`.
    pub fn new(id: SessionId, now: DateTime<Utc>, max_inactive: Option<Duration>) -> Self {
        Self::restore(id, now, now, max_inactive, HashMap::new())
    }

    /// Rebuild a record from persisted parts.
    ///
    /// `last_accessed_at` is clamped so it never precedes `created_at`.
    pub fn restore(
        id: SessionId,
        created_at: DateTime<Utc>,
        last_accessed_at: DateTime<Utc>,
        max_inactive: Option<Duration>,
        attributes: HashMap<String, AttributeEntry>,
    ) -> Self {
        let created_at = truncate_to_micros(created_at);
        let last = last_accessed_at.max(created_at);
        Self {
            id,
            created_at,
            last_accessed_micros: AtomicI64::new(last.timestamp_micros()),
            detached: AtomicBool::new(false),
            max_inactive: Mutex::new(max_inactive),
            state: RwLock::new(RecordState { attributes }),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        let micros = self.last_accessed_micros.load(Ordering::Acquire);
        DateTime::from_timestamp_micros(micros).unwrap_or(self.created_at)
    }

    /// Record an access at `now`. Earlier instants are ignored.
    pub fn touch(&self, now: DateTime<Utc>) {
        self.last_accessed_micros
            .fetch_max(now.timestamp_micros(), Ordering::AcqRel);
    }

    /// Inactivity after which the session expires; `None` never expires.
    pub fn max_inactive(&self) -> Option<Duration> {
        *self.max_inactive.lock()
    }

    pub fn set_max_inactive(&self, max_inactive: Option<Duration>) {
        *self.max_inactive.lock() = max_inactive;
    }

    /// Whether the record has been released from memory (evicted or destroyed).
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    /// Mark the record released. Callers hold the write lock.
    pub(crate) fn detach(&self) {
        self.detached.store(true, Ordering::Release);
    }

    /// Time since the last access, saturating at zero under clock skew.
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        crate::ttl::idle_time(self.last_accessed_at(), now)
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, RecordState> {
        self.state.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, RecordState> {
        self.state.write()
    }

    /// Snapshot of the attribute names.
    pub fn attribute_names(&self) -> BTreeSet<String> {
        self.state.read().attributes.keys().cloned().collect()
    }

    /// Current value of one attribute.
    pub fn attribute(&self, name: &str) -> Option<AttributeValue> {
        self.state
            .read()
            .attributes
            .get(name)
            .map(|e| e.value.clone())
    }

    pub fn attribute_count(&self) -> usize {
        self.state.read().attributes.len()
    }
}

/// Access times are tracked at microsecond precision; creation time is
/// truncated to match so `last_accessed_at >= created_at` holds exactly.
fn truncate_to_micros(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(t.timestamp_micros()).unwrap_or(t)
}

impl RecordState {
    /// Insert or replace an attribute.
    pub fn put(&mut self, name: String, value: AttributeValue) -> PutOutcome {
        match self.attributes.insert(name, AttributeEntry::new(value)) {
            Some(previous) => PutOutcome::Replaced(previous.value),
            None => PutOutcome::Inserted,
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name).map(|e| e.value)
    }

    /// Number of attributes that changed since they were last encoded.
    pub fn dirty_count(&self) -> usize {
        self.attributes.values().filter(|e| e.needs_encoding()).count()
    }
}
