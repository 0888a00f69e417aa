//! The concurrent session store.

use std::collections::{BTreeSet, HashMap};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::backing::{BackingStore, MemoryBackingStore};
use crate::clock::{Clock, SystemClock};
use crate::codec::{AttributeValue, CodecRegistry};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::id::{IdGenerator, SessionId, UuidGenerator};
use crate::listener::{DestroyReason, ListenerFailure, ListenerRegistry, SessionEvent};
use crate::persistence::{EvictionBridge, EvictionReport, SkippedAttribute};
use crate::record::{PutOutcome, RecordState, SessionRecord};
use crate::ttl::{Disposition, ExpiryPolicy};

/// Store statistics.
#[derive(Debug, Clone)]
pub struct StoreStats {
    /// Sessions currently held in memory.
    pub resident: usize,

    /// Maximum number of sessions held in memory.
    pub capacity: usize,

    /// Retired identities being remembered.
    pub retired: usize,

    /// Registered lifecycle listeners.
    pub listeners: usize,
}

/// Outcome of one [`SessionStore::sweep`] pass.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Sessions destroyed for inactivity.
    pub expired: Vec<SessionId>,

    /// Sessions moved to the backing store.
    pub evicted: Vec<SessionId>,

    /// Listener failures raised by expiration events.
    pub listener_failures: Vec<ListenerFailure>,

    /// Evictions that failed; those sessions stay in memory.
    pub eviction_errors: Vec<(SessionId, Error)>,

    /// Attributes left out of successful evictions because no codec could
    /// encode them.
    pub skipped: Vec<(SessionId, SkippedAttribute)>,
}

impl SweepReport {
    /// Whether the pass changed nothing and hit no errors.
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty()
            && self.evicted.is_empty()
            && self.listener_failures.is_empty()
            && self.eviction_errors.is_empty()
            && self.skipped.is_empty()
    }

    fn record_eviction(&mut self, id: SessionId, eviction: EvictionReport) {
        self.skipped
            .extend(eviction.skipped.into_iter().map(|s| (id.clone(), s)));
        self.evicted.push(id);
    }
}

/// Concurrency-safe mapping from session identity to session record.
///
/// The store provides:
/// - single-flight creation and reconstruction per identity
/// - per-record read/write locking of attributes
/// - transparent eviction to, and reconstruction from, a backing store
/// - synchronous, ordered lifecycle notifications
///
/// All operations are synchronous and may be called from any number of
/// threads. Listener callbacks run while the store holds the identity's
/// resolution gate, so a listener must not resolve, evict or invalidate
/// the session it is being notified about. Other sessions may be used
/// freely; capacity eviction passes over any session whose gate is held.
pub struct SessionStore {
    /// Resident sessions. Held only for lookups and map updates.
    sessions: RwLock<HashMap<SessionId, Arc<SessionRecord>>>,

    /// Per-identity resolution gates for single-flight create/load/evict.
    gates: Mutex<HashMap<SessionId, Gate>>,

    /// Identities that must never be reconstructed.
    retired: Mutex<LruCache<SessionId, ()>>,

    bridge: EvictionBridge,
    listeners: Arc<ListenerRegistry>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    policy: ExpiryPolicy,
    config: StoreConfig,
}

impl SessionStore {
    /// Create a store with an in-memory backing store, the system clock,
    /// UUID identities, the default codecs and no listeners.
    pub fn new(config: StoreConfig) -> Self {
        let retired_cap = NonZeroUsize::new(config.retired_capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            sessions: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            retired: Mutex::new(LruCache::new(retired_cap)),
            bridge: EvictionBridge::new(
                Arc::new(CodecRegistry::with_defaults()),
                Arc::new(MemoryBackingStore::new()),
            ),
            listeners: Arc::new(ListenerRegistry::new()),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidGenerator),
            policy: ExpiryPolicy::new(config.evict_after),
            config,
        }
    }

    /// Use a different backing store.
    pub fn with_backing_store(mut self, backing: Arc<dyn BackingStore>) -> Self {
        self.bridge = EvictionBridge::new(Arc::clone(self.bridge.codecs()), backing);
        self
    }

    /// Use a shared codec registry.
    pub fn with_codecs(mut self, codecs: Arc<CodecRegistry>) -> Self {
        self.bridge = EvictionBridge::new(codecs, Arc::clone(self.bridge.backing()));
        self
    }

    /// Use a shared listener registry.
    pub fn with_listeners(mut self, listeners: Arc<ListenerRegistry>) -> Self {
        self.listeners = listeners;
        self
    }

    /// Use a different clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a different identity generator.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        self.bridge.codecs()
    }

    /// Number of sessions held in memory.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Whether the session is currently held in memory.
    pub fn is_resident(&self, id: &SessionId) -> bool {
        self.sessions.read().contains_key(id)
    }

    /// Identities of the sessions held in memory.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.read().keys().cloned().collect()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            resident: self.len(),
            capacity: self.config.max_in_memory,
            retired: self.retired.lock().len(),
            listeners: self.listeners.len(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────

    /// Resolve the requested session, or create a new one.
    ///
    /// A live or reconstructable session is returned as is. Otherwise a new
    /// session with a freshly minted identity is created and listeners are
    /// notified before this returns. Concurrent calls presenting the same
    /// unknown identity create exactly one session and all observe it. A
    /// later call presenting that identity again gets another new session.
    ///
    /// If listeners fail on the creation event, or on the expiry of the
    /// requested session, the returned session still exists; the failures
    /// are returned as [`Error::ListenerFailure`] naming it.
    pub fn resolve_or_create(
        &self,
        requested: Option<&SessionId>,
    ) -> Result<(SessionId, Arc<SessionRecord>)> {
        let Some(requested) = requested else {
            let (record, failures) = self.create_session(None);
            return self.finish_resolution(record, failures);
        };

        if let Some(record) = self.live_unexpired(requested) {
            record.touch(self.clock.now());
            return Ok((record.id().clone(), record));
        }

        let mut failures = Vec::new();
        let resolution = self.with_gate_slot(requested, |replacement| -> Result<Resolution> {
            if let Some(record) = self.locate_gated(requested, &mut failures)? {
                return Ok(Resolution::Existing(record));
            }

            // Set by a caller that queued on this gate before us.
            if let Some(winner) = replacement.clone() {
                let located = self.with_gate(&winner, || self.locate_gated(&winner, &mut failures))?;
                if let Some(record) = located {
                    trace!(
                        requested = %requested,
                        session_id = %winner,
                        "Requested session already replaced"
                    );
                    return Ok(Resolution::Existing(record));
                }
            }

            let (record, created) = self.create_session(Some(requested));
            failures.extend(created);
            *replacement = Some(record.id().clone());
            Ok(Resolution::Created(record))
        })?;

        let record = match resolution {
            Resolution::Existing(record) => {
                record.touch(self.clock.now());
                record
            }
            Resolution::Created(record) => record,
        };
        self.finish_resolution(record, failures)
    }

    /// Resolve an existing session without creating one.
    pub fn resolve(&self, id: &SessionId) -> Result<Arc<SessionRecord>> {
        let record = self.require(id)?;
        record.touch(self.clock.now());
        Ok(record)
    }

    fn finish_resolution(
        &self,
        record: Arc<SessionRecord>,
        failures: Vec<ListenerFailure>,
    ) -> Result<(SessionId, Arc<SessionRecord>)> {
        self.enforce_capacity(Some(record.id()));

        if failures.is_empty() {
            Ok((record.id().clone(), record))
        } else {
            Err(Error::ListenerFailure {
                session_id: record.id().clone(),
                failures,
            })
        }
    }

    /// Mint, insert and announce a new session.
    fn create_session(&self, replaces: Option<&SessionId>) -> (Arc<SessionRecord>, Vec<ListenerFailure>) {
        let id = self.ids.generate();

        self.with_gate(&id, || {
            let now = self.clock.now();
            let record = Arc::new(SessionRecord::new(id.clone(), now, self.config.max_inactive));
            self.sessions.write().insert(id.clone(), Arc::clone(&record));

            if let Some(old) = replaces {
                self.retired.lock().put(old.clone(), ());
            }

            debug!(
                session_id = %id,
                replaces = ?replaces.map(SessionId::as_str),
                resident = self.len(),
                "Session created"
            );

            let failures = self
                .listeners
                .notify_created(&SessionEvent::created(id.clone(), now));
            (record, failures)
        })
    }

    /// Live record that has not outlived its inactive interval.
    fn live_unexpired(&self, id: &SessionId) -> Option<Arc<SessionRecord>> {
        let record = self.sessions.read().get(id).cloned()?;
        (!self.is_expired(&record)).then_some(record)
    }

    fn is_expired(&self, record: &SessionRecord) -> bool {
        self.policy
            .is_expired(record.last_accessed_at(), record.max_inactive(), self.clock.now())
    }

    /// Find a live session, reconstructing it if it was evicted.
    fn require(&self, id: &SessionId) -> Result<Arc<SessionRecord>> {
        if let Some(record) = self.live_unexpired(id) {
            return Ok(record);
        }

        let mut failures = Vec::new();
        match self.with_gate(id, || self.locate_gated(id, &mut failures))? {
            Some(record) => {
                self.enforce_capacity(Some(id));
                Ok(record)
            }
            None => Err(not_found(id, failures)),
        }
    }

    /// Slow path of [`require`](Self::require). Caller holds the gate for
    /// `id`. Listener failures from expiring the session land in `failures`.
    fn locate_gated(
        &self,
        id: &SessionId,
        failures: &mut Vec<ListenerFailure>,
    ) -> Result<Option<Arc<SessionRecord>>> {
        let resident = self.sessions.read().get(id).cloned();
        if let Some(record) = resident {
            if !self.is_expired(&record) {
                return Ok(Some(record));
            }
            failures.extend(self.destroy_gated(&record, DestroyReason::Expired));
            return Ok(None);
        }

        if self.retired.lock().contains(id) {
            return Ok(None);
        }

        let reconstructed = match self.bridge.load(id) {
            Ok(Some(r)) => r,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(session_id = %id, error = %e, "Failed to read session from backing store");
                return Err(Error::UnknownSession(id.clone()));
            }
        };

        let now = self.clock.now();
        if self
            .policy
            .is_expired(reconstructed.last_accessed_at, reconstructed.max_inactive, now)
        {
            debug!(session_id = %id, "Persisted session expired");
            self.discard_blob(id);
            self.retired.lock().put(id.clone(), ());
            failures.extend(self.listeners.notify_destroyed(&SessionEvent::destroyed(
                id.clone(),
                DestroyReason::Expired,
                now,
            )));
            return Ok(None);
        }

        let record = Arc::new(reconstructed.into_record(now));
        self.sessions.write().insert(id.clone(), Arc::clone(&record));
        Ok(Some(record))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Attributes
    // ─────────────────────────────────────────────────────────────────────

    /// Run `f` under the record's shared lock. Touches the session.
    fn read_state<R>(&self, id: &SessionId, f: impl Fn(&RecordState) -> R) -> Result<R> {
        loop {
            let record = self.require(id)?;
            let state = record.read();
            if record.is_detached() {
                continue;
            }
            record.touch(self.clock.now());
            return Ok(f(&state));
        }
    }

    /// Run `f` under the record's exclusive lock. Touches the session.
    fn write_state<R>(&self, id: &SessionId, f: impl FnOnce(&mut RecordState) -> R) -> Result<R> {
        loop {
            let record = self.require(id)?;
            let mut state = record.write();
            if record.is_detached() {
                continue;
            }
            record.touch(self.clock.now());
            return Ok(f(&mut state));
        }
    }

    /// Add or replace an attribute.
    ///
    /// The returned outcome tells whether the name was new. Concurrent puts
    /// of the same name are applied one at a time; the surviving value is
    /// the one applied last.
    pub fn put_attribute(
        &self,
        id: &SessionId,
        name: impl Into<String>,
        value: AttributeValue,
    ) -> Result<PutOutcome> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidAttributeName(name));
        }
        trace!(session_id = %id, attribute = %name, value_type = value.type_name(), "put");
        self.write_state(id, move |state| state.put(name, value))
    }

    /// Current value of an attribute.
    pub fn get_attribute(&self, id: &SessionId, name: &str) -> Result<Option<AttributeValue>> {
        trace!(session_id = %id, attribute = %name, "get");
        self.read_state(id, |state| state.attributes.get(name).map(|e| e.value.clone()))
    }

    /// Remove an attribute, returning its value.
    pub fn remove_attribute(&self, id: &SessionId, name: &str) -> Result<Option<AttributeValue>> {
        trace!(session_id = %id, attribute = %name, "remove");
        self.write_state(id, |state| state.remove(name))
    }

    /// Names of all attributes currently set.
    pub fn attribute_names(&self, id: &SessionId) -> Result<BTreeSet<String>> {
        self.read_state(id, |state| state.attributes.keys().cloned().collect())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Metadata
    // ─────────────────────────────────────────────────────────────────────

    /// When the session was created. Does not count as an access.
    pub fn creation_time(&self, id: &SessionId) -> Result<DateTime<Utc>> {
        Ok(self.require(id)?.created_at())
    }

    /// When the session was last accessed. Does not count as an access.
    pub fn last_access_time(&self, id: &SessionId) -> Result<DateTime<Utc>> {
        Ok(self.require(id)?.last_accessed_at())
    }

    /// Inactivity after which the session expires.
    pub fn max_inactive_interval(&self, id: &SessionId) -> Result<Option<Duration>> {
        Ok(self.require(id)?.max_inactive())
    }

    /// Change the session's maximum inactive interval (`None` = never expire).
    pub fn set_max_inactive_interval(&self, id: &SessionId, max_inactive: Option<Duration>) -> Result<()> {
        self.require(id)?.set_max_inactive(max_inactive);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Invalidation
    // ─────────────────────────────────────────────────────────────────────

    /// Destroy a session and notify listeners.
    ///
    /// The identity can never be resolved again. Invalidating an unknown or
    /// already invalidated session fails with [`Error::UnknownSession`] and
    /// notifies nobody.
    pub fn invalidate(&self, id: &SessionId) -> Result<()> {
        let failures = self.with_gate(id, || -> Result<Vec<ListenerFailure>> {
            let mut expired = Vec::new();
            let Some(record) = self.locate_gated(id, &mut expired)? else {
                return Err(not_found(id, expired));
            };
            Ok(self.destroy_gated(&record, DestroyReason::Invalidated))
        })?;

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::ListenerFailure {
                session_id: id.clone(),
                failures,
            })
        }
    }

    /// Release a record for good. Caller holds the gate for its identity.
    fn destroy_gated(&self, record: &Arc<SessionRecord>, reason: DestroyReason) -> Vec<ListenerFailure> {
        let id = record.id().clone();
        {
            let mut state = record.write();
            record.detach();
            state.attributes.clear();
            self.sessions.write().remove(&id);
        }

        self.discard_blob(&id);
        self.retired.lock().put(id.clone(), ());

        debug!(session_id = %id, reason = ?reason, "Session destroyed");

        self.listeners
            .notify_destroyed(&SessionEvent::destroyed(id, reason, self.clock.now()))
    }

    fn discard_blob(&self, id: &SessionId) {
        if let Err(e) = self.bridge.discard(id) {
            warn!(session_id = %id, error = %e, "Failed to delete persisted session");
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Eviction
    // ─────────────────────────────────────────────────────────────────────

    /// Move a resident session to the backing store.
    ///
    /// The session stays alive and is reconstructed on its next access. No
    /// lifecycle event is fired. If the backing store write fails the
    /// session stays resident with its changes still pending.
    pub fn evict(&self, id: &SessionId) -> Result<EvictionReport> {
        self.with_gate(id, || {
            let record = self
                .sessions
                .read()
                .get(id)
                .cloned()
                .ok_or_else(|| Error::UnknownSession(id.clone()))?;
            self.evict_gated(&record)
        })
    }

    /// Evict every resident session. Returns the identities evicted.
    pub fn evict_all(&self) -> Vec<SessionId> {
        let mut evicted = Vec::new();
        for id in self.session_ids() {
            match self.evict(&id) {
                Ok(_) => evicted.push(id),
                Err(Error::UnknownSession(_)) => {}
                Err(e) => warn!(session_id = %id, error = %e, "Eviction failed"),
            }
        }
        evicted
    }

    /// Caller holds the gate for the record's identity.
    fn evict_gated(&self, record: &Arc<SessionRecord>) -> Result<EvictionReport> {
        let mut state = record.write();
        if record.is_detached() {
            return Err(Error::UnknownSession(record.id().clone()));
        }

        let report = self.bridge.persist(record, &mut state)?;
        record.detach();
        self.sessions.write().remove(record.id());

        debug!(
            session_id = %record.id(),
            skipped = report.skipped.len(),
            resident = self.len(),
            "Session evicted"
        );

        Ok(report)
    }

    /// Evict least recently accessed sessions until within capacity.
    ///
    /// Sessions whose gate is held, by this thread or another, are passed
    /// over.
    fn enforce_capacity(&self, keep: Option<&SessionId>) -> Vec<(SessionId, EvictionReport)> {
        let over = self.len().saturating_sub(self.config.max_in_memory);
        if over == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<Arc<SessionRecord>> = self
            .sessions
            .read()
            .values()
            .filter(|r| Some(r.id()) != keep)
            .cloned()
            .collect();
        candidates.sort_by_key(|r| r.last_accessed_at());

        let mut evicted = Vec::new();
        for record in candidates {
            if evicted.len() == over {
                break;
            }
            let id = record.id().clone();
            let result = self.try_with_gate(&id, || {
                if !self.is_current(&record) {
                    return Ok(None);
                }
                debug!(session_id = %id, "Evicting least recently used session to make room");
                self.evict_gated(&record).map(Some)
            });
            match result {
                Some(Ok(Some(report))) => evicted.push((id, report)),
                Some(Ok(None)) => {}
                Some(Err(e)) => warn!(session_id = %id, error = %e, "Capacity eviction failed"),
                None => trace!(session_id = %id, "Session busy, not evicting"),
            }
        }
        evicted
    }

    /// Whether `record` is still the resident record for its identity.
    fn is_current(&self, record: &Arc<SessionRecord>) -> bool {
        self.sessions
            .read()
            .get(record.id())
            .is_some_and(|r| Arc::ptr_eq(r, record))
    }

    /// Expire and evict idle sessions, then enforce capacity.
    pub fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let candidates: Vec<Arc<SessionRecord>> = self.sessions.read().values().cloned().collect();

        for record in candidates {
            let now = self.clock.now();
            let id = record.id().clone();
            match self
                .policy
                .classify(record.last_accessed_at(), record.max_inactive(), now)
            {
                Disposition::Keep => {}
                Disposition::Expire => {
                    let failures = self.with_gate(&id, || {
                        if !self.is_current(&record) || !self.is_expired(&record) {
                            return None;
                        }
                        Some(self.destroy_gated(&record, DestroyReason::Expired))
                    });
                    if let Some(failures) = failures {
                        report.expired.push(id);
                        report.listener_failures.extend(failures);
                    }
                }
                Disposition::Evict => {
                    let result = self.with_gate(&id, || {
                        let now = self.clock.now();
                        let still_idle = self.policy.classify(
                            record.last_accessed_at(),
                            record.max_inactive(),
                            now,
                        ) == Disposition::Evict;
                        if !self.is_current(&record) || !still_idle {
                            return Ok(None);
                        }
                        self.evict_gated(&record).map(Some)
                    });
                    match result {
                        Ok(Some(eviction)) => report.record_eviction(id, eviction),
                        Ok(None) => {}
                        Err(e) => {
                            warn!(session_id = %id, error = %e, "Idle eviction failed");
                            report.eviction_errors.push((id, e));
                        }
                    }
                }
            }
        }

        for (id, eviction) in self.enforce_capacity(None) {
            report.record_eviction(id, eviction);
        }

        if !report.is_empty() {
            debug!(
                expired = report.expired.len(),
                evicted = report.evicted.len(),
                skipped = report.skipped.len(),
                errors = report.eviction_errors.len(),
                resident = self.len(),
                "Session sweep complete"
            );
        }

        report
    }

    // ─────────────────────────────────────────────────────────────────────
    // Gates
    // ─────────────────────────────────────────────────────────────────────

    /// Run `f` while holding the resolution gate for `id`.
    ///
    /// Gates are created on demand and dropped when their last user leaves.
    fn with_gate<R>(&self, id: &SessionId, f: impl FnOnce() -> R) -> R {
        self.with_gate_slot(id, |_| f())
    }

    /// [`with_gate`](Self::with_gate), also handing `f` the gate's slot.
    /// The slot lives only as long as the gate, so it is seen by callers
    /// already queued behind this one and by nobody after.
    fn with_gate_slot<R>(&self, id: &SessionId, f: impl FnOnce(&mut Option<SessionId>) -> R) -> R {
        let gate = self.acquire_gate(id);
        let result = {
            let mut slot = gate.lock();
            f(&mut slot)
        };
        self.release_gate(id, gate);
        result
    }

    /// Like [`with_gate`](Self::with_gate), but returns `None` instead of
    /// waiting when the gate is held.
    fn try_with_gate<R>(&self, id: &SessionId, f: impl FnOnce() -> R) -> Option<R> {
        let gate = self.acquire_gate(id);
        let result = gate.try_lock().map(|_held| f());
        self.release_gate(id, gate);
        result
    }

    fn acquire_gate(&self, id: &SessionId) -> Gate {
        Arc::clone(self.gates.lock().entry(id.clone()).or_default())
    }

    fn release_gate(&self, id: &SessionId, gate: Gate) {
        let mut gates = self.gates.lock();
        drop(gate);
        if gates.get(id).is_some_and(|g| Arc::strong_count(g) == 1) {
            gates.remove(id);
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("resident", &self.len())
            .field("config", &self.config)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

/// Per-identity gate. The slot names the session created for an unknown
/// identity while other callers presenting it are queued.
type Gate = Arc<Mutex<Option<SessionId>>>;

enum Resolution {
    Existing(Arc<SessionRecord>),
    Created(Arc<SessionRecord>),
}

/// Error for an identity that resolved to nothing. Listener failures from
/// expiring it on the way take precedence.
fn not_found(id: &SessionId, failures: Vec<ListenerFailure>) -> Error {
    if failures.is_empty() {
        Error::UnknownSession(id.clone())
    } else {
        Error::ListenerFailure {
            session_id: id.clone(),
            failures,
        }
    }
}
