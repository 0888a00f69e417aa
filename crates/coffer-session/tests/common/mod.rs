//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use coffer_session::{
    BackingStore, Error, ListenerError, ManualClock, MemoryBackingStore, Result, SessionEvent,
    SessionEventKind, SessionId, SessionListener, SessionStore, StoreConfig,
};

/// Listener that records every event it sees, in order.
#[derive(Default)]
pub struct RecordingListener {
    name: String,
    history: Mutex<Vec<(SessionEventKind, SessionId)>>,
}

impl RecordingListener {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            history: Mutex::new(Vec::new()),
        })
    }

    pub fn history(&self) -> Vec<(SessionEventKind, SessionId)> {
        self.history.lock().clone()
    }

    pub fn created(&self) -> Vec<SessionId> {
        self.history
            .lock()
            .iter()
            .filter(|(kind, _)| *kind == SessionEventKind::Created)
            .map(|(_, id)| id.clone())
            .collect()
    }

    pub fn destroyed(&self) -> Vec<SessionId> {
        self.history
            .lock()
            .iter()
            .filter(|(kind, _)| matches!(kind, SessionEventKind::Destroyed(_)))
            .map(|(_, id)| id.clone())
            .collect()
    }
}

impl SessionListener for RecordingListener {
    fn session_created(&self, event: &SessionEvent) -> std::result::Result<(), ListenerError> {
        self.history.lock().push((event.kind, event.session_id.clone()));
        Ok(())
    }

    fn session_destroyed(&self, event: &SessionEvent) -> std::result::Result<(), ListenerError> {
        self.history.lock().push((event.kind, event.session_id.clone()));
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Listener whose callbacks always fail.
pub struct FailingListener;

impl SessionListener for FailingListener {
    fn session_created(&self, _event: &SessionEvent) -> std::result::Result<(), ListenerError> {
        Err("refusing creation".into())
    }

    fn session_destroyed(&self, _event: &SessionEvent) -> std::result::Result<(), ListenerError> {
        Err("refusing destruction".into())
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Listener that stalls in its creation callback, keeping the creating
/// caller inside the store.
pub struct SlowListener(pub Duration);

impl SessionListener for SlowListener {
    fn session_created(&self, _event: &SessionEvent) -> std::result::Result<(), ListenerError> {
        std::thread::sleep(self.0);
        Ok(())
    }

    fn name(&self) -> &str {
        "slow"
    }
}

/// In-memory backing store whose reads and writes can be made to fail.
#[derive(Default)]
pub struct FlakyBackingStore {
    inner: MemoryBackingStore,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl FlakyBackingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.inner.contains(id)
    }
}

impl BackingStore for FlakyBackingStore {
    fn write(&self, id: &SessionId, blob: &[u8]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Persistence("disk full".to_string()));
        }
        self.inner.write(id, blob)
    }

    fn read(&self, id: &SessionId) -> Result<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Persistence("backing store unreachable".to_string()));
        }
        self.inner.read(id)
    }

    fn delete(&self, id: &SessionId) -> Result<()> {
        self.inner.delete(id)
    }
}

/// A store wired with a manual clock, a recording listener and a flaky
/// backing store.
pub struct TestStore {
    pub store: Arc<SessionStore>,
    pub clock: Arc<ManualClock>,
    pub listener: Arc<RecordingListener>,
    pub backing: Arc<FlakyBackingStore>,
}

impl TestStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::new().with_cleanup_task(false))
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let clock = Arc::new(ManualClock::default());
        let listener = RecordingListener::new("recorder");
        let backing = FlakyBackingStore::new();

        let store = SessionStore::new(config)
            .with_clock(clock.clone())
            .with_backing_store(backing.clone());
        store.listeners().register(listener.clone());

        Self {
            store: Arc::new(store),
            clock,
            listener,
            backing,
        }
    }
}

/// Install a test subscriber so `RUST_LOG` shows engine logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
