//! Concurrent session store with eviction, attribute codecs and lifecycle
//! listeners.
//!
//! This crate provides the engine behind a session cache:
//! - A thread-safe store of sessions with typed, per-session attributes
//! - Single-flight creation and reconstruction per session identity
//! - Eviction of idle or excess sessions to a [`BackingStore`], with
//!   per-attribute codec failure isolation
//! - Synchronous, ordered [`SessionListener`] notifications
//!
//! # Example
//!
//! ```rust,ignore
//! use coffer_session::{AttributeValue, SessionStore, StoreConfig};
//!
//! let store = SessionStore::new(StoreConfig::default().with_max_in_memory(1000));
//!
//! let (id, _record) = store.resolve_or_create(None)?;
//! store.put_attribute(&id, "user", AttributeValue::new(String::from("alice")))?;
//!
//! store.evict(&id)?;
//! let user = store.get_attribute(&id, "user")?;
//! ```

mod backing;
mod cleanup;
mod clock;
mod codec;
mod config;
mod error;
mod id;
mod listener;
mod persistence;
mod record;
mod store;
mod ttl;

pub use backing::{BackingStore, FileBackingStore, MemoryBackingStore};
pub use cleanup::spawn_cleanup_task;
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{AttributeCodec, AttributeValue, CodecError, CodecRegistry, EncodedAttribute, JsonCodec};
pub use config::{
    DEFAULT_EVICT_AFTER, DEFAULT_MAX_INACTIVE, DEFAULT_MAX_IN_MEMORY, DEFAULT_RETIRED_CAPACITY,
    HasSessionConfig, StoreConfig,
};
pub use error::{Error, Result};
pub use id::{IdGenerator, SessionId, UuidGenerator};
pub use listener::{
    DestroyReason, ListenerError, ListenerFailure, ListenerRegistry, SessionEvent,
    SessionEventKind, SessionListener,
};
pub use persistence::{EvictionBridge, EvictionReport, Reconstructed, SkippedAttribute};
pub use record::{AttributeEntry, PutOutcome, RecordState, SessionRecord};
pub use store::{SessionStore, StoreStats, SweepReport};
pub use ttl::{Disposition, ExpiryPolicy, idle_time};
