//! Configuration types.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use coffer_session::{
    BackingStore, FileBackingStore, HasSessionConfig, MemoryBackingStore, StoreConfig,
};

use crate::error::{ConfigError, Result};

/// Root configuration.
///
/// ```toml
/// [session]
/// max_in_memory = 10000
/// max_inactive_secs = 1800
///
/// [storage]
/// backend = "file"
/// path = "/var/lib/coffer/sessions"
///
/// [logging]
/// level = "info"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CofferConfig {
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl CofferConfig {
    /// Create a config with every section at its defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check values that parse but cannot work.
    pub fn validate(&self) -> Result<()> {
        self.session.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Session store configuration.
///
/// Durations are in seconds; `0` disables expiry (`max_inactive_secs`) or
/// idle eviction (`evict_idle_secs`).
///
/// ```toml
/// [session]
/// max_in_memory = 10000
/// max_inactive_secs = 1800
/// evict_idle_secs = 300
/// enable_cleanup_task = true
/// cleanup_interval_secs = 60
/// retired_capacity = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of sessions kept in memory.
    pub max_in_memory: usize,
    /// Default inactivity before a session expires.
    pub max_inactive_secs: u64,
    /// Idle time before a session is moved to storage.
    pub evict_idle_secs: u64,
    /// Whether the background sweep runs.
    pub enable_cleanup_task: bool,
    /// Interval in seconds between sweeps.
    pub cleanup_interval_secs: u64,
    /// Number of invalidated identities remembered.
    pub retired_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let defaults = StoreConfig::default();
        Self {
            max_in_memory: defaults.max_in_memory,
            max_inactive_secs: defaults.max_inactive.map_or(0, |d| d.as_secs()),
            evict_idle_secs: defaults.evict_after.map_or(0, |d| d.as_secs()),
            enable_cleanup_task: defaults.enable_cleanup_task,
            cleanup_interval_secs: defaults.cleanup_interval.as_secs(),
            retired_capacity: defaults.retired_capacity,
        }
    }
}

impl SessionConfig {
    fn validate(&self) -> Result<()> {
        if self.max_in_memory == 0 {
            return Err(ConfigError::Invalid {
                field: "session.max_in_memory".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.enable_cleanup_task && self.cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "session.cleanup_interval_secs".to_string(),
                reason: "must be positive while the cleanup task is enabled".to_string(),
            });
        }
        if self.max_inactive_secs > 0 && self.evict_idle_secs >= self.max_inactive_secs {
            tracing::warn!(
                evict_idle_secs = self.evict_idle_secs,
                max_inactive_secs = self.max_inactive_secs,
                "Sessions expire before they become idle enough to evict"
            );
        }
        Ok(())
    }

    /// Store configuration for these settings.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::from_provider(self)
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

impl HasSessionConfig for SessionConfig {
    fn max_in_memory(&self) -> usize {
        self.max_in_memory
    }

    fn max_inactive(&self) -> Option<Duration> {
        secs(self.max_inactive_secs)
    }

    fn evict_after(&self) -> Option<Duration> {
        secs(self.evict_idle_secs)
    }

    fn cleanup_enabled(&self) -> bool {
        self.enable_cleanup_task
    }

    fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    fn retired_capacity(&self) -> usize {
        self.retired_capacity
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Where evicted sessions go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory; lost on restart.
    #[default]
    Memory,
    /// One file per session under `path`.
    File,
}

/// Backing store configuration.
///
/// ```toml
/// [storage]
/// backend = "file"
/// path = "/var/lib/coffer/sessions"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for the `file` backend.
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    fn validate(&self) -> Result<()> {
        if self.backend == StorageBackend::File && self.path.is_none() {
            return Err(ConfigError::MissingField {
                field: "path".to_string(),
                context: "[storage] with backend = \"file\"".to_string(),
            });
        }
        Ok(())
    }

    /// Open the configured backing store.
    pub fn open_backing_store(&self) -> Result<Arc<dyn BackingStore>> {
        self.validate()?;
        match (&self.backend, &self.path) {
            (StorageBackend::File, Some(path)) => Ok(Arc::new(FileBackingStore::open(path)?)),
            _ => Ok(Arc::new(MemoryBackingStore::new())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration.
///
/// `level` is an `EnvFilter` directive; `RUST_LOG` takes precedence.
///
/// ```toml
/// [logging]
/// level = "coffer_session=debug,info"
/// json = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
