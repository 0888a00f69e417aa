//! Configuration for the session store.

use std::time::Duration;

/// Default maximum number of sessions held in memory before the least
/// recently accessed ones are evicted to the backing store.
pub const DEFAULT_MAX_IN_MEMORY: usize = 10_000;

/// Default inactivity after which a session expires (30 minutes).
pub const DEFAULT_MAX_INACTIVE: Option<Duration> = Some(Duration::from_secs(1800));

/// Default idle time after which a session is evicted (none).
pub const DEFAULT_EVICT_AFTER: Option<Duration> = None;

/// Default number of retired identities remembered.
pub const DEFAULT_RETIRED_CAPACITY: usize = 10_000;

/// Configuration for the session store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of sessions kept in memory.
    pub max_in_memory: usize,

    /// Default maximum inactive interval for new sessions.
    /// Sessions idle longer than this are destroyed.
    pub max_inactive: Option<Duration>,

    /// Idle time after which a session is moved to the backing store.
    pub evict_after: Option<Duration>,

    /// Whether to run the periodic sweep task.
    pub enable_cleanup_task: bool,

    /// Interval for the sweep task (if enabled).
    pub cleanup_interval: Duration,

    /// How many invalidated or replaced identities to remember so they are
    /// never reconstructed.
    pub retired_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_in_memory: DEFAULT_MAX_IN_MEMORY,
            max_inactive: DEFAULT_MAX_INACTIVE,
            evict_after: DEFAULT_EVICT_AFTER,
            enable_cleanup_task: true,
            cleanup_interval: Duration::from_secs(60),
            retired_capacity: DEFAULT_RETIRED_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from any session config provider.
    pub fn from_provider<C: HasSessionConfig>(provider: &C) -> Self {
        Self {
            max_in_memory: provider.max_in_memory(),
            max_inactive: provider.max_inactive(),
            evict_after: provider.evict_after(),
            enable_cleanup_task: provider.cleanup_enabled(),
            cleanup_interval: provider.cleanup_interval(),
            retired_capacity: provider.retired_capacity(),
        }
    }

    /// Set the maximum number of in-memory sessions.
    pub fn with_max_in_memory(mut self, max: usize) -> Self {
        self.max_in_memory = max;
        self
    }

    /// Set the default maximum inactive interval.
    pub fn with_max_inactive(mut self, max_inactive: Duration) -> Self {
        self.max_inactive = Some(max_inactive);
        self
    }

    /// Sessions never expire from inactivity.
    pub fn without_max_inactive(mut self) -> Self {
        self.max_inactive = None;
        self
    }

    /// Evict sessions idle for longer than `idle`.
    pub fn with_evict_after(mut self, idle: Duration) -> Self {
        self.evict_after = Some(idle);
        self
    }

    /// Enable or disable the background cleanup task.
    pub fn with_cleanup_task(mut self, enabled: bool) -> Self {
        self.enable_cleanup_task = enabled;
        self
    }

    /// Set the cleanup interval.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Set how many retired identities are remembered.
    pub fn with_retired_capacity(mut self, capacity: usize) -> Self {
        self.retired_capacity = capacity;
        self
    }
}

/// Session store configuration capability.
///
/// Lets configuration types owned by other crates drive the store without
/// this crate knowing their layout.
pub trait HasSessionConfig: Clone + Send + Sync + 'static {
    /// Maximum number of sessions kept in memory.
    fn max_in_memory(&self) -> usize;

    /// Default maximum inactive interval (None = never expire).
    fn max_inactive(&self) -> Option<Duration> {
        DEFAULT_MAX_INACTIVE
    }

    /// Idle time before eviction (None = only capacity-driven eviction).
    fn evict_after(&self) -> Option<Duration> {
        None
    }

    /// Whether the sweep task runs.
    fn cleanup_enabled(&self) -> bool {
        true
    }

    /// Interval between sweeps.
    fn cleanup_interval(&self) -> Duration;

    /// Number of retired identities remembered.
    fn retired_capacity(&self) -> usize {
        DEFAULT_RETIRED_CAPACITY
    }
}

impl HasSessionConfig for StoreConfig {
    fn max_in_memory(&self) -> usize {
        self.max_in_memory
    }

    fn max_inactive(&self) -> Option<Duration> {
        self.max_inactive
    }

    fn evict_after(&self) -> Option<Duration> {
        self.evict_after
    }

    fn cleanup_enabled(&self) -> bool {
        self.enable_cleanup_task
    }

    fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }

    fn retired_capacity(&self) -> usize {
        self.retired_capacity
    }
}
