//! Idle-time classification for expiration and eviction.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// What the sweep should do with a resident session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Leave it in memory.
    Keep,
    /// Move it to the backing store; the session stays alive.
    Evict,
    /// Destroy it; it has been inactive past its limit.
    Expire,
}

/// Decides expiration and idle eviction from last-access times.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpiryPolicy {
    /// Idle time before eviction (None means no idle eviction).
    evict_after: Option<Duration>,
}

impl ExpiryPolicy {
    pub fn new(evict_after: Option<Duration>) -> Self {
        Self { evict_after }
    }

    pub fn evict_after(&self) -> Option<Duration> {
        self.evict_after
    }

    /// Whether a session last accessed at `last_access` has outlived
    /// `max_inactive` at `now`.
    pub fn is_expired(
        &self,
        last_access: DateTime<Utc>,
        max_inactive: Option<Duration>,
        now: DateTime<Utc>,
    ) -> bool {
        match max_inactive {
            None => false,
            Some(limit) => idle_time(last_access, now) > limit,
        }
    }

    /// Classify a session. Expiration takes precedence over eviction.
    pub fn classify(
        &self,
        last_access: DateTime<Utc>,
        max_inactive: Option<Duration>,
        now: DateTime<Utc>,
    ) -> Disposition {
        if self.is_expired(last_access, max_inactive, now) {
            return Disposition::Expire;
        }
        match self.evict_after {
            Some(idle) if idle_time(last_access, now) > idle => Disposition::Evict,
            _ => Disposition::Keep,
        }
    }
}

/// Elapsed time since `last_access`; zero when the clock went backwards.
pub fn idle_time(last_access: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - last_access).to_std().unwrap_or_default()
}
