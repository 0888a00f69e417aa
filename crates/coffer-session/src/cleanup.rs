//! Periodic background sweep.

use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::store::SessionStore;

/// Spawn a task that calls [`SessionStore::sweep`] every
/// `cleanup_interval`.
///
/// Returns `None` when the cleanup task is disabled in the store's config
/// or the interval is zero. The task holds only a weak reference and stops
/// on its own once the store is dropped. Must be called from within a
/// tokio runtime.
pub fn spawn_cleanup_task(store: &Arc<SessionStore>) -> Option<JoinHandle<()>> {
    let config = store.config();
    if !config.enable_cleanup_task {
        return None;
    }
    let period = config.cleanup_interval;
    if period.is_zero() {
        warn!("Session cleanup interval is zero, not starting cleanup task");
        return None;
    }

    let weak: Weak<SessionStore> = Arc::downgrade(store);
    debug!(interval_ms = period.as_millis() as u64, "Starting session cleanup task");

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let Some(store) = weak.upgrade() else {
                debug!("Session store dropped, stopping cleanup task");
                break;
            };

            match tokio::task::spawn_blocking(move || store.sweep()).await {
                Ok(report) => {
                    if !report.is_empty() {
                        debug!(
                            expired = report.expired.len(),
                            evicted = report.evicted.len(),
                            "Background sweep"
                        );
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Session sweep panicked or was cancelled");
                }
            }
        }
    }))
}
