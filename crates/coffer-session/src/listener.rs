//! Session lifecycle listeners.
//!
//! Listeners are held in registration order and notified synchronously.
//! Notification works on a snapshot of the list, so registering a listener
//! while events are being delivered never blocks delivery.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{trace, warn};

use crate::id::SessionId;

/// Error type returned by listener callbacks.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Why a session was destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyReason {
    /// Explicitly invalidated by a caller.
    Invalidated,
    /// Idle past its maximum inactive interval.
    Expired,
}

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    Created,
    Destroyed(DestroyReason),
}

impl fmt::Display for SessionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Destroyed(DestroyReason::Invalidated) => f.write_str("destroyed (invalidated)"),
            Self::Destroyed(DestroyReason::Expired) => f.write_str("destroyed (expired)"),
        }
    }
}

/// A lifecycle event delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub session_id: SessionId,
    pub kind: SessionEventKind,
    pub at: DateTime<Utc>,
}

impl SessionEvent {
    pub fn created(session_id: SessionId, at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            kind: SessionEventKind::Created,
            at,
        }
    }

    pub fn destroyed(session_id: SessionId, reason: DestroyReason, at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            kind: SessionEventKind::Destroyed(reason),
            at,
        }
    }
}

/// Observer of session creation and destruction.
///
/// Both callbacks default to doing nothing. Returning an error does not stop
/// delivery to the listeners registered after this one.
pub trait SessionListener: Send + Sync {
    /// Called once when a session is created.
    fn session_created(&self, _event: &SessionEvent) -> Result<(), ListenerError> {
        Ok(())
    }

    /// Called once when a session is invalidated or expires.
    fn session_destroyed(&self, _event: &SessionEvent) -> Result<(), ListenerError> {
        Ok(())
    }

    /// Name used in failure reports.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A listener callback that returned an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    /// Listener name as reported by [`SessionListener::name`].
    pub listener: String,
    /// Position of the listener in registration order.
    pub position: usize,
    pub session_id: SessionId,
    pub event: SessionEventKind,
    pub message: String,
}

impl fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "listener #{} '{}' failed on {} for {}: {}",
            self.position, self.listener, self.event, self.session_id, self.message
        )
    }
}

type ListenerList = Arc<Vec<Arc<dyn SessionListener>>>;

/// Ordered set of lifecycle listeners.
///
/// The list is copy-on-write: registration swaps in a new vector and
/// notification iterates whichever snapshot was current when it started.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<ListenerList>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener.
    ///
    /// Registering the same `Arc` twice is a no-op and returns `false`.
    pub fn register(&self, listener: Arc<dyn SessionListener>) -> bool {
        let mut guard = self.listeners.write();
        if guard.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(listener);
        *guard = Arc::new(next);
        true
    }

    /// Remove a previously registered listener.
    pub fn unregister(&self, listener: &Arc<dyn SessionListener>) -> bool {
        let mut guard = self.listeners.write();
        let before = guard.len();
        let next: Vec<_> = guard
            .iter()
            .filter(|l| !same_listener(l, listener))
            .cloned()
            .collect();
        let removed = next.len() != before;
        *guard = Arc::new(next);
        removed
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    fn snapshot(&self) -> ListenerList {
        Arc::clone(&self.listeners.read())
    }

    /// Deliver a creation event to every listener in registration order.
    pub fn notify_created(&self, event: &SessionEvent) -> Vec<ListenerFailure> {
        self.dispatch(event, |l, e| l.session_created(e))
    }

    /// Deliver a destruction event to every listener in registration order.
    pub fn notify_destroyed(&self, event: &SessionEvent) -> Vec<ListenerFailure> {
        self.dispatch(event, |l, e| l.session_destroyed(e))
    }

    fn dispatch<F>(&self, event: &SessionEvent, deliver: F) -> Vec<ListenerFailure>
    where
        F: Fn(&dyn SessionListener, &SessionEvent) -> Result<(), ListenerError>,
    {
        let listeners = self.snapshot();
        let mut failures = Vec::new();

        for (position, listener) in listeners.iter().enumerate() {
            trace!(
                session_id = %event.session_id,
                event = %event.kind,
                listener = listener.name(),
                "Delivering session event"
            );
            // A panicking listener is reported like one that returned an error.
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| deliver(listener.as_ref(), event)));
            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };

            warn!(
                session_id = %event.session_id,
                event = %event.kind,
                listener = listener.name(),
                error = %message,
                "Session listener failed"
            );
            failures.push(ListenerFailure {
                listener: listener.name().to_string(),
                position,
                session_id: event.session_id.clone(),
                event: event.kind,
                message,
            });
        }

        failures
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .snapshot()
            .iter()
            .map(|l| l.name().to_string())
            .collect();
        f.debug_struct("ListenerRegistry")
            .field("listeners", &names)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

fn same_listener(a: &Arc<dyn SessionListener>, b: &Arc<dyn SessionListener>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct Journal {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl SessionListener for Journal {
        fn session_created(&self, event: &SessionEvent) -> Result<(), ListenerError> {
            self.log
                .lock()
                .push(format!("{}:created:{}", self.name, event.session_id));
            if self.fail {
                return Err("boom".into());
            }
            Ok(())
        }

        fn session_destroyed(&self, event: &SessionEvent) -> Result<(), ListenerError> {
            self.log
                .lock()
                .push(format!("{}:destroyed:{}", self.name, event.session_id));
            Ok(())
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn journal(name: &'static str, log: &Arc<Mutex<Vec<String>>>, fail: bool) -> Arc<dyn SessionListener> {
        Arc::new(Journal {
            name,
            log: Arc::clone(log),
            fail,
        })
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        registry.register(journal("one", &log, false));
        registry.register(journal("two", &log, false));

        let event = SessionEvent::created(SessionId::from("s1"), Utc::now());
        assert!(registry.notify_created(&event).is_empty());

        let event = SessionEvent::destroyed(SessionId::from("s1"), DestroyReason::Invalidated, Utc::now());
        assert!(registry.notify_destroyed(&event).is_empty());

        assert_eq!(
            *log.lock(),
            vec![
                "one:created:s1",
                "two:created:s1",
                "one:destroyed:s1",
                "two:destroyed:s1"
            ]
        );
    }

    #[test]
    fn test_failure_does_not_stop_delivery() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        registry.register(journal("bad", &log, true));
        registry.register(journal("good", &log, false));

        let event = SessionEvent::created(SessionId::from("s1"), Utc::now());
        let failures = registry.notify_created(&event);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].listener, "bad");
        assert_eq!(failures[0].position, 0);
        assert_eq!(failures[0].event, SessionEventKind::Created);
        assert_eq!(failures[0].message, "boom");
        assert_eq!(*log.lock(), vec!["bad:created:s1", "good:created:s1"]);
    }

    struct Panicky;

    impl SessionListener for Panicky {
        fn session_created(&self, _event: &SessionEvent) -> Result<(), ListenerError> {
            panic!("listener exploded");
        }
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        registry.register(Arc::new(Panicky));
        registry.register(journal("after", &log, false));

        let failures = registry.notify_created(&SessionEvent::created(SessionId::from("s1"), Utc::now()));
        assert_eq!(failures.len(), 1);
        assert!(failures[0].listener.ends_with("Panicky"));
        assert_eq!(failures[0].message, "panicked: listener exploded");
        assert_eq!(*log.lock(), vec!["after:created:s1"]);
    }

    #[test]
    fn test_duplicate_registration_is_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let listener = journal("one", &log, false);

        assert!(registry.register(Arc::clone(&listener)));
        assert!(!registry.register(Arc::clone(&listener)));
        assert_eq!(registry.len(), 1);

        registry.notify_created(&SessionEvent::created(SessionId::from("s1"), Utc::now()));
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn test_unregister() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let one = journal("one", &log, false);
        let two = journal("two", &log, false);
        registry.register(Arc::clone(&one));
        registry.register(Arc::clone(&two));

        assert!(registry.unregister(&one));
        assert!(!registry.unregister(&one));
        assert_eq!(registry.len(), 1);

        registry.notify_created(&SessionEvent::created(SessionId::from("s1"), Utc::now()));
        assert_eq!(*log.lock(), vec!["two:created:s1"]);
    }

    #[test]
    fn test_empty_registry() {
        let registry = ListenerRegistry::new();
        assert!(registry.is_empty());
        let failures =
            registry.notify_destroyed(&SessionEvent::destroyed(SessionId::from("s1"), DestroyReason::Expired, Utc::now()));
        assert!(failures.is_empty());
    }
}
