//! Error types for session store operations.

use crate::codec::CodecError;
use crate::id::SessionId;
use crate::listener::ListenerFailure;

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No live or reconstructable session exists for this identity.
    #[error("Session not found: {0}")]
    UnknownSession(SessionId),

    /// Attribute names must be non-empty.
    #[error("Invalid attribute name: {0:?}")]
    InvalidAttributeName(String),

    /// An attribute value could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// One or more listeners failed while being notified. The triggering
    /// operation itself completed. When an access found `session_id`
    /// expired, the session is gone and later accesses report
    /// [`Error::UnknownSession`].
    #[error("{} session listener(s) failed for {session_id}", .failures.len())]
    ListenerFailure {
        session_id: SessionId,
        failures: Vec<ListenerFailure>,
    },

    /// Error from the backing store.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Persistence(e.to_string())
    }
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
