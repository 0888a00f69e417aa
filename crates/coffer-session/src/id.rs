//! Session identities and the generator that mints them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, globally unique session token.
///
/// Equality and hashing are byte-exact over the underlying string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a token received from an external collaborator (e.g. a cookie).
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase hex encoding of the token bytes, safe for use as a file name.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for SessionId {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Source of fresh session identities.
///
/// Implementations must never return the same token twice.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> SessionId;
}

/// Random UUID v4 identities.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> SessionId {
        SessionId(uuid::Uuid::new_v4().simple().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_uuid_generator_unique() {
        let ids = UuidGenerator;
        let minted: HashSet<SessionId> = (0..1000).map(|_| ids.generate()).collect();
        assert_eq!(minted.len(), 1000);
    }

    #[test]
    fn test_equality_is_case_sensitive() {
        assert_ne!(SessionId::from("abc"), SessionId::from("ABC"));
        assert_eq!(SessionId::from("abc"), SessionId::new(String::from("abc")));
    }

    #[test]
    fn test_hex_encoding() {
        let id = SessionId::from("a/b");
        assert_eq!(id.to_hex(), "612f62");
        assert_eq!(SessionId::from("é").to_hex(), "c3a9");
    }
}
