//! Opaque tokens exchanged with the document store.

use serde::{Deserialize, Serialize};

/// Optimistic-concurrency token attached to a stored document. The store
/// replaces it on every successful write; an empty tag means the document
/// has never been persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn new(tag: impl Into<String>) -> Self { Self(tag.into()) }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for VersionTag {
    fn from(tag: &str) -> Self { Self(tag.to_owned()) }
}

impl From<String> for VersionTag {
    fn from(tag: String) -> Self { Self(tag) }
}

impl std::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

/// Read-consistency token reflecting a point in the store's replication
/// timeline. Replaying the latest one on subsequent calls guarantees a
/// session observes at least its own prior writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self { Self(token.into()) }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for SessionToken {
    fn from(token: &str) -> Self { Self(token.to_owned()) }
}

impl From<String> for SessionToken {
    fn from(token: String) -> Self { Self(token) }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}
