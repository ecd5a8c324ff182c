//! Session-private snapshot cache.

use std::collections::HashMap;

use serde_json::Value;

use crate::token::VersionTag;

/// Identifies at most one cached snapshot within a session: the document's
/// partition-key value plus its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub partition_key: String,
    pub id: String,
}

impl CacheKey {
    pub fn new(partition_key: impl Into<String>, id: impl Into<String>) -> Self {
        Self { partition_key: partition_key.into(), id: id.into() }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.partition_key, self.id)
    }
}

/// Serialized snapshot of a document's persisted fields. Transient fields are
/// absent here, so restoring a snapshot brings them back as defaults.
#[derive(Debug, Clone)]
pub(crate) struct CachedDocument {
    pub document: Value,
}

impl CachedDocument {
    pub fn new(document: Value) -> Self { Self { document } }

    #[cfg(test)]
    pub fn version(&self) -> VersionTag {
        match self.document.get("_version").and_then(Value::as_str) {
            Some(tag) => VersionTag::from(tag),
            None => VersionTag::default(),
        }
    }

    pub fn set_version(&mut self, version: &VersionTag) {
        if let Value::Object(map) = &mut self.document {
            map.insert("_version".to_owned(), Value::String(version.as_str().to_owned()));
        }
    }
}

/// Last known snapshot per cache key; the session's read-your-writes unit.
/// Rows appear on successful store reads and on staged writes, and transaction
/// attempts journal prior values so either kind can be reverted.
#[derive(Debug, Default)]
pub(crate) struct EntityCache {
    entries: HashMap<CacheKey, CachedDocument>,
}

impl EntityCache {
    pub fn get(&self, key: &CacheKey) -> Option<&CachedDocument> { self.entries.get(key) }

    pub fn get_mut(&mut self, key: &CacheKey) -> Option<&mut CachedDocument> {
        self.entries.get_mut(key)
    }

    pub fn insert(&mut self, key: CacheKey, snapshot: CachedDocument) {
        self.entries.insert(key, snapshot);
    }

    /// Put a journaled prior value back, absence included.
    pub fn restore(&mut self, key: CacheKey, prior: Option<CachedDocument>) {
        match prior {
            Some(snapshot) => self.entries.insert(key, snapshot),
            None => self.entries.remove(&key),
        };
    }

    #[cfg(test)]
    pub fn len(&self) -> usize { self.entries.len() }
}
