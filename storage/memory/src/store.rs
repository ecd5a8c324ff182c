//! A process-local [`DocumentStore`] with real version and token semantics.
//!
//! Documents are addressed by `(database, collection, partition key, id)`.
//! Every write mints a fresh version from a store-wide sequence, optimistic
//! preconditions are enforced under the entry lock, and every response
//! carries a consistency token so the session layer can be exercised
//! end to end without a remote store.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use ulid::Ulid;

use anteroom_core::store::{
    CreateOptions, DocumentStore, GetOptions, GetResponse, ReplaceOptions, StoreError, WriteResponse,
};
use anteroom_core::token::{SessionToken, VersionTag};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Address {
    database: String,
    collection: String,
    partition_key: String,
    id: String,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    version: VersionTag,
    body: Value,
}

#[derive(Default)]
pub struct MemoryStore {
    documents: DashMap<Address, StoredDocument>,
    sequence: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Number of documents held, across all databases and collections.
    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }

    fn next_write(&self) -> (VersionTag, SessionToken) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        (VersionTag::new(format!("v{seq}")), SessionToken::new(seq.to_string()))
    }

    fn read_token(&self) -> SessionToken {
        SessionToken::new(self.sequence.load(Ordering::SeqCst).to_string())
    }
}

/// Stored body with the authoritative id and version stamped in, the way a
/// real store echoes them back on reads.
fn materialize(document: &Value, id: &str, version: &VersionTag) -> Value {
    let mut body = document.clone();
    if let Value::Object(map) = &mut body {
        map.insert("id".to_owned(), Value::String(id.to_owned()));
        map.insert("_version".to_owned(), Value::String(version.as_str().to_owned()));
    }
    body
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(
        &self,
        database: &str,
        collection: &str,
        id: &str,
        options: GetOptions,
    ) -> Result<GetResponse, StoreError> {
        let address = Address {
            database: database.to_owned(),
            collection: collection.to_owned(),
            partition_key: options.partition_key,
            id: id.to_owned(),
        };
        match self.documents.get(&address) {
            Some(stored) => Ok(GetResponse {
                document: stored.body.clone(),
                version: stored.version.clone(),
                session_token: Some(self.read_token()),
            }),
            None => Err(StoreError::NotFound),
        }
    }

    async fn create_document(
        &self,
        database: &str,
        collection: &str,
        document: &Value,
        options: CreateOptions,
    ) -> Result<WriteResponse, StoreError> {
        let requested = document.get("id").and_then(Value::as_str).unwrap_or_default();
        let id = if requested.is_empty() { Ulid::new().to_string() } else { requested.to_owned() };
        let address = Address {
            database: database.to_owned(),
            collection: collection.to_owned(),
            partition_key: options.partition_key,
            id: id.clone(),
        };
        let (version, token) = self.next_write();
        match self.documents.entry(address) {
            Entry::Occupied(mut occupied) if options.upsert => {
                occupied.insert(StoredDocument {
                    version: version.clone(),
                    body: materialize(document, &id, &version),
                });
                Ok(WriteResponse { id, version, session_token: Some(token) })
            }
            Entry::Occupied(_) => Err(StoreError::VersionConflict { session_token: Some(token) }),
            Entry::Vacant(vacant) => {
                vacant.insert(StoredDocument {
                    version: version.clone(),
                    body: materialize(document, &id, &version),
                });
                Ok(WriteResponse { id, version, session_token: Some(token) })
            }
        }
    }

    async fn replace_document(
        &self,
        database: &str,
        collection: &str,
        id: &str,
        document: &Value,
        options: ReplaceOptions,
    ) -> Result<WriteResponse, StoreError> {
        let address = Address {
            database: database.to_owned(),
            collection: collection.to_owned(),
            partition_key: options.partition_key,
            id: id.to_owned(),
        };
        let (version, token) = self.next_write();
        match self.documents.entry(address) {
            Entry::Occupied(mut occupied) => {
                // Precondition and write happen under the same entry lock.
                if occupied.get().version != options.if_match {
                    return Err(StoreError::VersionConflict { session_token: Some(token) });
                }
                occupied.insert(StoredDocument {
                    version: version.clone(),
                    body: materialize(document, id, &version),
                });
                Ok(WriteResponse { id: id.to_owned(), version, session_token: Some(token) })
            }
            Entry::Vacant(_) => Err(StoreError::NotFound),
        }
    }
}
