//! One attempt of a unit of work against a collection.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;
use ulid::Ulid;

use crate::cache::{CacheKey, CachedDocument};
use crate::collection::PartitionKey;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::session::{bounded, Session};
use crate::store::{CreateOptions, DocumentStore, GetOptions, GetResponse, ReplaceOptions, StoreError};
use crate::token::VersionTag;

/// A transaction body's verdict on its staged writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Apply the staged writes to the store.
    Commit,
    /// Discard the staged writes and report success to the caller.
    Rollback,
}

#[derive(Debug)]
struct StagedWrite {
    key: CacheKey,
    version: VersionTag,
    document: Value,
}

/// One attempt: reads and writes mediated through the session cache, staged
/// writes applied at commit with per-document optimistic preconditions.
///
/// Every cache mutation the attempt makes is journaled with its prior value;
/// a rollback, a body error, a commit failure, or an abandoned attempt
/// restores the journal, so only a committed attempt changes what later
/// reads in the session observe.
pub struct Transaction<'s, C: DocumentStore> {
    session: &'s mut Session<C>,
    id: Ulid,
    attempt: u32,
    deadline: Option<Instant>,
    reads: HashMap<CacheKey, VersionTag>,
    writes: Vec<StagedWrite>,
    undo: HashMap<CacheKey, Option<CachedDocument>>,
}

impl<'s, C: DocumentStore> Transaction<'s, C> {
    pub(crate) fn new(session: &'s mut Session<C>, attempt: u32, deadline: Option<Instant>) -> Self {
        Self {
            session,
            id: Ulid::new(),
            attempt,
            deadline,
            reads: HashMap::new(),
            writes: Vec::new(),
            undo: HashMap::new(),
        }
    }

    /// Zero-based index of this attempt within the enclosing `transaction`
    /// call. Lets bodies make idempotency decisions when they are re-run
    /// after a conflict.
    pub fn attempt(&self) -> u32 { self.attempt }

    /// Read one document, session cache first.
    ///
    /// A cache hit restores the snapshot verbatim: hooks are not replayed and
    /// transient fields come back as defaults. A miss reads through the store
    /// with the session's consistency token; absence is not an error and
    /// yields a blank model primed with the requested id and partition key.
    pub async fn get<M: Model>(&mut self, partition_key: &str, id: &str) -> Result<M> {
        let key = CacheKey::new(partition_key, id);
        if let Some(snapshot) = self.session.state.cache.get(&key) {
            let entity: M = serde_json::from_value(snapshot.document.clone())?;
            debug!(txn = %self.id, %key, "get served from session cache");
            self.reads.insert(key, entity.base().version.clone());
            return Ok(entity);
        }
        self.fetch(key).await
    }

    async fn fetch<M: Model>(&mut self, key: CacheKey) -> Result<M> {
        let client = Arc::clone(self.session.collection.client());
        let options = GetOptions {
            partition_key: key.partition_key.clone(),
            session_token: self.session.token().cloned(),
        };
        let fetched = bounded(
            self.deadline,
            client.get_document(
                self.session.collection.database(),
                self.session.collection.name(),
                &key.id,
                options,
            ),
        )
        .await;

        let (mut entity, found) = match fetched {
            Ok(GetResponse { document, version, session_token }) => {
                self.session.observe_token(session_token);
                let mut entity: M = serde_json::from_value(document)?;
                entity.base_mut().version = version;
                (entity, true)
            }
            Err(Error::Store(StoreError::NotFound)) => {
                debug!(txn = %self.id, %key, "document absent; priming blank model");
                (self.blank_document(&key)?, false)
            }
            Err(err) => return Err(err),
        };

        self.session.collection.verify_read(&key, &entity)?;
        entity
            .post_get(self)
            .map_err(|source| Error::Hook { hook: "post_get", key: key.clone(), source })?;

        if found {
            // The snapshot is taken after the hook, so hook effects on
            // persisted fields survive verbatim in later cache hits.
            let snapshot = CachedDocument::new(serde_json::to_value(&entity)?);
            self.stage_cache_write(key.clone(), snapshot);
            debug!(txn = %self.id, %key, version = %entity.base().version, "get fetched from store");
        }
        self.reads.insert(key, entity.base().version.clone());
        Ok(entity)
    }

    /// Default model carrying the requested coordinates, ready to be staged
    /// for a create.
    fn blank_document<M: Model>(&self, key: &CacheKey) -> Result<M> {
        let mut document = serde_json::to_value(M::default())?;
        if let Value::Object(map) = &mut document {
            map.insert("id".to_owned(), Value::String(key.id.clone()));
            if let PartitionKey::Field(field) = self.session.collection.partition_key() {
                map.insert(field.clone(), Value::String(key.partition_key.clone()));
            }
        }
        Ok(serde_json::from_value(document)?)
    }

    /// Stage `entity` for commit. Requires a prior [`get`](Self::get) for the
    /// same key in this attempt; runs the pre-write hook, snapshots the
    /// entity into the session cache (visible to later reads in this
    /// attempt), and appends it to the write set. Never contacts the store.
    pub fn put<M: Model>(&mut self, entity: &mut M) -> Result<()> {
        let (base, partition_key) = self.session.collection.entity_info(entity)?;
        let key = CacheKey::new(partition_key, base.id);
        if !self.reads.contains_key(&key) {
            return Err(Error::PutWithoutGet { key });
        }

        entity
            .pre_put(self)
            .map_err(|source| Error::Hook { hook: "pre_put", key: key.clone(), source })?;

        let document = serde_json::to_value(&*entity)?;
        self.stage_cache_write(key.clone(), CachedDocument::new(document.clone()));
        debug!(txn = %self.id, %key, staged = self.writes.len() + 1, "staged write");
        self.writes.push(StagedWrite { key, version: entity.base().version.clone(), document });
        Ok(())
    }

    /// Unconditional upsert, outside the staged-commit protocol: no prior
    /// get is required and nothing is staged or cached. The pre-write hook
    /// runs, the response's consistency token is recorded, and a
    /// store-assigned id is written back onto an entity that had none.
    /// Intended for fire-and-forget writes where losing the race to another
    /// writer is acceptable.
    pub async fn racing_put<M: Model>(&mut self, entity: &mut M) -> Result<()> {
        let (base, partition_key) = self.session.collection.entity_info(entity)?;
        let key = CacheKey::new(partition_key, base.id);

        entity
            .pre_put(self)
            .map_err(|source| Error::Hook { hook: "pre_put", key: key.clone(), source })?;

        let document = serde_json::to_value(&*entity)?;
        let client = Arc::clone(self.session.collection.client());
        let options = CreateOptions {
            partition_key: key.partition_key.clone(),
            upsert: true,
            session_token: self.session.token().cloned(),
        };
        debug!(txn = %self.id, %key, "racing upsert");
        let receipt = bounded(
            self.deadline,
            client.create_document(
                self.session.collection.database(),
                self.session.collection.name(),
                &document,
                options,
            ),
        )
        .await?;
        self.session.observe_token(receipt.session_token);
        if entity.base().id.is_empty() {
            entity.base_mut().id = receipt.id;
        }
        Ok(())
    }

    /// Apply the write set in staging order: create for never-persisted
    /// documents, version-conditioned replace otherwise. The first conflict
    /// aborts the remainder, restores the cache journal, and reports
    /// [`Error::Conflict`] for the retry driver; any other failure restores
    /// the journal and propagates as-is.
    pub(crate) async fn commit(&mut self) -> Result<()> {
        let writes = std::mem::take(&mut self.writes);
        for write in writes {
            let client = Arc::clone(self.session.collection.client());
            let session_token = self.session.token().cloned();
            let result = if write.version.is_empty() {
                debug!(txn = %self.id, key = %write.key, "commit: creating document");
                bounded(
                    self.deadline,
                    client.create_document(
                        self.session.collection.database(),
                        self.session.collection.name(),
                        &write.document,
                        CreateOptions {
                            partition_key: write.key.partition_key.clone(),
                            upsert: false,
                            session_token,
                        },
                    ),
                )
                .await
            } else {
                debug!(txn = %self.id, key = %write.key, version = %write.version, "commit: replacing document");
                bounded(
                    self.deadline,
                    client.replace_document(
                        self.session.collection.database(),
                        self.session.collection.name(),
                        &write.key.id,
                        &write.document,
                        ReplaceOptions {
                            partition_key: write.key.partition_key.clone(),
                            if_match: write.version.clone(),
                            session_token,
                        },
                    ),
                )
                .await
            };

            match result {
                Ok(receipt) => {
                    self.session.observe_token(receipt.session_token);
                    if let Some(entry) = self.session.state.cache.get_mut(&write.key) {
                        entry.set_version(&receipt.version);
                    }
                }
                Err(Error::Store(StoreError::VersionConflict { session_token })) => {
                    // The conflicting response's token must reach the session
                    // before the next attempt issues any read.
                    self.session.observe_token(session_token);
                    self.revert();
                    return Err(Error::Conflict { key: write.key, attempts: self.attempt + 1 });
                }
                Err(err) => {
                    self.revert();
                    return Err(err);
                }
            }
        }
        self.undo.clear();
        Ok(())
    }

    fn stage_cache_write(&mut self, key: CacheKey, snapshot: CachedDocument) {
        if !self.undo.contains_key(&key) {
            self.undo.insert(key.clone(), self.session.state.cache.get(&key).cloned());
        }
        self.session.state.cache.insert(key, snapshot);
    }

    /// Restore every cache key this attempt touched to its pre-attempt value
    /// and discard the attempt state.
    pub(crate) fn revert(&mut self) {
        for (key, prior) in self.undo.drain() {
            self.session.state.cache.restore(key, prior);
        }
        self.writes.clear();
        self.reads.clear();
    }
}

impl<'s, C: DocumentStore> Drop for Transaction<'s, C> {
    fn drop(&mut self) {
        // Abandoned attempts (a panicking body, a dropped future) must not
        // leak staged cache mutations into later attempts.
        if !self.undo.is_empty() {
            self.revert();
        }
    }
}
