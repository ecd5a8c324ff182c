//! The wire contract a document store client must satisfy.
//!
//! The engine drives everything through [`DocumentStore`]: single-document
//! get/create/replace addressed by partition-key value and id. Implementations
//! are transport-level clients (or in-process simulations) and report failures
//! through [`StoreError`] so the engine can tell absence and optimistic losses
//! apart from everything else.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::token::{SessionToken, VersionTag};

/// Options for [`DocumentStore::get_document`].
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub partition_key: String,
    /// Latest consistency token observed by the calling session, if any.
    pub session_token: Option<SessionToken>,
}

/// Options for [`DocumentStore::create_document`].
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub partition_key: String,
    /// Overwrite an existing document instead of failing on presence.
    pub upsert: bool,
    pub session_token: Option<SessionToken>,
}

/// Options for [`DocumentStore::replace_document`].
#[derive(Debug, Clone, Default)]
pub struct ReplaceOptions {
    pub partition_key: String,
    /// Version the replace is conditioned on; a mismatch is a
    /// [`StoreError::VersionConflict`].
    pub if_match: VersionTag,
    pub session_token: Option<SessionToken>,
}

/// A successfully read document.
#[derive(Debug, Clone)]
pub struct GetResponse {
    pub document: Value,
    pub version: VersionTag,
    pub session_token: Option<SessionToken>,
}

/// Receipt for a successful create or replace.
#[derive(Debug, Clone)]
pub struct WriteResponse {
    /// Caller-assigned id, or the one the store assigned when the document
    /// carried an empty id.
    pub id: String,
    pub version: VersionTag,
    pub session_token: Option<SessionToken>,
}

/// Failure kinds the engine must be able to distinguish. Everything that is
/// not absence or an optimistic loss (throttling included) stays in its own
/// kind and always propagates.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,

    /// An optimistic precondition failed: an `if_match` replace observed
    /// another writer's version, or a non-upsert create found the document
    /// already present.
    #[error("version precondition failed")]
    VersionConflict {
        /// Consistency token of the conflicting response, when the store
        /// provides one alongside the failure.
        session_token: Option<SessionToken>,
    },

    #[error("throttled by the store")]
    Throttled { retry_after: Option<Duration> },

    #[error("store responded {status}: {message}")]
    Server { status: u16, message: String },

    #[error("transport failure: {message}")]
    Transport { message: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound) }

    /// True when the error is an optimistic-concurrency loss.
    pub fn is_conflict(&self) -> bool { matches!(self, Self::VersionConflict { .. }) }
}

/// Single-document CRUD against one document store.
///
/// Implementations take `&self` and are shared behind an `Arc`; every call is
/// independent and carries full addressing. Documents cross this seam in the
/// store's native JSON form.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(
        &self,
        database: &str,
        collection: &str,
        id: &str,
        options: GetOptions,
    ) -> Result<GetResponse, StoreError>;

    async fn create_document(
        &self,
        database: &str,
        collection: &str,
        document: &Value,
        options: CreateOptions,
    ) -> Result<WriteResponse, StoreError>;

    async fn replace_document(
        &self,
        database: &str,
        collection: &str,
        id: &str,
        document: &Value,
        options: ReplaceOptions,
    ) -> Result<WriteResponse, StoreError>;
}
