//! Error types surfaced by sessions and transactions.

use thiserror::Error;

use crate::cache::CacheKey;
use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The document does not exist. Returned only by reads for which absence
    /// is exceptional; transactional reads absorb absence instead.
    #[error("document not found: {key}")]
    NotFound { key: CacheKey },

    /// An optimistic write lost its race and the retry budget is spent.
    #[error("version conflict on document {key} after {attempts} attempts")]
    Conflict { key: CacheKey, attempts: u32 },

    /// `put` was called for a key this attempt never fetched.
    #[error("put without a prior get in this transaction: {key}")]
    PutWithoutGet { key: CacheKey },

    /// The store returned a document whose id differs from the requested one.
    #[error("unexpected document id: requested `{requested}`, got `{actual}`")]
    UnexpectedId { requested: String, actual: String },

    /// The store returned a document whose partition-key value differs from
    /// the requested one.
    #[error("unexpected partition key value: requested `{requested}`, got `{actual}`")]
    UnexpectedPartitionKey { requested: String, actual: String },

    /// A model lifecycle hook failed.
    #[error("{hook} hook failed for {key}")]
    Hook {
        hook: &'static str,
        key: CacheKey,
        #[source]
        source: anyhow::Error,
    },

    /// The collection's partition-key field is absent from the serialized
    /// document.
    #[error("partition key field `{field}` is missing from the serialized document")]
    MissingPartitionKey { field: String },

    /// The partition-key field serialized to something other than a string.
    #[error("partition key field `{field}` must serialize to a string, got {found}")]
    InvalidPartitionKey { field: String, found: &'static str },

    /// A document failed to encode to or decode from its stored form.
    #[error("document codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The session deadline elapsed before the operation finished.
    #[error("deadline exceeded")]
    Timeout,

    /// A store failure other than absence or a version conflict. Never
    /// downgraded to `NotFound`.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Failure raised by application code inside a transaction body.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
