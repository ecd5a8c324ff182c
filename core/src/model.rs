//! The contract every stored document type satisfies.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::store::DocumentStore;
use crate::token::VersionTag;
use crate::transaction::Transaction;

/// Identity and optimistic-concurrency state of a stored document. Embed it
/// in every model struct with `#[serde(flatten)]`.
///
/// Application code never assigns `version`; only the commit step does, from
/// the store's write receipts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseDocument {
    /// Unique within a partition. Caller-assigned before the first staged
    /// write, or store-assigned for upsert-style writes.
    #[serde(default)]
    pub id: String,

    /// Version last observed from the store. Empty means never persisted,
    /// which makes commit issue a create rather than a replace.
    #[serde(default, rename = "_version", skip_serializing_if = "VersionTag::is_empty")]
    pub version: VersionTag,
}

impl BaseDocument {
    /// True if this document has never been persisted.
    pub fn is_new(&self) -> bool { self.version.is_empty() }
}

/// A strongly-typed document that can live in a [`Collection`].
///
/// The serde representation is the persisted shape: `#[serde(skip)]` fields
/// are transient (computed per read, excluded from snapshots and store
/// writes) and come back as defaults whenever a document is restored from the
/// session cache.
///
/// The two lifecycle hooks are optional capabilities; the defaults do
/// nothing. `post_get` runs after every read that reaches the store (found or
/// absent) and may compute derived fields; `pre_put` runs before a write is
/// staged or raced. Hooks receive the transaction as context and are *not*
/// replayed when a read is served from the session cache.
///
/// [`Collection`]: crate::collection::Collection
pub trait Model: Serialize + DeserializeOwned + Default + Send {
    fn base(&self) -> &BaseDocument;

    fn base_mut(&mut self) -> &mut BaseDocument;

    fn post_get<C: DocumentStore>(&mut self, _txn: &mut Transaction<'_, C>) -> anyhow::Result<()> {
        Ok(())
    }

    fn pre_put<C: DocumentStore>(&mut self, _txn: &mut Transaction<'_, C>) -> anyhow::Result<()> {
        Ok(())
    }
}
