//! Store coordinates for one family of documents.

use std::sync::Arc;

use serde_json::Value;

use crate::cache::CacheKey;
use crate::error::{Error, Result};
use crate::model::{BaseDocument, Model};
use crate::session::Session;
use crate::store::DocumentStore;

/// Designates which document field carries the partition key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionKey {
    /// A named top-level field of the serialized document.
    Field(String),
    /// The document id doubles as the partition key.
    Id,
}

impl PartitionKey {
    pub fn field(name: impl Into<String>) -> Self { Self::Field(name.into()) }
}

/// Where documents of one model type live: a database and collection name on
/// one store, plus the partition-key designation. Cheap to clone; performs no
/// I/O itself.
pub struct Collection<C> {
    client: Arc<C>,
    database: String,
    name: String,
    partition_key: PartitionKey,
}

// Not derived: cloning shares the store handle, so `C: Clone` is not needed.
impl<C> Clone for Collection<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            database: self.database.clone(),
            name: self.name.clone(),
            partition_key: self.partition_key.clone(),
        }
    }
}

impl<C: DocumentStore> Collection<C> {
    pub fn new(
        client: Arc<C>,
        database: impl Into<String>,
        name: impl Into<String>,
        partition_key: PartitionKey,
    ) -> Self {
        Self { client, database: database.into(), name: name.into(), partition_key }
    }

    pub fn database(&self) -> &str { &self.database }

    pub fn name(&self) -> &str { &self.name }

    pub fn partition_key(&self) -> &PartitionKey { &self.partition_key }

    pub(crate) fn client(&self) -> &Arc<C> { &self.client }

    /// Begin a session with an empty cache and no consistency token.
    pub fn session(&self) -> Session<C> { Session::new(self.clone()) }

    /// Identity + version of `entity` and its partition-key value, resolved
    /// from the configured field (or from the id). Fails only on a
    /// misconfigured partition key.
    pub fn entity_info<M: Model>(&self, entity: &M) -> Result<(BaseDocument, String)> {
        let base = entity.base().clone();
        let partition_key = match &self.partition_key {
            PartitionKey::Id => base.id.clone(),
            PartitionKey::Field(field) => {
                let document = serde_json::to_value(entity)?;
                match document.get(field.as_str()) {
                    Some(Value::String(value)) => value.clone(),
                    Some(other) => {
                        return Err(Error::InvalidPartitionKey {
                            field: field.clone(),
                            found: json_type_name(other),
                        })
                    }
                    None => return Err(Error::MissingPartitionKey { field: field.clone() }),
                }
            }
        };
        Ok((base, partition_key))
    }

    /// Confirm that a deserialized read carries the coordinates it was
    /// requested under. A mismatch means the store row is corrupt or the
    /// model's serde mapping disagrees with the collection configuration.
    pub(crate) fn verify_read<M: Model>(&self, key: &CacheKey, entity: &M) -> Result<()> {
        let (base, partition_key) = self.entity_info(entity)?;
        if base.id != key.id {
            return Err(Error::UnexpectedId { requested: key.id.clone(), actual: base.id });
        }
        if partition_key != key.partition_key {
            return Err(Error::UnexpectedPartitionKey {
                requested: key.partition_key.clone(),
                actual: partition_key,
            });
        }
        Ok(())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
