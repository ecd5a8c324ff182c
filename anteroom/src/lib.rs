//! # Anteroom
//!
//! Anteroom is a client-side transaction layer for remote document stores
//! that offer per-document optimistic concurrency (version tokens) and
//! session-bounded read consistency (consistency tokens). It lets application
//! code read and write strongly-typed documents inside retryable units of
//! work without managing version tokens, conflict retries, or consistency
//! tokens by hand.
//!
//! ## Key Features
//!
//! - **Typed documents**: plain serde structs embedding a [`BaseDocument`]
//!   carry identity and version state
//! - **Staged commits**: reads and writes go through a per-attempt staging
//!   discipline; commit turns staged writes into create or
//!   version-conditioned replace calls
//! - **Conflict retry**: a lost optimistic race re-runs the transaction body
//!   against fresh reads, up to a configured budget
//! - **Read-your-writes**: a per-session cache and consistency token make a
//!   session observe its own committed writes without extra store round trips
//! - **Lifecycle hooks**: document types may observe store reads and staged
//!   writes to maintain derived or audit fields
//!
//! ## Core Concepts
//!
//! - **Model**: a struct describing one document type, with its partition-key
//!   field and persisted shape
//! - **Collection**: where documents of one model live: a database and
//!   collection name on one store client
//! - **Session**: a consistency scope; owns the cache, the latest consistency
//!   token, and the retry budget
//! - **Transaction**: one attempt of a unit of work; hands out reads, stages
//!   writes, and commits or rolls back as a whole
//!
//! ## Example
//!
//! ```rust
//! # use std::sync::Arc;
//! # use anteroom::{BaseDocument, Collection, Model, Outcome, PartitionKey};
//! # use anteroom_storage_memory::MemoryStore;
//! # use serde::{Deserialize, Serialize};
//! #
//! # #[derive(Debug, Default, Serialize, Deserialize)]
//! # struct Order {
//! #     #[serde(flatten)]
//! #     base: BaseDocument,
//! #     #[serde(rename = "customerId")]
//! #     customer_id: String,
//! #     total: i64,
//! # }
//! #
//! # impl Model for Order {
//! #     fn base(&self) -> &BaseDocument { &self.base }
//! #     fn base_mut(&mut self) -> &mut BaseDocument { &mut self.base }
//! # }
//! #
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let orders = Collection::new(store, "shop", "orders", PartitionKey::field("customerId"));
//!
//! let mut session = orders.session().with_retries(3);
//! session
//!     .transaction(|txn| {
//!         Box::pin(async move {
//!             // Absent documents come back as blank models; committing one
//!             // issues a create rather than a replace.
//!             let mut order: Order = txn.get("customer-1", "order-1").await?;
//!             order.total += 250;
//!             txn.put(&mut order)?;
//!             Ok(Outcome::Commit)
//!         })
//!     })
//!     .await?;
//!
//! // Served from the session cache; the store is not contacted again.
//! let order: Order = session.get("customer-1", "order-1").await?;
//! assert_eq!(order.total, 250);
//! assert!(!order.base().is_new());
//! # Ok(())
//! # }
//! ```

pub use anteroom_core as core;

// Re-export commonly used types
pub use anteroom_core::{
    error, store, BaseDocument, CacheKey, Collection, DocumentStore, Error, Model, Outcome,
    PartitionKey, Result, Session, SessionToken, Transaction, VersionTag,
};
