
use std::sync::{Arc, Mutex};

use anteroom::store::{CreateOptions, DocumentStore};
use anteroom::{Collection, Outcome, PartitionKey};
use anteroom_storage_memory::MemoryStore;
use anyhow::Result;
use common::*;
use serde_json::json;

fn orders_on(store: Arc<MemoryStore>) -> Collection<MemoryStore> {
    Collection::new(store, "shop", "orders", PartitionKey::field("customerId"))
}

#[tokio::test]
async fn create_then_update_with_read_your_writes() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let collection = orders_on(store.clone());

    let mut writer = collection.session();
    writer
        .transaction(|txn| {
            Box::pin(async move {
                let mut order: Order = txn.get("c1", "o1").await?;
                assert!(order.base.is_new());
                order.total = 100;
                txn.put(&mut order)?;
                Ok(Outcome::Commit)
            })
        })
        .await?;
    assert_eq!(store.len(), 1);

    // Same session: served from the cache, already carrying the committed
    // version.
    let cached: Order = writer.get("c1", "o1").await?;
    assert_eq!(cached.total, 100);
    assert!(!cached.base.is_new());

    // A second transaction in the same session replaces against that
    // version without another read.
    writer
        .transaction(|txn| {
            Box::pin(async move {
                let mut order: Order = txn.get("c1", "o1").await?;
                order.total = 150;
                txn.put(&mut order)?;
                Ok(Outcome::Commit)
            })
        })
        .await?;

    // A fresh session reads through the store and sees the final state.
    let mut reader = collection.session();
    let order: Order = reader.get("c1", "o1").await?;
    assert_eq!(order.total, 150);
    assert_eq!(order.receipt, "order o1 for c1");
    Ok(())
}

#[tokio::test]
async fn a_racing_writer_forces_a_retry_that_succeeds() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let collection = orders_on(store.clone());

    // The document exists before the session starts.
    store
        .create_document(
            "shop",
            "orders",
            &json!({ "id": "o1", "customerId": "c1", "total": 10 }),
            CreateOptions { partition_key: "c1".into(), upsert: false, ..Default::default() },
        )
        .await?;

    let mut session = collection.session().with_retries(2);
    let racer = store.clone();
    session
        .transaction(move |txn| {
            let racer = racer.clone();
            Box::pin(async move {
                let mut order: Order = txn.get("c1", "o1").await?;
                if txn.attempt() == 0 {
                    // Another writer overwrites between our read and commit.
                    racer
                        .create_document(
                            "shop",
                            "orders",
                            &json!({ "id": "o1", "customerId": "c1", "total": 70 }),
                            CreateOptions {
                                partition_key: "c1".into(),
                                upsert: true,
                                ..Default::default()
                            },
                        )
                        .await?;
                }
                order.total += 1;
                txn.put(&mut order)?;
                Ok(Outcome::Commit)
            })
        })
        .await?;

    // The retry re-read the racer's state and applied on top of it.
    let mut verifier = collection.session();
    let order: Order = verifier.stale_get_existing("c1", "o1").await?;
    assert_eq!(order.total, 71);
    Ok(())
}

#[tokio::test]
async fn racing_put_with_a_blank_id_gets_a_store_assigned_one() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let collection = orders_on(store.clone());
    let assigned = Arc::new(Mutex::new(String::new()));

    let mut session = collection.session();
    let sink = assigned.clone();
    session
        .transaction(move |txn| {
            let sink = sink.clone();
            Box::pin(async move {
                let mut order = Order { customer_id: "c1".into(), total: 5, ..Default::default() };
                txn.racing_put(&mut order).await?;
                assert!(!order.base.id.is_empty());
                *sink.lock().unwrap() = order.base.id.clone();
                Ok(Outcome::Commit)
            })
        })
        .await?;

    let id = assigned.lock().unwrap().clone();
    let mut session = collection.session();
    let order: Order = session.stale_get_existing("c1", &id).await?;
    assert_eq!(order.total, 5);
    Ok(())
}

#[tokio::test]
async fn sessions_are_independent_consistency_scopes() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let collection = orders_on(store.clone());

    let mut writer = collection.session();
    writer
        .transaction(|txn| {
            Box::pin(async move {
                let mut order: Order = txn.get("c1", "o1").await?;
                order.total = 1;
                txn.put(&mut order)?;
                Ok(Outcome::Commit)
            })
        })
        .await?;

    // The reader picks the document up through the store and caches it.
    let mut reader = collection.session();
    let seen: Order = reader.get("c1", "o1").await?;
    assert_eq!(seen.total, 1);

    writer
        .transaction(|txn| {
            Box::pin(async move {
                let mut order: Order = txn.get("c1", "o1").await?;
                order.total = 2;
                txn.put(&mut order)?;
                Ok(Outcome::Commit)
            })
        })
        .await?;

    // The reader's cache is its own; the update is invisible until it asks
    // for fresh state.
    let cached: Order = reader.get("c1", "o1").await?;
    assert_eq!(cached.total, 1);
    let fresh: Order = reader.stale_get("c1", "o1").await?;
    assert_eq!(fresh.total, 2);
    Ok(())
}
