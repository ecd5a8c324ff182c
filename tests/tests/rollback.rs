
use anteroom::{Error, Outcome};
use anyhow::Result;
use common::*;

#[tokio::test]
async fn rollback_discards_staged_writes_and_reports_success() -> Result<()> {
    let store = ScriptedStore::new();
    store.script_read(found(order_body("o1", "c1", 100), "v1", "t1"));
    let mut session = orders(store.clone()).session();

    session
        .transaction(|txn| {
            Box::pin(async move {
                let mut order: Order = txn.get("c1", "o1").await?;
                order.total = 999;
                txn.put(&mut order)?;
                Ok(Outcome::Rollback)
            })
        })
        .await?;

    // The read happened; the staged write never reached the store.
    let calls = store.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, "get");
    Ok(())
}

#[tokio::test]
async fn rollback_restores_the_cache_to_its_pre_attempt_state() -> Result<()> {
    let store = ScriptedStore::new();
    store.script_read(found(order_body("o1", "c1", 100), "v1", "t1"));
    store.script_read(found(order_body("o1", "c1", 100), "v1", "t2"));
    let mut session = orders(store.clone()).session();

    session
        .transaction(|txn| {
            Box::pin(async move {
                let mut order: Order = txn.get("c1", "o1").await?;
                order.total = 999;
                txn.put(&mut order)?;
                Ok(Outcome::Rollback)
            })
        })
        .await?;

    // Both the read seed and the staged value were unwound, so this get
    // reaches the store again and sees the store's value.
    let order: Order = session.get("c1", "o1").await?;
    assert_eq!(order.total, 100);
    assert_eq!(store.calls().iter().filter(|c| c.method == "get").count(), 2);
    Ok(())
}

#[tokio::test]
async fn failed_bodies_unwind_like_rollback() -> Result<()> {
    let store = ScriptedStore::new();
    store.script_read(found(order_body("o1", "c1", 100), "v1", "t1"));
    store.script_read(found(order_body("o1", "c1", 100), "v1", "t2"));
    let mut session = orders(store.clone()).session();

    let result = session
        .transaction(|txn| {
            Box::pin(async move {
                let mut order: Order = txn.get("c1", "o1").await?;
                order.total = 999;
                txn.put(&mut order)?;
                Err(anyhow::anyhow!("business rule refused this order").into())
            })
        })
        .await;
    assert!(matches!(result, Err(Error::Other(_))));

    let calls = store.calls();
    assert_eq!(calls.len(), 1); // no write was issued

    let order: Order = session.get("c1", "o1").await?;
    assert_eq!(order.total, 100);
    Ok(())
}
