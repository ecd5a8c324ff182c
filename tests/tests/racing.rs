
use anteroom::{BaseDocument, Outcome, VersionTag};
use anyhow::Result;
use common::*;

#[tokio::test]
async fn racing_put_is_always_an_unconditional_upsert() -> Result<()> {
    let store = ScriptedStore::new();
    store.script_write(written("o1", "v1", "t1"));
    store.script_write(written("o1", "v2", "t2"));
    let mut session = orders(store.clone()).session();

    session
        .transaction(|txn| {
            Box::pin(async move {
                let mut order = Order {
                    base: BaseDocument { id: "o1".into(), ..Default::default() },
                    customer_id: "c1".into(),
                    total: 1,
                    ..Default::default()
                };
                txn.racing_put(&mut order).await?;

                // A version on the entity changes nothing; still an upsert.
                order.base.version = VersionTag::from("v9");
                txn.racing_put(&mut order).await?;
                Ok(Outcome::Rollback)
            })
        })
        .await?;

    // Both writes went out despite the rollback; racing puts are not staged.
    let calls = store.calls();
    assert_eq!(calls.len(), 2);
    for call in &calls {
        assert_eq!(call.method, "create");
        assert_eq!(call.upsert, Some(true));
        assert_eq!(call.partition_key, "c1");
        assert_eq!(call.if_match, None);
        assert_eq!(call.document.as_ref().unwrap()["receipt"], "order o1 for c1");
    }
    assert_eq!(session.token().map(|t| t.as_str()), Some("t2"));
    Ok(())
}

#[tokio::test]
async fn racing_put_does_not_touch_the_cache() -> Result<()> {
    let store = ScriptedStore::new();
    store.script_write(written("o1", "v1", "t1"));
    store.script_read(found(order_body("o1", "c1", 50), "v1", "t2"));
    let mut session = orders(store.clone()).session();

    session
        .transaction(|txn| {
            Box::pin(async move {
                let mut order = Order {
                    base: BaseDocument { id: "o1".into(), ..Default::default() },
                    customer_id: "c1".into(),
                    total: 50,
                    ..Default::default()
                };
                txn.racing_put(&mut order).await?;

                // The raced write did not seed the cache; this read goes out.
                let fetched: Order = txn.get("c1", "o1").await?;
                assert_eq!(fetched.total, 50);
                Ok(Outcome::Commit)
            })
        })
        .await?;

    let methods: Vec<&str> = store.calls().iter().map(|c| c.method).collect();
    assert_eq!(methods, vec!["create", "get"]);
    Ok(())
}
