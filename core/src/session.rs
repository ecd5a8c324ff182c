//! A consistency scope over one collection.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::cache::{CacheKey, EntityCache};
use crate::collection::Collection;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::store::{DocumentStore, GetOptions, GetResponse, StoreError};
use crate::token::SessionToken;
use crate::transaction::{Outcome, Transaction};

#[derive(Default)]
pub(crate) struct SessionState {
    pub(crate) cache: EntityCache,
    pub(crate) token: Option<SessionToken>,
}

/// Read-your-writes scope over one [`Collection`].
///
/// A session carries the entity cache and the latest consistency token across
/// transaction attempts, and owns the retry budget for commit conflicts.
/// Sessions are not `Sync`; one unit of application work drives one session.
pub struct Session<C> {
    pub(crate) collection: Collection<C>,
    pub(crate) state: SessionState,
    retries: u32,
    timeout: Option<Duration>,
}

impl<C: DocumentStore> Session<C> {
    pub(crate) fn new(collection: Collection<C>) -> Self {
        Self { collection, state: SessionState::default(), retries: 0, timeout: None }
    }

    /// How many times a conflicted commit is re-attempted. Zero (the
    /// default) means exactly one attempt.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Bound every store call made by subsequent operations. The window
    /// opens when an operation begins and covers all of its attempts.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn collection(&self) -> &Collection<C> { &self.collection }

    /// Latest consistency token observed by this session, if any.
    pub fn token(&self) -> Option<&SessionToken> { self.state.token.as_ref() }

    /// Responses without a token never clear an established one.
    pub(crate) fn observe_token(&mut self, token: Option<SessionToken>) {
        if let Some(token) = token {
            self.state.token = Some(token);
        }
    }

    /// Run `body` as a transaction, retrying commit conflicts up to the
    /// configured budget.
    ///
    /// The body stages reads and writes on the attempt it is handed and
    /// finishes with a verdict: [`Outcome::Commit`] applies the staged
    /// writes, [`Outcome::Rollback`] discards them and counts as success.
    /// Only a commit-time version conflict triggers a re-run; the body must
    /// tolerate being invoked multiple times. Errors from the body and
    /// non-conflict store failures abort immediately.
    pub async fn transaction<F>(&mut self, mut body: F) -> Result<()>
    where
        for<'t> F: FnMut(&'t mut Transaction<'_, C>) -> BoxFuture<'t, Result<Outcome>> + Send,
    {
        let deadline = self.timeout.map(|limit| Instant::now() + limit);
        let mut attempt = 0;
        loop {
            if let Some(at) = deadline {
                if Instant::now() >= at {
                    return Err(Error::Timeout);
                }
            }

            let mut txn = Transaction::new(self, attempt, deadline);
            let outcome = match body(&mut txn).await {
                Ok(Outcome::Commit) => txn.commit().await,
                Ok(Outcome::Rollback) => {
                    txn.revert();
                    debug!(attempt, "transaction rolled back");
                    Ok(())
                }
                Err(err) => {
                    txn.revert();
                    Err(err)
                }
            };
            drop(txn);

            match outcome {
                Ok(()) => return Ok(()),
                Err(Error::Conflict { ref key, .. }) if attempt < self.retries => {
                    warn!(%key, attempt, "commit conflicted; retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Read one document through a single-attempt transaction: the session
    /// cache applies and a store-backed read seeds it, but nothing is
    /// staged for write.
    pub async fn get<M: Model>(&mut self, partition_key: &str, id: &str) -> Result<M> {
        let deadline = self.timeout.map(|limit| Instant::now() + limit);
        let mut txn = Transaction::new(self, 0, deadline);
        match txn.get::<M>(partition_key, id).await {
            Ok(entity) => {
                txn.commit().await?;
                Ok(entity)
            }
            Err(err) => {
                txn.revert();
                Err(err)
            }
        }
    }

    /// Uncached read outside the transaction protocol. Absence is a normal
    /// outcome and yields the default model; hooks do not run and the
    /// session cache is neither consulted nor updated.
    pub async fn stale_get<M: Model>(&mut self, partition_key: &str, id: &str) -> Result<M> {
        let key = CacheKey::new(partition_key, id);
        Ok(self.stale_fetch(&key).await?.unwrap_or_default())
    }

    /// Uncached read that treats absence as exceptional: a missing document
    /// is [`Error::NotFound`].
    pub async fn stale_get_existing<M: Model>(&mut self, partition_key: &str, id: &str) -> Result<M> {
        let key = CacheKey::new(partition_key, id);
        match self.stale_fetch(&key).await? {
            Some(entity) => Ok(entity),
            None => Err(Error::NotFound { key }),
        }
    }

    async fn stale_fetch<M: Model>(&mut self, key: &CacheKey) -> Result<Option<M>> {
        let deadline = self.timeout.map(|limit| Instant::now() + limit);
        let client = Arc::clone(self.collection.client());
        let options = GetOptions {
            partition_key: key.partition_key.clone(),
            session_token: self.token().cloned(),
        };
        let fetched = bounded(
            deadline,
            client.get_document(self.collection.database(), self.collection.name(), &key.id, options),
        )
        .await;

        match fetched {
            Ok(GetResponse { document, version, session_token }) => {
                self.observe_token(session_token);
                let mut entity: M = serde_json::from_value(document)?;
                entity.base_mut().version = version;
                self.collection.verify_read(key, &entity)?;
                Ok(Some(entity))
            }
            Err(Error::Store(StoreError::NotFound)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Run a store call under the operation deadline, if one is set.
pub(crate) async fn bounded<T>(
    deadline: Option<Instant>,
    fut: impl Future<Output = std::result::Result<T, StoreError>>,
) -> Result<T> {
    let outcome = match deadline {
        Some(at) => timeout_at(at, fut).await.map_err(|_| Error::Timeout)?,
        None => fut.await,
    };
    outcome.map_err(Error::Store)
}
