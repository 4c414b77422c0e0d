//! Document store abstractions and typed wrappers.
//!
//! The store client is constructed once at startup and injected into the
//! components that need it, keeping the analytics core testable against an
//! in-memory implementation.

use crate::core::auth::Session;
use crate::core::portfolio::{Portfolio, decode_document, encode_document};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

pub const PORTFOLIOS_COLLECTION: &str = "portfolios";
pub const SESSIONS_COLLECTION: &str = "sessions";

const CURRENT_SESSION_KEY: &str = "current";

/// Raw key-value document store, grouped into named collections. `put`
/// overwrites the whole document: last write wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, collection: &str, key: &str, value: &[u8]) -> Result<()>;
    async fn remove(&self, collection: &str, key: &str) -> Result<()>;
}

/// Typed portfolio access keyed by user id. Runs the legacy schema upgrade
/// on read and writes the new shape back so the migration happens once.
pub struct PortfolioStore {
    store: Arc<dyn DocumentStore>,
}

impl PortfolioStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// A missing document reads as an empty portfolio.
    pub async fn get(&self, user_id: &str) -> Result<Portfolio> {
        match self.store.get(PORTFOLIOS_COLLECTION, user_id).await? {
            Some(raw) => {
                let (portfolio, upgraded) = decode_document(&raw)?;
                if upgraded {
                    info!("Upgraded legacy portfolio document for user {user_id}");
                    self.put(user_id, &portfolio).await?;
                }
                Ok(portfolio)
            }
            None => {
                debug!("No portfolio document for user {user_id}");
                Ok(Portfolio::new())
            }
        }
    }

    pub async fn put(&self, user_id: &str, portfolio: &Portfolio) -> Result<()> {
        let raw = encode_document(portfolio)?;
        self.store.put(PORTFOLIOS_COLLECTION, user_id, &raw).await
    }
}

/// Persists the locally cached session token.
pub struct SessionStore {
    store: Arc<dyn DocumentStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<Option<Session>> {
        match self
            .store
            .get(SESSIONS_COLLECTION, CURRENT_SESSION_KEY)
            .await?
        {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn save(&self, session: &Session) -> Result<()> {
        let raw = serde_json::to_vec(session)?;
        self.store
            .put(SESSIONS_COLLECTION, CURRENT_SESSION_KEY, &raw)
            .await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store
            .remove(SESSIONS_COLLECTION, CURRENT_SESSION_KEY)
            .await
    }
}
