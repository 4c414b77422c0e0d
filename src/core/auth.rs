//! Authentication abstractions

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated session: an opaque bearer token plus the identity it was
/// issued for. Persisted client-side; absence or a failed lookup means "not
/// authenticated".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub uid: String,
    pub email: String,
}

/// Account details resolved from a bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub uid: String,
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Validates credentials and issues a session token.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// Registers a new account. The caller signs in separately.
    async fn sign_up(&self, email: &str, password: &str) -> Result<()>;

    /// Resolves a bearer token to its account, failing on invalid or
    /// expired tokens.
    async fn lookup(&self, token: &str) -> Result<Account>;
}
