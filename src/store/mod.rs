//! User and session persistence.
//!
//! Handlers never talk to a database directly; they go through the
//! [`UserStore`] and [`SessionStore`] traits. [`postgres::PgStore`] is the
//! production backend, [`memory::MemoryStore`] keeps everything in process and
//! is used by the test-suite and local demos.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already registered")]
    UsernameTaken,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid session payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("session lifetime out of range")]
    TtlOutOfRange,
}

/// A user record. Either local credentials, a Google subject id, or both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: Option<String>,
    /// Argon2 PHC string, the salt is embedded.
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub secret: Option<String>,
}

impl User {
    #[must_use]
    pub fn new_local(username: &str, password_hash: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: Some(username.to_string()),
            password_hash: Some(password_hash.to_string()),
            google_id: None,
            secret: None,
        }
    }

    #[must_use]
    pub fn new_federated(google_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: None,
            password_hash: None,
            google_id: Some(google_id.to_string()),
            secret: None,
        }
    }
}

/// Identity carried by a session. Credential material and the secret are
/// never copied into the session; handlers re-load the user by `id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub id: Uuid,
    pub username: Option<String>,
    pub google_id: Option<String>,
}

impl From<&User> for SessionIdentity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            google_id: user.google_id.clone(),
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user with local credentials.
    ///
    /// # Errors
    /// [`StoreError::UsernameTaken`] when the username already exists.
    async fn insert_local(&self, username: &str, password_hash: &str) -> Result<User, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Return the user owning `google_id`, creating it on first sight.
    /// Repeated calls with the same id always yield the same user.
    async fn find_or_create_by_google_id(&self, google_id: &str) -> Result<User, StoreError>;

    /// Overwrite the secret of user `id`. Returns `false` if there is no such user.
    async fn set_secret(&self, id: Uuid, secret: &str) -> Result<bool, StoreError>;

    /// Every non-empty secret, oldest update first.
    async fn list_secrets(&self) -> Result<Vec<String>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(
        &self,
        digest: &[u8],
        identity: &SessionIdentity,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Resolve a live session and push its expiry `ttl` into the future.
    async fn touch_session(
        &self,
        digest: &[u8],
        ttl: Duration,
    ) -> Result<Option<SessionIdentity>, StoreError>;

    async fn delete_session(&self, digest: &[u8]) -> Result<(), StoreError>;

    /// Drop expired sessions, returning how many were removed.
    async fn purge_expired_sessions(&self) -> Result<u64, StoreError>;
}
