//! In-process backend. Nothing survives a restart.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SessionIdentity, SessionStore, StoreError, User, UserStore};

#[derive(Debug)]
struct UserEntry {
    user: User,
    // Monotonic write counter, drives `list_secrets` ordering.
    revision: u64,
}

#[derive(Debug, Default)]
struct Users {
    by_id: HashMap<Uuid, UserEntry>,
    revision: u64,
}

impl Users {
    fn insert(&mut self, user: User) -> User {
        self.revision += 1;
        let entry = UserEntry {
            user: user.clone(),
            revision: self.revision,
        };
        self.by_id.insert(user.id, entry);
        user
    }
}

#[derive(Debug)]
struct SessionEntry {
    identity: SessionIdentity,
    expires_at: Instant,
}

fn expiry(now: Instant, ttl: Duration) -> Result<Instant, StoreError> {
    now.checked_add(ttl).ok_or(StoreError::TtlOutOfRange)
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<Users>,
    sessions: RwLock<HashMap<Vec<u8>, SessionEntry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn user_count(&self) -> usize {
        self.users.read().await.by_id.len()
    }

    /// Number of stored sessions, expired or not.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_local(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let taken = users
            .by_id
            .values()
            .any(|entry| entry.user.username.as_deref() == Some(username));
        if taken {
            return Err(StoreError::UsernameTaken);
        }
        Ok(users.insert(User::new_local(username, password_hash)))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .by_id
            .values()
            .find(|entry| entry.user.username.as_deref() == Some(username))
            .map(|entry| entry.user.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.by_id.get(&id).map(|entry| entry.user.clone()))
    }

    async fn find_or_create_by_google_id(&self, google_id: &str) -> Result<User, StoreError> {
        // Lookup and insert happen under one write lock.
        let mut users = self.users.write().await;
        if let Some(entry) = users
            .by_id
            .values()
            .find(|entry| entry.user.google_id.as_deref() == Some(google_id))
        {
            return Ok(entry.user.clone());
        }
        Ok(users.insert(User::new_federated(google_id)))
    }

    async fn set_secret(&self, id: Uuid, secret: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        users.revision += 1;
        let revision = users.revision;
        match users.by_id.get_mut(&id) {
            Some(entry) => {
                entry.user.secret = Some(secret.to_string());
                entry.revision = revision;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_secrets(&self) -> Result<Vec<String>, StoreError> {
        let users = self.users.read().await;
        let mut entries: Vec<&UserEntry> = users
            .by_id
            .values()
            .filter(|entry| entry.user.secret.as_deref().is_some_and(|s| !s.is_empty()))
            .collect();
        entries.sort_by_key(|entry| entry.revision);
        Ok(entries
            .into_iter()
            .filter_map(|entry| entry.user.secret.clone())
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(
        &self,
        digest: &[u8],
        identity: &SessionIdentity,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let expires_at = expiry(Instant::now(), ttl)?;
        self.sessions.write().await.insert(
            digest.to_vec(),
            SessionEntry {
                identity: identity.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn touch_session(
        &self,
        digest: &[u8],
        ttl: Duration,
    ) -> Result<Option<SessionIdentity>, StoreError> {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        match sessions.get_mut(digest) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = expiry(now, ttl)?;
                Ok(Some(entry.identity.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_session(&self, digest: &[u8]) -> Result<(), StoreError> {
        self.sessions.write().await.remove(digest);
        Ok(())
    }

    async fn purge_expired_sessions(&self) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        Ok(u64::try_from(before - sessions.len()).unwrap_or(u64::MAX))
    }
}
