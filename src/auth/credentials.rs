//! Local username/password credentials.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{rngs::OsRng, RngCore};
use std::sync::OnceLock;
use tokio::task;
use tracing::{debug, instrument};

use super::AuthError;
use crate::store::{User, UserStore};

const SALT_LEN: usize = 16;

/// Hash a password into an Argon2id PHC string with a random salt.
///
/// # Errors
/// Returns an error if the OS RNG or the hasher fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; SALT_LEN];
    OsRng.try_fill_bytes(&mut salt_bytes)?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::Hash(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Check `password` against a stored PHC string. Malformed hashes never match.
#[must_use]
pub fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

// Burned on unknown usernames so both failure paths cost one verification.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("secrets-dummy-password").ok())
        .as_deref()
}

/// Create a local user and return it.
///
/// # Errors
/// [`AuthError::MissingCredentials`] for empty input, [`AuthError::UsernameTaken`]
/// for duplicates, store and hashing failures otherwise.
#[instrument(skip(users, password))]
pub async fn register(
    users: &dyn UserStore,
    username: &str,
    password: &str,
) -> Result<User, AuthError> {
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let candidate = password.to_string();
    let hash = task::spawn_blocking(move || hash_password(&candidate))
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))??;

    let user = users.insert_local(username, &hash).await?;
    debug!(user_id = %user.id, "registered local user");
    Ok(user)
}

/// Verify a username/password pair.
///
/// # Errors
/// [`AuthError::InvalidCredentials`] whether the user is unknown or the
/// password is wrong; store failures are passed through.
#[instrument(skip(users, password))]
pub async fn authenticate(
    users: &dyn UserStore,
    username: &str,
    password: &str,
) -> Result<User, AuthError> {
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::InvalidCredentials);
    }

    let user = users.find_by_username(username).await?;
    let stored_hash = user.as_ref().and_then(|user| user.password_hash.clone());
    let candidate = password.to_string();

    let matches = task::spawn_blocking(move || match stored_hash {
        Some(hash) => verify_password(&hash, &candidate),
        None => {
            if let Some(dummy) = dummy_hash() {
                let _ = verify_password(dummy, &candidate);
            }
            false
        }
    })
    .await
    .map_err(|e| AuthError::Hash(e.to_string()))?;

    match user {
        Some(user) if matches => Ok(user),
        _ => Err(AuthError::InvalidCredentials),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn hash_password_salts_every_hash() -> Result<(), AuthError> {
        let first = hash_password("pw1")?;
        let second = hash_password("pw1")?;
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));
        assert!(verify_password(&first, "pw1"));
        assert!(verify_password(&second, "pw1"));
        assert!(!verify_password(&first, "pw2"));
        Ok(())
    }

    #[test]
    fn verify_password_rejects_malformed_hash() {
        assert!(!verify_password("not-a-phc-string", "pw1"));
        assert!(!verify_password("", ""));
    }

    #[tokio::test]
    async fn register_then_authenticate() -> Result<(), AuthError> {
        let store = MemoryStore::new();
        let registered = register(&store, "alice", "pw1").await?;
        let authenticated = authenticate(&store, "alice", "pw1").await?;
        assert_eq!(registered.id, authenticated.id);
        assert_ne!(registered.password_hash.as_deref(), Some("pw1"));
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_empty_fields() {
        let store = MemoryStore::new();
        assert!(matches!(
            register(&store, "", "pw1").await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            register(&store, "alice", "").await,
            Err(AuthError::MissingCredentials)
        ));
        assert_eq!(store.user_count().await, 0);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_username() -> Result<(), AuthError> {
        let store = MemoryStore::new();
        register(&store, "alice", "pw1").await?;
        assert!(matches!(
            register(&store, "alice", "pw2").await,
            Err(AuthError::UsernameTaken)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_look_the_same() -> Result<(), AuthError> {
        let store = MemoryStore::new();
        register(&store, "alice", "pw1").await?;

        let wrong_password = authenticate(&store, "alice", "nope").await;
        let unknown_user = authenticate(&store, "mallory", "pw1").await;

        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown_user, Err(AuthError::InvalidCredentials)));
        Ok(())
    }

    #[tokio::test]
    async fn federated_only_user_cannot_log_in_locally() -> Result<(), AuthError> {
        let store = MemoryStore::new();
        store.find_or_create_by_google_id("g123").await?;
        assert!(matches!(
            authenticate(&store, "g123", "anything").await,
            Err(AuthError::InvalidCredentials)
        ));
        Ok(())
    }
}
