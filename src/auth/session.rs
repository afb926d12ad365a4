//! Cookie sessions backed by a [`SessionStore`].

use axum::http::{HeaderMap, HeaderValue};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::{debug, error, info};

use super::{cookie, AuthError};
use crate::store::{SessionIdentity, SessionStore, User};

pub const SESSION_COOKIE_NAME: &str = "secrets_session";
const DEFAULT_SESSION_TTL_SECONDS: u64 = 24 * 60 * 60;
/// Upper bound for the idle session lifetime (one year).
pub const MAX_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;
const TOKEN_BYTES: usize = 32;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    ttl: Duration,
    secure_cookie: bool,
}

impl SessionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECONDS),
            secure_cookie: false,
        }
    }

    /// Clamped to `1..=MAX_SESSION_TTL_SECONDS`.
    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: u64) -> Self {
        self.ttl = Duration::from_secs(seconds.clamp(1, MAX_SESSION_TTL_SECONDS));
        self
    }

    #[must_use]
    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn secure_cookie(&self) -> bool {
        self.secure_cookie
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Issues session cookies and resolves them back to an identity.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    mac: HmacSha256,
    config: SessionConfig,
}

impl SessionManager {
    /// # Errors
    /// [`AuthError::InvalidSessionKey`] when `secret` is empty.
    pub fn new(
        store: Arc<dyn SessionStore>,
        secret: &SecretString,
        config: SessionConfig,
    ) -> Result<Self, AuthError> {
        let key = secret.expose_secret();
        if key.is_empty() {
            return Err(AuthError::InvalidSessionKey);
        }
        let mac = HmacSha256::new_from_slice(key.as_bytes())
            .map_err(|_| AuthError::InvalidSessionKey)?;
        Ok(Self { store, mac, config })
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // Only this keyed digest is persisted, never the cookie value itself.
    fn digest(&self, token: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Resolve the request's session, extending its expiry.
    ///
    /// # Errors
    /// Returns an error if the session store fails.
    pub async fn current_user(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<SessionIdentity>, AuthError> {
        let Some(token) = cookie::read(headers, SESSION_COOKIE_NAME) else {
            return Ok(None);
        };
        let identity = self
            .store
            .touch_session(&self.digest(&token), self.config.ttl)
            .await?;
        Ok(identity)
    }

    /// Store failures count as anonymous.
    pub async fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        match self.current_user(headers).await {
            Ok(identity) => identity.is_some(),
            Err(err) => {
                error!("Failed to lookup session: {err}");
                false
            }
        }
    }

    /// Start a session for `user`, returning the `Set-Cookie` value.
    ///
    /// A session already presented by the request is dropped first so a
    /// planted cookie cannot be promoted to an authenticated one.
    ///
    /// # Errors
    /// Returns an error if token generation or the session store fails.
    pub async fn login(&self, headers: &HeaderMap, user: &User) -> Result<HeaderValue, AuthError> {
        if let Some(previous) = cookie::read(headers, SESSION_COOKIE_NAME) {
            self.store.delete_session(&self.digest(&previous)).await?;
        }

        let token = generate_token()?;
        let identity = SessionIdentity::from(user);
        self.store
            .insert_session(&self.digest(&token), &identity, self.config.ttl)
            .await?;
        debug!(user_id = %user.id, "session established");

        // Idle expiry is tracked server side by `touch_session`.
        Ok(cookie::build_session(
            SESSION_COOKIE_NAME,
            &token,
            self.config.secure_cookie,
        )?)
    }

    /// End the request's session, returning a cookie-clearing `Set-Cookie`.
    ///
    /// # Errors
    /// Returns an error only if the clearing cookie cannot be built; store
    /// failures are logged and the cookie is cleared anyway.
    pub async fn logout(&self, headers: &HeaderMap) -> Result<HeaderValue, AuthError> {
        if let Some(token) = cookie::read(headers, SESSION_COOKIE_NAME) {
            if let Err(err) = self.store.delete_session(&self.digest(&token)).await {
                error!("Failed to delete session: {err}");
            }
        }
        Ok(cookie::clear(
            SESSION_COOKIE_NAME,
            self.config.secure_cookie,
        )?)
    }
}

/// Random URL-safe token for cookies.
///
/// # Errors
/// Returns an error if the OS RNG fails.
pub fn generate_token() -> Result<String, AuthError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Periodically delete expired sessions.
pub fn spawn_session_reaper(
    store: Arc<dyn SessionStore>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            match store.purge_expired_sessions().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "purged expired sessions"),
                Err(err) => error!("session purge failed: {err}"),
            }
        }
    })
}
