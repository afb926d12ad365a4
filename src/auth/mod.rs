//! Authentication: local credentials, Google sign-in and cookie sessions.
//!
//! ## Session lifecycle
//!
//! A browser starts Anonymous. A successful [`credentials::authenticate`],
//! [`credentials::register`] or [`federated::resolve_federated`] is followed by
//! [`session::SessionManager::login`], which stores the user's identity under
//! a fresh random token and hands the token back as the `secrets_session`
//! cookie. Only an HMAC of the token is persisted. Logging out or letting the
//! session sit idle past its TTL returns the browser to Anonymous.
//!
//! Local login failures never reveal whether the username exists.

pub mod cookie;
pub mod credentials;
pub mod federated;
pub mod session;

use axum::http::header::InvalidHeaderValue;
use thiserror::Error;

use crate::store::StoreError;

pub use credentials::{authenticate, register};
pub use federated::{
    resolve_federated, FederatedProfile, GoogleConfig, GoogleProvider, IdentityProvider,
    ProviderError,
};
pub use session::{
    spawn_session_reaper, SessionConfig, SessionManager, MAX_SESSION_TTL_SECONDS,
};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username and password are required")]
    MissingCredentials,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("username already registered")]
    UsernameTaken,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("failed to generate random token: {0}")]
    Random(#[from] rand::Error),
    #[error("session secret must not be empty")]
    InvalidSessionKey,
    #[error("invalid cookie value: {0}")]
    Cookie(#[from] InvalidHeaderValue),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken => Self::UsernameTaken,
            other => Self::Store(other),
        }
    }
}
