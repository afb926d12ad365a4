//! Everything a handler needs, built once at startup and shared via `Extension`.

use std::sync::Arc;

use crate::{
    auth::{IdentityProvider, SessionManager},
    store::UserStore,
};

#[derive(Clone)]
pub struct AppContext {
    users: Arc<dyn UserStore>,
    sessions: SessionManager,
    identity_provider: Option<Arc<dyn IdentityProvider>>,
    secrets_require_auth: bool,
}

impl AppContext {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, sessions: SessionManager) -> Self {
        Self {
            users,
            sessions,
            identity_provider: None,
            secrets_require_auth: false,
        }
    }

    /// Enable `/auth/google`. Without a provider the route sends browsers back to `/login`.
    #[must_use]
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity_provider = Some(provider);
        self
    }

    /// Put `GET /secrets` behind login.
    #[must_use]
    pub fn with_secrets_require_auth(mut self, required: bool) -> Self {
        self.secrets_require_auth = required;
        self
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    #[must_use]
    pub fn identity_provider(&self) -> Option<&dyn IdentityProvider> {
        self.identity_provider.as_deref()
    }

    #[must_use]
    pub fn secrets_require_auth(&self) -> bool {
        self.secrets_require_auth
    }

    /// Whether cookies we set should carry `Secure`.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.sessions.config().secure_cookie()
    }
}
