//! Federated sign-in through an external identity provider (Google).
//!
//! The provider only proves who the browser is; the local user is resolved by
//! provider subject id alone. Accounts are never merged by email or username.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use super::AuthError;
use crate::store::{User, UserStore};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
const GOOGLE_SCOPE: &str = "profile";
const PROVIDER_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("identity provider answered {0}")]
    Status(StatusCode),
    #[error("identity provider returned a profile without subject")]
    InvalidProfile,
    #[error("invalid identity provider URL: {0}")]
    Url(#[from] url::ParseError),
}

/// What the provider tells us about the signed-in browser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FederatedProfile {
    pub subject: String,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Consent screen URL carrying the anti-forgery `state`.
    fn authorize_url(&self, state: &str) -> Url;

    /// Trade the callback `code` for the signed-in profile.
    async fn exchange(&self, code: &str) -> Result<FederatedProfile, ProviderError>;
}

#[derive(Clone)]
pub struct GoogleConfig {
    client_id: String,
    client_secret: SecretString,
    callback_url: Url,
    auth_url: Url,
    token_url: Url,
    userinfo_url: Url,
}

impl GoogleConfig {
    /// # Errors
    /// Returns an error if a built-in endpoint fails to parse.
    pub fn new(
        client_id: String,
        client_secret: SecretString,
        callback_url: Url,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client_id,
            client_secret,
            callback_url,
            auth_url: Url::parse(GOOGLE_AUTH_URL)?,
            token_url: Url::parse(GOOGLE_TOKEN_URL)?,
            userinfo_url: Url::parse(GOOGLE_USERINFO_URL)?,
        })
    }

    /// Point the provider at different endpoints, e.g. a local mock server.
    #[must_use]
    pub fn with_endpoints(mut self, auth_url: Url, token_url: Url, userinfo_url: Url) -> Self {
        self.auth_url = auth_url;
        self.token_url = token_url;
        self.userinfo_url = userinfo_url;
        self
    }
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("callback_url", &self.callback_url.as_str())
            .field("auth_url", &self.auth_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field("userinfo_url", &self.userinfo_url.as_str())
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    sub: String,
    name: Option<String>,
}

#[derive(Debug)]
pub struct GoogleProvider {
    config: GoogleConfig,
    client: Client,
}

impl GoogleProvider {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GoogleConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECONDS))
            .build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorize_url(&self, state: &str) -> Url {
        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.callback_url.as_str())
            .append_pair("response_type", "code")
            .append_pair("scope", GOOGLE_SCOPE)
            .append_pair("state", state);
        url
    }

    #[instrument(skip_all)]
    async fn exchange(&self, code: &str) -> Result<FederatedProfile, ProviderError> {
        let response = self
            .client
            .post(self.config.token_url.clone())
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.callback_url.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.expose_secret()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }
        let token: TokenResponse = response.json().await?;

        let response = self
            .client
            .get(self.config.userinfo_url.clone())
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }
        let info: UserInfo = response.json().await?;

        if info.sub.trim().is_empty() {
            return Err(ProviderError::InvalidProfile);
        }

        Ok(FederatedProfile {
            subject: info.sub,
            display_name: info.name,
        })
    }
}

/// Find or create the local user owning `profile`.
///
/// # Errors
/// Returns an error for an empty subject or a store failure.
#[instrument(skip_all, fields(subject = %profile.subject))]
pub async fn resolve_federated(
    users: &dyn UserStore,
    profile: &FederatedProfile,
) -> Result<User, AuthError> {
    if profile.subject.trim().is_empty() {
        return Err(ProviderError::InvalidProfile.into());
    }
    let user = users.find_or_create_by_google_id(&profile.subject).await?;
    debug!(user_id = %user.id, "resolved federated user");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use wiremock::{
        matchers::{body_string_contains, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn profile(subject: &str) -> FederatedProfile {
        FederatedProfile {
            subject: subject.to_string(),
            display_name: None,
        }
    }

    fn config_for(server: &MockServer) -> Result<GoogleConfig, ProviderError> {
        let base = Url::parse(&server.uri())?;
        Ok(GoogleConfig::new(
            "client-id".to_string(),
            SecretString::from("client-secret".to_string()),
            Url::parse("http://localhost:3000/auth/google/secrets")?,
        )?
        .with_endpoints(
            base.join("/auth")?,
            base.join("/token")?,
            base.join("/userinfo")?,
        ))
    }

    #[test]
    fn authorize_url_requests_profile_scope() -> Result<(), ProviderError> {
        let config = GoogleConfig::new(
            "client-id".to_string(),
            SecretString::from("client-secret".to_string()),
            Url::parse("http://localhost:3000/auth/google/secrets")?,
        )?;
        let provider = GoogleProvider::new(config)?;
        let url = provider.authorize_url("state-123");

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("scope".to_string(), "profile".to_string())));
        assert!(pairs.contains(&("state".to_string(), "state-123".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "http://localhost:3000/auth/google/secrets".to_string()
        )));
        Ok(())
    }

    #[test]
    fn debug_hides_client_secret() -> Result<(), ProviderError> {
        let config = GoogleConfig::new(
            "client-id".to_string(),
            SecretString::from("client-secret".to_string()),
            Url::parse("http://localhost:3000/auth/google/secrets")?,
        )?;
        let debug = format!("{config:?}");
        assert!(!debug.contains("client-secret"));
        Ok(())
    }

    #[tokio::test]
    async fn exchange_returns_subject() -> Result<(), ProviderError> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=the-code"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "at-1"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer at-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"sub": "g123", "name": "Alice"})),
            )
            .mount(&server)
            .await;

        let provider = GoogleProvider::new(config_for(&server)?)?;
        let profile = provider.exchange("the-code").await?;
        assert_eq!(profile.subject, "g123");
        assert_eq!(profile.display_name.as_deref(), Some("Alice"));
        Ok(())
    }

    #[tokio::test]
    async fn exchange_reports_rejected_code() -> Result<(), ProviderError> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let provider = GoogleProvider::new(config_for(&server)?)?;
        let result = provider.exchange("bad-code").await;
        assert!(matches!(
            result,
            Err(ProviderError::Status(StatusCode::BAD_REQUEST))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn resolve_federated_twice_yields_same_user() -> Result<(), AuthError> {
        let store = MemoryStore::new();
        let first = resolve_federated(&store, &profile("g123")).await?;
        let second = resolve_federated(&store, &profile("g123")).await?;
        assert_eq!(first.id, second.id);
        assert_eq!(store.user_count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn resolve_federated_rejects_blank_subject() {
        let store = MemoryStore::new();
        let result = resolve_federated(&store, &profile("  ")).await;
        assert!(matches!(
            result,
            Err(AuthError::Provider(ProviderError::InvalidProfile))
        ));
        assert_eq!(store.user_count().await, 0);
    }
}
