use crate::{
    api::{self, AppContext},
    auth::{spawn_session_reaper, GoogleConfig, GoogleProvider, SessionConfig, SessionManager},
    cli::telemetry,
    store::{PgStore, SessionStore, UserStore},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::info;
use url::Url;

const SESSION_REAP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug)]
pub struct GoogleArgs {
    pub client_id: String,
    pub client_secret: SecretString,
    pub callback_url: Url,
}

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub session_secret: SecretString,
    pub session_ttl_seconds: u64,
    pub secure_cookies: bool,
    pub secrets_require_auth: bool,
    pub google: Option<GoogleArgs>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be applied, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&args.dsn)
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(PgStore::new(pool));
    store
        .apply_schema()
        .await
        .context("Failed to apply database schema")?;

    let session_config = SessionConfig::new()
        .with_ttl_seconds(args.session_ttl_seconds)
        .with_secure_cookie(args.secure_cookies);

    let session_store: Arc<dyn SessionStore> = store.clone();
    let sessions = SessionManager::new(session_store.clone(), &args.session_secret, session_config)?;

    let users: Arc<dyn UserStore> = store;
    let mut ctx = AppContext::new(users, sessions).with_secrets_require_auth(args.secrets_require_auth);

    if let Some(google) = args.google {
        info!(callback_url = %google.callback_url, "Google sign-in enabled");
        let config = GoogleConfig::new(google.client_id, google.client_secret, google.callback_url)?;
        ctx = ctx.with_identity_provider(Arc::new(GoogleProvider::new(config)?));
    }

    let reaper = spawn_session_reaper(session_store, SESSION_REAP_INTERVAL);

    let result = api::new(args.port, Arc::new(ctx)).await;

    reaper.abort();
    telemetry::shutdown_tracer();

    result
}
