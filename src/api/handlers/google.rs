//! Google sign-in: consent redirect and callback.

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, HeaderValue},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{redirect, redirect_with_cookies};
use crate::{
    api::AppContext,
    auth::{cookie, resolve_federated, session::generate_token, AuthError},
};

pub const OAUTH_STATE_COOKIE_NAME: &str = "secrets_oauth_state";
const OAUTH_STATE_TTL_SECONDS: u64 = 10 * 60;

#[derive(Deserialize, Debug, Default)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// `GET /auth/google`
pub async fn start(ctx: Extension<Arc<AppContext>>) -> Response {
    let Some(provider) = ctx.identity_provider() else {
        warn!("Google sign-in requested but no client is configured");
        return redirect("/login");
    };

    let state = match generate_token() {
        Ok(state) => state,
        Err(err) => {
            error!("Failed to generate oauth state: {err}");
            return redirect("/login");
        }
    };

    match cookie::build(
        OAUTH_STATE_COOKIE_NAME,
        &state,
        OAUTH_STATE_TTL_SECONDS,
        ctx.secure_cookies(),
    ) {
        Ok(state_cookie) => {
            redirect_with_cookies(provider.authorize_url(&state).as_str(), [state_cookie])
        }
        Err(err) => {
            error!("Failed to build oauth state cookie: {err}");
            redirect("/login")
        }
    }
}

/// `GET /auth/google/secrets`
pub async fn callback(
    headers: HeaderMap,
    ctx: Extension<Arc<AppContext>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    // The state cookie is single use, whatever the outcome.
    let mut cookies: Vec<HeaderValue> = cookie::clear(OAUTH_STATE_COOKIE_NAME, ctx.secure_cookies())
        .into_iter()
        .collect();

    match complete_sign_in(&headers, &ctx, query).await {
        Ok(session_cookie) => {
            cookies.push(session_cookie);
            redirect_with_cookies("/secrets", cookies)
        }
        Err(err) => {
            warn!("Google sign-in failed: {err}");
            redirect_with_cookies("/login", cookies)
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CallbackError {
    #[error("google sign-in is not configured")]
    NotConfigured,
    #[error("provider returned error: {0}")]
    Denied(String),
    #[error("state mismatch")]
    StateMismatch,
    #[error("missing authorization code")]
    MissingCode,
    #[error(transparent)]
    Auth(#[from] AuthError),
}

async fn complete_sign_in(
    headers: &HeaderMap,
    ctx: &AppContext,
    query: CallbackQuery,
) -> Result<HeaderValue, CallbackError> {
    let provider = ctx
        .identity_provider()
        .ok_or(CallbackError::NotConfigured)?;

    if let Some(error) = query.error {
        return Err(CallbackError::Denied(error));
    }

    let expected = cookie::read(headers, OAUTH_STATE_COOKIE_NAME);
    match (expected, query.state) {
        (Some(expected), Some(state)) if expected == state => {}
        _ => return Err(CallbackError::StateMismatch),
    }

    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or(CallbackError::MissingCode)?;

    let profile = provider.exchange(&code).await.map_err(AuthError::from)?;
    let user = resolve_federated(ctx.users(), &profile).await?;
    info!(
        user_id = %user.id,
        display_name = profile.display_name.as_deref().unwrap_or("-"),
        "google sign-in succeeded"
    );

    Ok(ctx.sessions().login(headers, &user).await?)
}
