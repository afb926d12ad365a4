//! Local registration, login and logout.

use axum::{
    extract::{rejection::FormRejection, Extension, Form},
    http::HeaderMap,
    response::Response,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::{forbidden, redirect, redirect_with_cookies, CredentialsForm};
use crate::{
    api::{csrf, AppContext},
    auth::{self, AuthError},
};

#[instrument(skip_all, fields(username = tracing::field::Empty))]
pub async fn register(
    headers: HeaderMap,
    ctx: Extension<Arc<AppContext>>,
    form: Result<Form<CredentialsForm>, FormRejection>,
) -> Response {
    let Ok(Form(form)) = form else {
        warn!("Rejected malformed register form");
        return redirect("/register");
    };
    tracing::Span::current().record("username", form.username.as_str());

    if !csrf::verify(&headers, form.csrf.as_deref()) {
        return forbidden();
    }

    let user = match auth::register(ctx.users(), &form.username, &form.password).await {
        Ok(user) => user,
        Err(err @ (AuthError::MissingCredentials | AuthError::UsernameTaken)) => {
            info!("Registration rejected: {err}");
            return redirect("/register");
        }
        Err(err) => {
            error!("Registration failed: {err}");
            return redirect("/register");
        }
    };

    match ctx.sessions().login(&headers, &user).await {
        Ok(cookie) => redirect_with_cookies("/secrets", [cookie]),
        Err(err) => {
            // The account exists now; let the user sign in normally.
            error!("Failed to start session after registration: {err}");
            redirect("/login")
        }
    }
}

#[instrument(skip_all, fields(username = tracing::field::Empty))]
pub async fn login(
    headers: HeaderMap,
    ctx: Extension<Arc<AppContext>>,
    form: Result<Form<CredentialsForm>, FormRejection>,
) -> Response {
    let Ok(Form(form)) = form else {
        warn!("Rejected malformed login form");
        return redirect("/login");
    };
    tracing::Span::current().record("username", form.username.as_str());

    if !csrf::verify(&headers, form.csrf.as_deref()) {
        return forbidden();
    }

    let user = match auth::authenticate(ctx.users(), &form.username, &form.password).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            warn!("Login failed: invalid credentials");
            return redirect("/login");
        }
        Err(err) => {
            error!("Login failed: {err}");
            return redirect("/login");
        }
    };

    match ctx.sessions().login(&headers, &user).await {
        Ok(cookie) => redirect_with_cookies("/secrets", [cookie]),
        Err(err) => {
            error!("Failed to start session: {err}");
            redirect("/login")
        }
    }
}

pub async fn logout(headers: HeaderMap, ctx: Extension<Arc<AppContext>>) -> Response {
    match ctx.sessions().logout(&headers).await {
        Ok(cookie) => redirect_with_cookies("/", [cookie]),
        Err(err) => {
            error!("Failed to clear session cookie: {err}");
            redirect("/")
        }
    }
}
