//! Listing and submitting secrets.

use axum::{
    extract::{rejection::FormRejection, Extension, Form},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::{forbidden, pages::form_page, redirect};
use crate::api::{csrf, views, AppContext};

#[derive(Deserialize, Debug, Default)]
pub struct SubmitForm {
    #[serde(default)]
    pub secret: String,
    #[serde(rename = "_csrf")]
    pub csrf: Option<String>,
}

/// `GET /secrets`
pub async fn list(headers: HeaderMap, ctx: Extension<Arc<AppContext>>) -> Response {
    let authenticated = ctx.sessions().is_authenticated(&headers).await;
    if ctx.secrets_require_auth() && !authenticated {
        return redirect("/login");
    }

    match ctx.users().list_secrets().await {
        Ok(secrets) => Html(views::secrets(&secrets, authenticated)).into_response(),
        Err(err) => {
            error!("Failed to list secrets: {err}");
            redirect("/")
        }
    }
}

/// `GET /submit`
pub async fn submit_form(headers: HeaderMap, ctx: Extension<Arc<AppContext>>) -> Response {
    if !ctx.sessions().is_authenticated(&headers).await {
        return redirect("/login");
    }
    form_page(&headers, &ctx, views::submit)
}

/// `POST /submit`
pub async fn submit(
    headers: HeaderMap,
    ctx: Extension<Arc<AppContext>>,
    form: Result<Form<SubmitForm>, FormRejection>,
) -> Response {
    let identity = match ctx.sessions().current_user(&headers).await {
        Ok(Some(identity)) => identity,
        Ok(None) => return redirect("/login"),
        Err(err) => {
            error!("Failed to lookup session: {err}");
            return redirect("/login");
        }
    };

    let Ok(Form(form)) = form else {
        warn!(user_id = %identity.id, "Rejected malformed submit form");
        return redirect("/submit");
    };

    if !csrf::verify(&headers, form.csrf.as_deref()) {
        return forbidden();
    }

    // The session only carries the identity; the write goes to the stored user.
    match ctx.users().set_secret(identity.id, &form.secret).await {
        Ok(true) => {
            info!(user_id = %identity.id, "secret updated");
            redirect("/secrets")
        }
        Ok(false) => {
            warn!(user_id = %identity.id, "session refers to a missing user");
            redirect("/login")
        }
        Err(err) => {
            error!("Failed to store secret: {err}");
            redirect("/submit")
        }
    }
}
