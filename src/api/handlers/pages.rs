use axum::{extract::Extension, http::HeaderMap, response::Html, response::Response};
use std::sync::Arc;
use tracing::error;

use super::{html_with_cookies, internal_error};
use crate::api::{csrf, views, AppContext};

pub async fn home() -> Html<String> {
    Html(views::home())
}

pub async fn login_form(headers: HeaderMap, ctx: Extension<Arc<AppContext>>) -> Response {
    form_page(&headers, &ctx, views::login)
}

pub async fn register_form(headers: HeaderMap, ctx: Extension<Arc<AppContext>>) -> Response {
    form_page(&headers, &ctx, views::register)
}

pub(super) fn form_page(headers: &HeaderMap, ctx: &AppContext, render: fn(&str) -> String) -> Response {
    match csrf::issue(headers, ctx.secure_cookies()) {
        Ok((token, set_cookie)) => html_with_cookies(render(&token), set_cookie),
        Err(err) => {
            error!("Failed to issue csrf token: {err}");
            internal_error()
        }
    }
}
