//! Route handlers and the response helpers they share.
//!
//! Every failure a browser can cause ends in a redirect to the form it came
//! from (or `/login`); details only go to the log.

pub mod google;
pub mod health;
pub mod local;
pub mod pages;
pub mod secrets;

use axum::{
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

/// Form body shared by `POST /login` and `POST /register`.
#[derive(Deserialize, Debug, Default)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(rename = "_csrf")]
    pub csrf: Option<String>,
}

fn cookie_headers<I>(cookies: I) -> HeaderMap
where
    I: IntoIterator<Item = HeaderValue>,
{
    let mut headers = HeaderMap::new();
    for cookie in cookies {
        headers.append(SET_COOKIE, cookie);
    }
    headers
}

pub(crate) fn redirect(location: &str) -> Response {
    Redirect::to(location).into_response()
}

pub(crate) fn redirect_with_cookies<I>(location: &str, cookies: I) -> Response
where
    I: IntoIterator<Item = HeaderValue>,
{
    (cookie_headers(cookies), Redirect::to(location)).into_response()
}

pub(crate) fn html_with_cookies<I>(page: String, cookies: I) -> Response
where
    I: IntoIterator<Item = HeaderValue>,
{
    (cookie_headers(cookies), Html(page)).into_response()
}

pub(crate) fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, "invalid csrf token").into_response()
}

pub(crate) fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::LOCATION;

    #[test]
    fn redirect_with_cookies_keeps_every_cookie() {
        let response = redirect_with_cookies(
            "/secrets",
            [
                HeaderValue::from_static("a=1"),
                HeaderValue::from_static("b=2"),
            ],
        );
        assert!(response.status().is_redirection());
        assert_eq!(
            response.headers().get(LOCATION),
            Some(&HeaderValue::from_static("/secrets"))
        );
        assert_eq!(response.headers().get_all(SET_COOKIE).iter().count(), 2);
    }

    #[test]
    fn credentials_form_defaults_missing_fields() -> Result<(), serde_json::Error> {
        let form: CredentialsForm = serde_json::from_str(r#"{"_csrf":"tok"}"#)?;
        assert!(form.username.is_empty());
        assert!(form.password.is_empty());
        assert_eq!(form.csrf.as_deref(), Some("tok"));
        Ok(())
    }
}
