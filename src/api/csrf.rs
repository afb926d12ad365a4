//! Double-submit CSRF tokens for the HTML forms.
//!
//! Rendering a form reuses the browser's `secrets_csrf` cookie (or mints one)
//! and embeds the same value as the hidden `_csrf` field. A POST is accepted
//! only when both are present and equal.

use axum::http::{HeaderMap, HeaderValue};

use crate::auth::{cookie, session::generate_token, AuthError};

pub const CSRF_COOKIE_NAME: &str = "secrets_csrf";
const CSRF_TTL_SECONDS: u64 = 60 * 60;

/// Return the token to embed and, if a new one was minted, its `Set-Cookie`.
///
/// # Errors
/// Returns an error if token generation fails.
pub fn issue(
    headers: &HeaderMap,
    secure: bool,
) -> Result<(String, Option<HeaderValue>), AuthError> {
    if let Some(token) = cookie::read(headers, CSRF_COOKIE_NAME) {
        return Ok((token, None));
    }
    let token = generate_token()?;
    let set_cookie = cookie::build(CSRF_COOKIE_NAME, &token, CSRF_TTL_SECONDS, secure)?;
    Ok((token, Some(set_cookie)))
}

#[must_use]
pub fn verify(headers: &HeaderMap, submitted: Option<&str>) -> bool {
    match (cookie::read(headers, CSRF_COOKIE_NAME), submitted) {
        (Some(expected), Some(submitted)) => expected == submitted,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    #[test]
    fn issue_reuses_existing_cookie() -> Result<(), AuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("secrets_csrf=tok"));
        let (token, set_cookie) = issue(&headers, false)?;
        assert_eq!(token, "tok");
        assert!(set_cookie.is_none());
        Ok(())
    }

    #[test]
    fn issue_mints_cookie_when_missing() -> Result<(), AuthError> {
        let (token, set_cookie) = issue(&HeaderMap::new(), true)?;
        let set_cookie = set_cookie.and_then(|v| v.to_str().ok().map(str::to_string));
        assert!(set_cookie.is_some_and(|v| v.starts_with(&format!("secrets_csrf={token};"))
            && v.ends_with("; Secure")));
        Ok(())
    }

    #[test]
    fn verify_requires_matching_pair() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("secrets_csrf=tok"));
        assert!(verify(&headers, Some("tok")));
        assert!(!verify(&headers, Some("other")));
        assert!(!verify(&headers, None));
        assert!(!verify(&HeaderMap::new(), Some("tok")));
    }
}
