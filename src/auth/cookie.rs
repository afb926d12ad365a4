//! Cookie header helpers shared by sessions, CSRF tokens and OAuth state.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};

/// Read cookie `name` from the request headers.
#[must_use]
pub fn read(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let key = parts.next()?.trim();
            let val = parts.next()?.trim();
            (key == name && !val.is_empty()).then(|| val.to_string())
        })
}

/// Build an `HttpOnly` cookie scoped to the whole site.
///
/// # Errors
/// Returns an error if `value` contains characters not allowed in a header.
pub fn build(
    name: &str,
    value: &str,
    max_age_seconds: u64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    render(name, value, Some(max_age_seconds), secure)
}

/// Like [`build`] but without `Max-Age`: the browser keeps it until it is
/// closed and the server alone decides when it stops being valid.
///
/// # Errors
/// Returns an error if `value` contains characters not allowed in a header.
pub fn build_session(
    name: &str,
    value: &str,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    render(name, value, None, secure)
}

fn render(
    name: &str,
    value: &str,
    max_age_seconds: Option<u64>,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
    if let Some(max_age) = max_age_seconds {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Build a cookie that makes the browser forget `name`.
///
/// # Errors
/// Returns an error if `name` contains characters not allowed in a header.
pub fn clear(name: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    build(name, "", 0, secure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_finds_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; secrets_session=abc123; lang=en"),
        );
        assert_eq!(read(&headers, "secrets_session"), Some("abc123".to_string()));
        assert_eq!(read(&headers, "missing"), None);
    }

    #[test]
    fn read_scans_multiple_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("b=2"));
        assert_eq!(read(&headers, "b"), Some("2".to_string()));
    }

    #[test]
    fn read_ignores_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("secrets_session="));
        assert_eq!(read(&headers, "secrets_session"), None);
    }

    #[test]
    fn build_marks_secure_only_when_asked() -> Result<(), InvalidHeaderValue> {
        let plain = build("k", "v", 60, false)?;
        assert_eq!(plain, "k=v; Path=/; HttpOnly; SameSite=Lax; Max-Age=60");

        let secure = build("k", "v", 60, true)?;
        assert!(secure.to_str().is_ok_and(|s| s.ends_with("; Secure")));
        Ok(())
    }

    #[test]
    fn build_session_has_no_max_age() -> Result<(), InvalidHeaderValue> {
        let cookie = build_session("k", "v", true)?;
        assert_eq!(cookie, "k=v; Path=/; HttpOnly; SameSite=Lax; Secure");
        Ok(())
    }

    #[test]
    fn clear_expires_immediately() -> Result<(), InvalidHeaderValue> {
        let cleared = clear("k", false)?;
        assert_eq!(cleared, "k=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
        Ok(())
    }
}
