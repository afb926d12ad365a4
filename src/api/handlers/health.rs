use axum::{
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info_span, Instrument};

use crate::{api::AppContext, GIT_COMMIT_HASH};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
}

// axum handler for health
pub async fn health(method: Method, ctx: Extension<Arc<AppContext>>) -> Response {
    let ping_span = info_span!("db.ping", db.operation = "PING");
    let result = ctx.users().ping().instrument(ping_span).await;
    if let Err(err) = &result {
        error!("Failed to ping store: {err}");
    }

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if result.is_ok() {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let status = if result.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&app_header()) {
        headers.insert("X-App", value);
    }

    if method == Method::HEAD {
        (status, headers).into_response()
    } else {
        (status, headers, Json(health)).into_response()
    }
}

fn app_header() -> String {
    let short_hash = if GIT_COMMIT_HASH.len() > 7 {
        GIT_COMMIT_HASH.get(0..7).unwrap_or("")
    } else {
        ""
    };
    format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_header_names_the_package() {
        let header = app_header();
        assert!(header.starts_with(concat!(
            env!("CARGO_PKG_NAME"),
            ":",
            env!("CARGO_PKG_VERSION"),
            ":"
        )));
    }
}
