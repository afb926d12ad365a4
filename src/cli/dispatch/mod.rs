//! Map validated command-line arguments to an [`Action`].

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{
    google, ARG_BASE_URL, ARG_DSN, ARG_PORT, ARG_SECRETS_REQUIRE_AUTH, ARG_SESSION_SECRET,
    ARG_SESSION_TTL_SECONDS,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use url::Url;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(3000);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let session_secret = matches
        .get_one::<String>(ARG_SESSION_SECRET)
        .cloned()
        .filter(|secret| !secret.is_empty())
        .context("missing required argument: --session-secret")?;
    let session_ttl_seconds = matches
        .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
        .copied()
        .unwrap_or(86_400);
    let base_url = matches
        .get_one::<String>(ARG_BASE_URL)
        .map_or("http://localhost:3000", String::as_str);
    let base_url = Url::parse(base_url).context("invalid --base-url")?;

    let google = google::Options::parse(matches)?
        .map(|options| -> Result<_> {
            let callback_url = match options.callback_url {
                Some(url) => Url::parse(&url).context("invalid --google-callback-url")?,
                None => base_url
                    .join("/auth/google/secrets")
                    .context("invalid --base-url")?,
            };
            Ok(crate::cli::actions::server::GoogleArgs {
                client_id: options.client_id,
                client_secret: SecretString::from(options.client_secret),
                callback_url,
            })
        })
        .transpose()?;

    Ok(Action::Server(Args {
        port,
        dsn,
        session_secret: SecretString::from(session_secret),
        session_ttl_seconds,
        secure_cookies: base_url.scheme() == "https",
        secrets_require_auth: matches.get_flag(ARG_SECRETS_REQUIRE_AUTH),
        google,
    }))
}
