use clap::{Arg, ArgMatches, Command};

pub const ARG_GOOGLE_CLIENT_ID: &str = "google-client-id";
pub const ARG_GOOGLE_CLIENT_SECRET: &str = "google-client-secret";
pub const ARG_GOOGLE_CALLBACK_URL: &str = "google-callback-url";

/// Google sign-in settings; `None` when no client id is configured.
#[derive(Debug)]
pub struct Options {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: Option<String>,
}

impl Options {
    /// Parse Google arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a client id is given without a client secret.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Option<Self>> {
        let read = |id: &str| -> Option<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let Some(client_id) = read(ARG_GOOGLE_CLIENT_ID) else {
            return Ok(None);
        };

        let client_secret = read(ARG_GOOGLE_CLIENT_SECRET).ok_or_else(|| {
            anyhow::anyhow!("missing required argument: --{ARG_GOOGLE_CLIENT_SECRET}")
        })?;

        Ok(Some(Self {
            client_id,
            client_secret,
            callback_url: read(ARG_GOOGLE_CALLBACK_URL),
        }))
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_ID)
                .long(ARG_GOOGLE_CLIENT_ID)
                .help("Google OAuth2 client id, enables \"Sign in with Google\"")
                .env("SECRETS_GOOGLE_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_SECRET)
                .long(ARG_GOOGLE_CLIENT_SECRET)
                .help("Google OAuth2 client secret")
                .env("SECRETS_GOOGLE_CLIENT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CALLBACK_URL)
                .long(ARG_GOOGLE_CALLBACK_URL)
                .help("OAuth2 redirect URI (default: <base-url>/auth/google/secrets)")
                .env("SECRETS_GOOGLE_CALLBACK_URL"),
        )
}
