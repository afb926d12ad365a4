//! # Secrets
//!
//! A small web app where every user may post one anonymous secret and anyone
//! can read the list of secrets.
//!
//! ## Sign-in
//!
//! Users either register a local account (username plus argon2-hashed
//! password) or sign in with Google. A successful sign-in starts a server-side
//! session referenced by an opaque cookie; the database only keeps a keyed
//! digest of that cookie.
//!
//! ## Secrets
//!
//! A signed-in user may submit a secret, replacing any earlier one. The
//! `/secrets` page lists every non-empty secret without saying who wrote it.

pub mod api;
pub mod auth;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with("secrets/"));
        assert!(APP_USER_AGENT.ends_with(env!("CARGO_PKG_VERSION")));
    }
}
