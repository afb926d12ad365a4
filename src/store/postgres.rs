//! Postgres backend for users and sessions.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::time::Duration;
use tracing::{info_span, Instrument, Span};
use uuid::Uuid;

use super::{SessionIdentity, SessionStore, StoreError, User, UserStore};

pub const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const USER_COLUMNS: &str = "id, username, password_hash, google_id, secret";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes if they do not exist yet.
    ///
    /// # Errors
    /// Returns an error if any schema statement fails.
    pub async fn apply_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(db_span("CREATE", "schema.sql"))
            .await?;
        Ok(())
    }
}

fn db_span(operation: &str, statement: &str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        google_id: row.get("google_id"),
        secret: row.get("secret"),
    }
}

fn ttl_seconds(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_local(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let query = format!(
            "INSERT INTO users (id, username, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        let result = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(username)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .instrument(db_span("INSERT", &query))
            .await;

        match result {
            Ok(row) => Ok(user_from_row(&row)),
            Err(err) if is_unique_violation(&err) => Err(StoreError::UsernameTaken),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", &query))
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_or_create_by_google_id(&self, google_id: &str) -> Result<User, StoreError> {
        // The no-op update makes RETURNING yield the existing row on conflict,
        // so concurrent first logins still converge on one user.
        let query = format!(
            r"
            INSERT INTO users (id, google_id) VALUES ($1, $2)
            ON CONFLICT (google_id) DO UPDATE SET google_id = EXCLUDED.google_id
            RETURNING {USER_COLUMNS}
            "
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(google_id)
            .fetch_one(&self.pool)
            .instrument(db_span("UPSERT", &query))
            .await?;
        Ok(user_from_row(&row))
    }

    async fn set_secret(&self, id: Uuid, secret: &str) -> Result<bool, StoreError> {
        let query = "UPDATE users SET secret = $2, updated_at = NOW() WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .bind(secret)
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_secrets(&self) -> Result<Vec<String>, StoreError> {
        let query = r"
            SELECT secret FROM users
            WHERE secret IS NOT NULL AND secret <> ''
            ORDER BY updated_at ASC
        ";
        let rows = sqlx::query(query)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;
        Ok(rows.iter().map(|row| row.get("secret")).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .instrument(db_span("PING", "SELECT 1"))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(
        &self,
        digest: &[u8],
        identity: &SessionIdentity,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let identity_json = serde_json::to_string(identity)?;
        let query = r"
            INSERT INTO user_sessions (session_hash, user_id, identity_json, expires_at)
            VALUES ($1, $2, $3::jsonb, NOW() + ($4::float8 * INTERVAL '1 second'))
        ";
        sqlx::query(query)
            .bind(digest)
            .bind(identity.id)
            .bind(identity_json)
            .bind(ttl_seconds(ttl))
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await?;
        Ok(())
    }

    async fn touch_session(
        &self,
        digest: &[u8],
        ttl: Duration,
    ) -> Result<Option<SessionIdentity>, StoreError> {
        let query = r"
            UPDATE user_sessions
            SET expires_at = NOW() + ($2::float8 * INTERVAL '1 second')
            WHERE session_hash = $1 AND expires_at > NOW()
            RETURNING identity_json::text AS identity_json
        ";
        let row = sqlx::query(query)
            .bind(digest)
            .bind(ttl_seconds(ttl))
            .fetch_optional(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await?;

        match row {
            Some(row) => {
                let json: String = row.get("identity_json");
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }

    async fn delete_session(&self, digest: &[u8]) -> Result<(), StoreError> {
        let query = "DELETE FROM user_sessions WHERE session_hash = $1";
        sqlx::query(query)
            .bind(digest)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        Ok(())
    }

    async fn purge_expired_sessions(&self) -> Result<u64, StoreError> {
        let query = "DELETE FROM user_sessions WHERE expires_at <= NOW()";
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_both_tables() {
        assert!(SCHEMA_SQL.contains("CREATE TABLE IF NOT EXISTS users"));
        assert!(SCHEMA_SQL.contains("CREATE TABLE IF NOT EXISTS user_sessions"));
        assert!(SCHEMA_SQL.contains("google_id TEXT UNIQUE"));
    }

    #[test]
    fn ttl_seconds_saturates() {
        assert_eq!(ttl_seconds(Duration::from_secs(60)), 60);
        assert_eq!(ttl_seconds(Duration::from_secs(u64::MAX)), i64::MAX);
    }

    #[test]
    fn is_unique_violation_ignores_other_errors() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }
}
