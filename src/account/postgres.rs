//! PostgreSQL-backed [`AccountStore`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Connection, PgPool, Row, postgres::PgRow};
use tracing::{Instrument, info_span};

use super::{
    Account,
    store::{AccountStore, CreateOutcome},
};

const ACCOUNTS_SCHEMA_SQL: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/sql/schema.sql"
));

macro_rules! db_span {
    ($operation:literal, $query:expr) => {
        info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = $operation,
            db.statement = $query
        )
    };
}

#[derive(Clone, Debug)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `accounts` table and token index if they do not exist.
    ///
    /// # Errors
    /// Returns an error if the schema statements fail.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(ACCOUNTS_SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "CREATE"
            ))
            .await
            .context("failed to apply accounts schema")?;
        Ok(())
    }
}

fn account_from_row(row: &PgRow) -> Account {
    Account {
        email: row.get("email"),
        credential_hash: row.get("credential_hash"),
        reset_token_hash: row.get("reset_token_hash"),
        reset_token_expires_at: row.get("reset_token_expires_at"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn insert(&self, email: &str, credential_hash: &str) -> Result<CreateOutcome> {
        let query = "INSERT INTO accounts (email, credential_hash) VALUES ($1, $2)";
        let result = sqlx::query(query)
            .bind(email)
            .bind(credential_hash)
            .execute(&self.pool)
            .instrument(db_span!("INSERT", query))
            .await;

        match result {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert account"),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let query = r"
            SELECT email, credential_hash, reset_token_hash, reset_token_expires_at
            FROM accounts
            WHERE email = $1
        ";
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(db_span!("SELECT", query))
            .await
            .context("failed to lookup account by email")?;

        Ok(row.as_ref().map(account_from_row))
    }

    async fn set_reset_token(
        &self,
        email: &str,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let query = r"
            UPDATE accounts
            SET reset_token_hash = $2,
                reset_token_expires_at = $3,
                updated_at = NOW()
            WHERE email = $1
        ";
        let result = sqlx::query(query)
            .bind(email)
            .bind(token_hash)
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(db_span!("UPDATE", query))
            .await
            .context("failed to store reset token")?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        let query = r"
            SELECT email, credential_hash, reset_token_hash, reset_token_expires_at
            FROM accounts
            WHERE reset_token_hash = $1
              AND reset_token_expires_at > $2
        ";
        let row = sqlx::query(query)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .instrument(db_span!("SELECT", query))
            .await
            .context("failed to lookup account by reset token")?;

        Ok(row.as_ref().map(account_from_row))
    }

    async fn redeem_reset_token(
        &self,
        token_hash: &[u8],
        credential_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        // The predicate is repeated here so a concurrent redemption that won
        // the race leaves this one with zero rows.
        let query = r"
            UPDATE accounts
            SET credential_hash = $2,
                reset_token_hash = NULL,
                reset_token_expires_at = NULL,
                updated_at = NOW()
            WHERE reset_token_hash = $1
              AND reset_token_expires_at > $3
        ";
        let result = sqlx::query(query)
            .bind(token_hash)
            .bind(credential_hash)
            .bind(now)
            .execute(&self.pool)
            .instrument(db_span!("UPDATE", query))
            .await
            .context("failed to redeem reset token")?;

        Ok(result.rows_affected() == 1)
    }

    async fn ping(&self) -> Result<()> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;

        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")
    }
}

/// These run against a real database only when `PASSRESET_TEST_DSN` is set.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use sqlx::postgres::PgPoolOptions;
    use ulid::Ulid;

    async fn store() -> Result<Option<PgAccountStore>> {
        let Ok(dsn) = std::env::var("PASSRESET_TEST_DSN") else {
            return Ok(None);
        };
        let pool = PgPoolOptions::new().max_connections(2).connect(&dsn).await?;
        let store = PgAccountStore::new(pool);
        store.ensure_schema().await?;
        Ok(Some(store))
    }

    fn unique_email() -> String {
        format!("{}@example.com", Ulid::new().to_string().to_lowercase())
    }

    #[test]
    fn unique_violation_ignores_other_errors() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[tokio::test]
    async fn insert_and_conflict() -> Result<()> {
        let Some(store) = store().await? else {
            return Ok(());
        };
        let email = unique_email();
        assert_eq!(store.insert(&email, "h1").await?, CreateOutcome::Created);
        assert_eq!(store.insert(&email, "h2").await?, CreateOutcome::Conflict);
        store.ping().await?;
        Ok(())
    }

    #[tokio::test]
    async fn reset_token_lifecycle() -> Result<()> {
        let Some(store) = store().await? else {
            return Ok(());
        };
        let email = unique_email();
        let digest = Ulid::new().to_bytes().to_vec();
        let now = Utc::now();
        store.insert(&email, "old").await?;
        assert!(
            store
                .set_reset_token(&email, &digest, now + TimeDelta::hours(1))
                .await?
        );

        let found = store.find_by_reset_token(&digest, now).await?.unwrap();
        assert_eq!(found.email, email);
        assert!(
            store
                .find_by_reset_token(&digest, now + TimeDelta::hours(2))
                .await?
                .is_none()
        );

        assert!(store.redeem_reset_token(&digest, "new", now).await?);
        assert!(!store.redeem_reset_token(&digest, "newer", now).await?);

        let account = store.find_by_email(&email).await?.unwrap();
        assert_eq!(account.credential_hash, "new");
        assert!(!account.has_reset_token());
        Ok(())
    }
}
