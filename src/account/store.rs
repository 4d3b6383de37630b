//! Account persistence seam and the in-memory implementation.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::Account;

/// Outcome when attempting to insert a new account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    Conflict,
}

/// Durable account storage.
///
/// Implementations must make [`AccountStore::redeem_reset_token`] atomic:
/// the token predicate is re-checked as part of the write, so one token
/// can succeed at most once even under concurrent redemptions.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert an account with no reset token. Duplicate emails yield `Conflict`.
    async fn insert(&self, email: &str, credential_hash: &str) -> Result<CreateOutcome>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Replace any reset token on the account. Returns `false` if no account has `email`.
    async fn set_reset_token(
        &self,
        email: &str,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Find the account holding `token_hash` with an expiry strictly after `now`.
    async fn find_by_reset_token(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<Account>>;

    /// Overwrite the credential and clear the token, only if the token is still active at `now`.
    async fn redeem_reset_token(
        &self,
        token_hash: &[u8],
        credential_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Cheap liveness probe used by `/health`.
    async fn ping(&self) -> Result<()>;
}

/// Process-local store keyed by email, used for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }
}

fn token_is_active(account: &Account, token_hash: &[u8], now: DateTime<Utc>) -> bool {
    account.reset_token_hash.as_deref() == Some(token_hash)
        && account
            .reset_token_expires_at
            .is_some_and(|expires_at| expires_at > now)
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn insert(&self, email: &str, credential_hash: &str) -> Result<CreateOutcome> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(email) {
            return Ok(CreateOutcome::Conflict);
        }
        accounts.insert(
            email.to_string(),
            Account::new(email.to_string(), credential_hash.to_string()),
        );
        Ok(CreateOutcome::Created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self.accounts.read().await.get(email).cloned())
    }

    async fn set_reset_token(
        &self,
        email: &str,
        token_hash: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts.get_mut(email) else {
            return Ok(false);
        };
        account.reset_token_hash = Some(token_hash.to_vec());
        account.reset_token_expires_at = Some(expires_at);
        Ok(true)
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|account| token_is_active(account, token_hash, now))
            .cloned())
    }

    async fn redeem_reset_token(
        &self,
        token_hash: &[u8],
        credential_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        // Check and write under one lock so the token is consumed at most once.
        let mut accounts = self.accounts.write().await;
        let Some(account) = accounts
            .values_mut()
            .find(|account| token_is_active(account, token_hash, now))
        else {
            return Ok(false);
        };
        account.credential_hash = credential_hash.to_string();
        account.clear_reset_token();
        Ok(true)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[tokio::test]
    async fn insert_rejects_duplicate_email() -> Result<()> {
        let store = MemoryAccountStore::new();
        assert_eq!(
            store.insert("a@x.com", "hash-1").await?,
            CreateOutcome::Created
        );
        assert_eq!(
            store.insert("a@x.com", "hash-2").await?,
            CreateOutcome::Conflict
        );
        let account = store.find_by_email("a@x.com").await?.unwrap();
        assert_eq!(account.credential_hash, "hash-1");
        assert_eq!(store.len().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn set_reset_token_requires_account() -> Result<()> {
        let store = MemoryAccountStore::new();
        let expires_at = Utc::now() + TimeDelta::hours(1);
        assert!(!store.set_reset_token("nobody@x.com", b"h", expires_at).await?);
        assert!(store.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn find_by_reset_token_honors_expiry() -> Result<()> {
        let store = MemoryAccountStore::new();
        store.insert("a@x.com", "hash").await?;
        let now = Utc::now();
        let expires_at = now + TimeDelta::hours(1);
        store.set_reset_token("a@x.com", b"digest", expires_at).await?;

        assert!(store.find_by_reset_token(b"digest", now).await?.is_some());
        assert!(store.find_by_reset_token(b"other", now).await?.is_none());
        assert!(
            store
                .find_by_reset_token(b"digest", expires_at)
                .await?
                .is_none()
        );
        Ok(())
    }

    #[tokio::test]
    async fn redeem_consumes_token_once() -> Result<()> {
        let store = MemoryAccountStore::new();
        store.insert("a@x.com", "old").await?;
        let now = Utc::now();
        store
            .set_reset_token("a@x.com", b"digest", now + TimeDelta::hours(1))
            .await?;

        assert!(store.redeem_reset_token(b"digest", "new", now).await?);
        assert!(!store.redeem_reset_token(b"digest", "newer", now).await?);

        let account = store.find_by_email("a@x.com").await?.unwrap();
        assert_eq!(account.credential_hash, "new");
        assert!(account.reset_token_hash.is_none());
        assert!(account.reset_token_expires_at.is_none());
        Ok(())
    }
}
