use anyhow::{Context, anyhow};
use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
    CredentialError, CredentialHasher,
    notify::{ResetLink, ResetLinkSender},
    store::{AccountStore, CreateOutcome},
    token::{build_reset_url, generate_reset_token, hash_reset_token},
};

/// Default reset token lifetime: one hour.
const DEFAULT_RESET_TOKEN_TTL_SECONDS: i64 = 3600;

/// Longest accepted reset token lifetime: 365 days.
pub const MAX_RESET_TOKEN_TTL_SECONDS: i64 = 31_536_000;

/// Reset token settings.
#[derive(Clone, Debug)]
pub struct ResetConfig {
    reset_base_url: String,
    token_ttl: TimeDelta,
}

impl ResetConfig {
    #[must_use]
    pub fn new(reset_base_url: String) -> Self {
        Self {
            reset_base_url,
            token_ttl: TimeDelta::seconds(DEFAULT_RESET_TOKEN_TTL_SECONDS),
        }
    }

    /// Non-positive values fall back to the one hour default.
    ///
    /// # Errors
    /// Returns an error above [`MAX_RESET_TOKEN_TTL_SECONDS`].
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> anyhow::Result<Self> {
        if seconds > MAX_RESET_TOKEN_TTL_SECONDS {
            return Err(anyhow!(
                "reset token TTL of {seconds}s exceeds the maximum of {MAX_RESET_TOKEN_TTL_SECONDS}s"
            ));
        }
        let seconds = if seconds > 0 {
            seconds
        } else {
            DEFAULT_RESET_TOKEN_TTL_SECONDS
        };
        self.token_ttl = TimeDelta::try_seconds(seconds)
            .ok_or_else(|| anyhow!("reset token TTL of {seconds}s is out of range"))?;
        Ok(self)
    }

    #[must_use]
    pub fn reset_base_url(&self) -> &str {
        &self.reset_base_url
    }

    #[must_use]
    pub const fn token_ttl(&self) -> TimeDelta {
        self.token_ttl
    }
}

/// A token returned to in-process callers; HTTP responses never include it.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
}

/// Registration, reset token issuance and redemption over one [`AccountStore`].
pub struct CredentialService {
    store: Arc<dyn AccountStore>,
    hasher: CredentialHasher,
    sender: Arc<dyn ResetLinkSender>,
    config: ResetConfig,
}

impl CredentialService {
    #[must_use]
    pub fn new(
        store: Arc<dyn AccountStore>,
        sender: Arc<dyn ResetLinkSender>,
        config: ResetConfig,
    ) -> Self {
        Self {
            store,
            hasher: CredentialHasher::new(),
            sender,
            config,
        }
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Create an account for `email`.
    ///
    /// # Errors
    /// `Validation` for missing or malformed input, `Conflict` if the email is
    /// taken, `Store` if persistence fails.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<(), CredentialError> {
        let email = normalize_email(email);
        if email.is_empty() || password.expose_secret().is_empty() {
            return Err(CredentialError::validation(
                "Please provide all required fields",
            ));
        }
        if !valid_email(&email) {
            return Err(CredentialError::validation("Invalid email"));
        }

        if self.store.find_by_email(&email).await?.is_some() {
            debug!("account already exists");
            return Err(CredentialError::Conflict);
        }

        let credential_hash = self.hasher.hash(password).await?;

        // The unique key still catches a concurrent registration that slipped
        // past the lookup above.
        match self.store.insert(&email, &credential_hash).await? {
            CreateOutcome::Created => {
                info!(email = %email, "account registered");
                Ok(())
            }
            CreateOutcome::Conflict => Err(CredentialError::Conflict),
        }
    }

    /// Issue a new reset token for `email`, replacing any previous one.
    ///
    /// # Errors
    /// `Validation` for a blank email, `NotFound` if no account matches,
    /// `Delivery` if the link cannot be handed off, `Store` on persistence failure.
    #[instrument(skip(self, now))]
    pub async fn issue_reset_token(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, CredentialError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(CredentialError::validation("Email is required"));
        }

        let token = generate_reset_token()?;
        let expires_at = now
            .checked_add_signed(self.config.token_ttl())
            .context("reset token expiry is out of range")?;

        if !self
            .store
            .set_reset_token(&email, &hash_reset_token(&token), expires_at)
            .await?
        {
            debug!("no account for reset request");
            return Err(CredentialError::NotFound);
        }

        let link = ResetLink {
            url: SecretString::from(build_reset_url(self.config.reset_base_url(), &token)),
            token: SecretString::from(token),
            email,
            expires_at,
        };
        self.sender.send(&link).map_err(CredentialError::Delivery)?;

        Ok(IssuedToken {
            token: link.token,
            expires_at,
        })
    }

    /// Redeem `token` and set `new_password`.
    ///
    /// Validity is judged at `now`; the token must be unexpired then and is
    /// consumed by the same write that stores the new credential.
    ///
    /// # Errors
    /// `Validation` for a blank password, `InvalidOrExpiredToken` for an
    /// unknown, used or expired token, `Store` on persistence failure.
    #[instrument(skip_all)]
    pub async fn redeem_reset_token(
        &self,
        token: &str,
        new_password: &SecretString,
        now: DateTime<Utc>,
    ) -> Result<(), CredentialError> {
        if new_password.expose_secret().is_empty() {
            return Err(CredentialError::validation("Please provide a new password"));
        }
        if token.is_empty() {
            return Err(CredentialError::InvalidOrExpiredToken);
        }

        let token_hash = hash_reset_token(token);
        let Some(account) = self.store.find_by_reset_token(&token_hash, now).await? else {
            return Err(CredentialError::InvalidOrExpiredToken);
        };

        let credential_hash = self.hasher.hash(new_password).await?;

        if !self
            .store
            .redeem_reset_token(&token_hash, &credential_hash, now)
            .await?
        {
            return Err(CredentialError::InvalidOrExpiredToken);
        }

        info!(email = %account.email, "password reset");

        Ok(())
    }

    /// Check an email/password pair. No session is issued.
    ///
    /// # Errors
    /// `Validation` for blank input, `InvalidCredentials` for an unknown email
    /// or wrong password, `Store` on persistence failure.
    #[instrument(skip(self, password))]
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<(), CredentialError> {
        let email = normalize_email(email);
        if email.is_empty() || password.expose_secret().is_empty() {
            return Err(CredentialError::validation(
                "Please provide all required fields",
            ));
        }

        let Some(account) = self.store.find_by_email(&email).await? else {
            return Err(CredentialError::InvalidCredentials);
        };

        if self
            .hasher
            .verify(password, &account.credential_hash)
            .await?
        {
            Ok(())
        } else {
            Err(CredentialError::InvalidCredentials)
        }
    }

    /// Probe the backing store.
    ///
    /// # Errors
    /// Returns the store error when it is unreachable.
    pub async fn ping(&self) -> anyhow::Result<()> {
        self.store.ping().await
    }
}

/// Normalize an email for lookup/uniqueness checks.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}
