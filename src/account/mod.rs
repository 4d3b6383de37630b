//! Accounts and the password reset token lifecycle.
//!
//! An account starts with no reset token. Issuing a token stores its digest
//! together with an expiry; redeeming it before the expiry replaces the
//! credential hash and clears both fields in the same write. Expiry is
//! enforced lazily by the lookup predicate, nothing sweeps old tokens.
//!
//! ```text
//! NoActiveToken --issue--> TokenActive --redeem (now < expiry)--> NoActiveToken
//!                          TokenActive --re-issue--> TokenActive (old token dead)
//! ```

pub mod credential;
mod error;
pub mod notify;
pub mod postgres;
mod service;
pub mod store;
pub mod token;

pub use credential::CredentialHasher;
pub use error::CredentialError;
pub use notify::{LogResetLinkSender, ResetLink, ResetLinkSender};
pub use postgres::PgAccountStore;
pub use service::{CredentialService, IssuedToken, MAX_RESET_TOKEN_TTL_SECONDS, ResetConfig};
pub use store::{AccountStore, CreateOutcome, MemoryAccountStore};

use chrono::{DateTime, Utc};

/// Stored account record.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub email: String,
    pub credential_hash: String,
    pub reset_token_hash: Option<Vec<u8>>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
}

impl Account {
    #[must_use]
    pub const fn new(email: String, credential_hash: String) -> Self {
        Self {
            email,
            credential_hash,
            reset_token_hash: None,
            reset_token_expires_at: None,
        }
    }

    #[must_use]
    pub const fn has_reset_token(&self) -> bool {
        self.reset_token_hash.is_some()
    }

    pub fn clear_reset_token(&mut self) {
        self.reset_token_hash = None;
        self.reset_token_expires_at = None;
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("email", &self.email)
            .field("credential_hash", &"***")
            .field("reset_token_hash", &self.reset_token_hash.as_ref().map(|_| "***"))
            .field("reset_token_expires_at", &self.reset_token_expires_at)
            .finish()
    }
}
