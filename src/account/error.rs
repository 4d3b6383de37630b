//! Error kinds returned by the credential operations.

use thiserror::Error;

/// Failures surfaced by [`super::CredentialService`].
///
/// Token lookups deliberately collapse "unknown token" and "expired token"
/// into [`CredentialError::InvalidOrExpiredToken`] so callers cannot tell
/// which case applied.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("{0}")]
    Validation(String),

    #[error("User already exists")]
    Conflict,

    #[error("User not found")]
    NotFound,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("failed to deliver reset link")]
    Delivery(#[source] anyhow::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl CredentialError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Server-side failures whose details must stay out of client responses.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Delivery(_) | Self::Store(_))
    }
}
