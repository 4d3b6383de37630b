//! Reset link delivery.
//!
//! The service hands every freshly issued reset link to a [`ResetLinkSender`].
//! The default [`LogResetLinkSender`] only logs the link; a real deployment
//! would implement the trait to enqueue an email instead.

use anyhow::Result;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

#[derive(Clone, Debug)]
pub struct ResetLink {
    pub email: String,
    pub token: SecretString,
    pub url: SecretString,
    pub expires_at: DateTime<Utc>,
}

/// Delivery abstraction for reset links.
pub trait ResetLinkSender: Send + Sync {
    /// Deliver the link or return an error so the request fails.
    fn send(&self, link: &ResetLink) -> Result<()>;
}

/// Local dev sender that logs the link instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogResetLinkSender;

impl ResetLinkSender for LogResetLinkSender {
    fn send(&self, link: &ResetLink) -> Result<()> {
        info!(
            to_email = %link.email,
            expires_at = %link.expires_at.to_rfc3339(),
            reset_url = %link.url.expose_secret(),
            "password reset link"
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Keeps every link so tests can redeem the raw token.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSender {
        links: Mutex<Vec<ResetLink>>,
    }

    impl RecordingSender {
        pub(crate) fn last_token(&self) -> Option<String> {
            self.links.lock().ok().and_then(|links| {
                links
                    .last()
                    .map(|link| link.token.expose_secret().to_string())
            })
        }

        pub(crate) fn count(&self) -> usize {
            self.links.lock().map(|links| links.len()).unwrap_or(0)
        }
    }

    impl ResetLinkSender for RecordingSender {
        fn send(&self, link: &ResetLink) -> Result<()> {
            self.links
                .lock()
                .map_err(|_| anyhow::anyhow!("recording sender poisoned"))?
                .push(link.clone());
            Ok(())
        }
    }

    #[test]
    fn log_sender_accepts_link() {
        let link = ResetLink {
            email: "a@x.com".to_string(),
            token: SecretString::from("t".to_string()),
            url: SecretString::from("http://localhost:5000/auth/reset-password/t".to_string()),
            expires_at: Utc::now(),
        };
        assert!(LogResetLinkSender.send(&link).is_ok());
    }

    #[test]
    fn recording_sender_keeps_last_token() -> Result<()> {
        let sender = RecordingSender::default();
        for token in ["first", "second"] {
            sender.send(&ResetLink {
                email: "a@x.com".to_string(),
                token: SecretString::from(token.to_string()),
                url: SecretString::from(format!("http://h/auth/reset-password/{token}")),
                expires_at: Utc::now(),
            })?;
        }
        assert_eq!(sender.count(), 2);
        assert_eq!(sender.last_token().as_deref(), Some("second"));
        Ok(())
    }
}
