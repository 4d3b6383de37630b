//! Password reset token generation and hashing.
//!
//! The raw token only ever leaves the process through the reset link; the
//! store keeps a SHA-256 digest and lookups hash the presented token first.

use anyhow::{Context, Result};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

/// Random bytes per token (256 bits of entropy).
const RESET_TOKEN_BYTES: usize = 32;

/// Create a new URL-safe reset token from the OS CSPRNG.
///
/// # Errors
/// Returns an error if the OS random source is unavailable.
pub fn generate_reset_token() -> Result<String> {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate reset token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Digest stored in place of the raw token.
#[must_use]
pub fn hash_reset_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

/// Build the link handed to the delivery collaborator.
#[must_use]
pub fn build_reset_url(reset_base_url: &str, token: &str) -> String {
    let base = reset_base_url.trim_end_matches('/');
    format!("{base}/auth/reset-password/{token}")
}
