//! One-way credential hashing.
//!
//! Passwords are hashed with Argon2id and stored in PHC string format, so the
//! salt and cost parameters travel with the hash. Hashing is CPU bound and
//! runs on the blocking pool.

use anyhow::{Context, Result, anyhow};
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};

/// Argon2id hasher with fixed cost parameters.
#[derive(Clone, Debug)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: Params::default(),
        }
    }

    #[must_use]
    pub const fn with_params(params: Params) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Derive a PHC-formatted hash for `password`.
    ///
    /// # Errors
    /// Returns an error if hashing fails or the blocking task panics.
    pub async fn hash(&self, password: &SecretString) -> Result<String> {
        let argon2 = self.argon2();
        let password = SecretString::from(password.expose_secret().to_owned());

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.expose_secret().as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|_| anyhow!("failed to hash password"))
        })
        .await
        .context("password hashing task failed")?
    }

    /// Check `password` against a stored PHC hash.
    ///
    /// # Errors
    /// Returns an error if the stored hash cannot be parsed.
    pub async fn verify(&self, password: &SecretString, stored_hash: &str) -> Result<bool> {
        let argon2 = self.argon2();
        let password = SecretString::from(password.expose_secret().to_owned());
        let stored_hash = stored_hash.to_owned();

        tokio::task::spawn_blocking(move || {
            let parsed =
                PasswordHash::new(&stored_hash).map_err(|_| anyhow!("invalid credential hash"))?;
            Ok(argon2
                .verify_password(password.expose_secret().as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .context("password verification task failed")?
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new()
    }
}
