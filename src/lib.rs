//! # Passreset
//!
//! Account registration and password reset over HTTP.
//!
//! Accounts are keyed by a normalized email address and hold an Argon2id
//! credential hash. A forgotten password is recovered with a single-use,
//! time-limited reset token: the plaintext token only travels in the reset
//! link, while the store keeps its SHA-256 digest.

pub mod account;
pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
