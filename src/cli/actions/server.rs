use crate::{
    api,
    account::{CredentialService, LogResetLinkSender, PgAccountStore, ResetConfig},
};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub db_connect_timeout_seconds: u64,
    pub db_max_connections: u32,
    pub reset_base_url: String,
    pub reset_token_ttl_seconds: i64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be applied, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(args.db_max_connections)
        .acquire_timeout(Duration::from_secs(args.db_connect_timeout_seconds))
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&args.dsn)
        .await
        .context("Failed to connect to database")?;

    let store = PgAccountStore::new(pool.clone());
    store
        .ensure_schema()
        .await
        .context("Failed to apply database schema")?;

    let config = ResetConfig::new(args.reset_base_url)
        .with_token_ttl_seconds(args.reset_token_ttl_seconds)
        .context("Invalid reset token TTL")?;
    let service = Arc::new(CredentialService::new(
        Arc::new(store),
        Arc::new(LogResetLinkSender),
        config,
    ));

    let result = api::serve(args.port, service).await;

    pool.close().await;

    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(&args.dsn)),
        (
            "db_connect_timeout_seconds",
            args.db_connect_timeout_seconds.to_string(),
        ),
        ("db_max_connections", args.db_max_connections.to_string()),
        ("reset_base_url", args.reset_base_url.clone()),
        (
            "reset_token_ttl_seconds",
            args.reset_token_ttl_seconds.to_string(),
        ),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
