//! Map validated CLI arguments to the action the binary runs.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_PORT, database, reset};
use anyhow::Result;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(5000);

    let database_opts = database::Options::parse(matches)?;
    let reset_opts = reset::Options::parse(matches);

    // Reset links point back at this server unless told otherwise.
    let reset_base_url = reset_opts
        .base_url
        .unwrap_or_else(|| format!("http://localhost:{port}"));

    Ok(Action::Server(Args {
        port,
        dsn: database_opts.dsn,
        db_connect_timeout_seconds: database_opts.connect_timeout_seconds,
        db_max_connections: database_opts.max_connections,
        reset_base_url,
        reset_token_ttl_seconds: reset_opts.token_ttl_seconds,
    }))
}
