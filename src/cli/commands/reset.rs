use crate::account::MAX_RESET_TOKEN_TTL_SECONDS;
use clap::{Arg, ArgMatches, Command};

pub const ARG_RESET_BASE_URL: &str = "reset-base-url";
pub const ARG_RESET_TOKEN_TTL_SECONDS: &str = "reset-token-ttl-seconds";

#[derive(Debug)]
pub struct Options {
    pub base_url: Option<String>,
    pub token_ttl_seconds: i64,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            base_url: matches.get_one::<String>(ARG_RESET_BASE_URL).cloned(),
            token_ttl_seconds: matches
                .get_one::<i64>(ARG_RESET_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(3600),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_RESET_BASE_URL)
                .long(ARG_RESET_BASE_URL)
                .help("Base URL used to build reset links (default: http://localhost:<port>)")
                .env("PASSRESET_RESET_BASE_URL"),
        )
        .arg(
            Arg::new(ARG_RESET_TOKEN_TTL_SECONDS)
                .long(ARG_RESET_TOKEN_TTL_SECONDS)
                .help("Password reset token TTL in seconds (max: one year)")
                .env("PASSRESET_RESET_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_RESET_TOKEN_TTL_SECONDS)),
        )
}
