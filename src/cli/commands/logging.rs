use clap::{Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; the index is the `-v` count they map to.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accept either a level name (any case) or a numeric verbosity up to 5.
fn parse_verbosity(value: &str) -> Result<u8, String> {
    let value = value.trim();
    if let Ok(count) = value.parse::<u8>() {
        return if count <= 5 {
            Ok(count)
        } else {
            Err(format!("verbosity {count} is above the maximum of 5"))
        };
    }

    LEVEL_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(value))
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("unknown log level {value:?}, expected one of {LEVEL_NAMES:?}"))
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Increase log verbosity; PASSRESET_LOG_LEVEL takes a level name (default: error)")
            .env("PASSRESET_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(parse_verbosity),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_map_to_counts() {
        assert_eq!(parse_verbosity("error"), Ok(0));
        assert_eq!(parse_verbosity("WARN"), Ok(1));
        assert_eq!(parse_verbosity(" Info "), Ok(2));
        assert_eq!(parse_verbosity("debug"), Ok(3));
        assert_eq!(parse_verbosity("trace"), Ok(4));
    }

    #[test]
    fn numeric_verbosity_is_bounded() {
        assert_eq!(parse_verbosity("5"), Ok(5));
        assert!(parse_verbosity("6").is_err());
    }

    #[test]
    fn unknown_level_is_rejected() {
        let err = parse_verbosity("loud");
        assert!(err.is_err_and(|msg| msg.contains("loud")));
    }

    #[test]
    fn repeated_flag_counts() {
        temp_env::with_vars_unset(["PASSRESET_LOG_LEVEL"], || {
            let matches = with_args(Command::new("passreset"))
                .get_matches_from(vec!["passreset", "-vvv"]);
            assert_eq!(matches.get_one::<u8>(ARG_VERBOSITY).copied(), Some(3));
        });
    }
}
