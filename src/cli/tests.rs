//! Unit tests for CLI argument handling

use crate::cli::{Cli, Commands};
use crate::config::KeySetLocation;
use clap::Parser;
use std::time::Duration;

#[test]
fn test_validate_command_parses_token() {
    let cli = Cli::try_parse_from(["authtoken-check", "validate", "a.b.c"]).unwrap();
    assert_eq!(
        cli.command,
        Commands::Validate {
            token: "a.b.c".to_string()
        }
    );
}

#[test]
fn test_check_config_command() {
    let cli = Cli::try_parse_from(["authtoken-check", "check-config"]).unwrap();
    assert_eq!(cli.command, Commands::CheckConfig);
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "authtoken-check",
        "check-config",
        "--issuer",
        "http://127.0.0.1:1234/core/",
        "--discovery",
        "--max-clock-skew",
        "0",
        "--fetch-timeout",
        "0",
    ])
    .unwrap();

    let config = cli.validator_config();
    assert_eq!(config.issuer_uri(), "http://127.0.0.1:1234/core");
    assert_eq!(config.location(), KeySetLocation::Discovery);
    assert_eq!(config.max_clock_skew_duration(), Duration::ZERO);
    assert_eq!(config.fetch_timeout_duration(), None);
}

#[test]
fn test_missing_subcommand_is_rejected() {
    assert!(Cli::try_parse_from(["authtoken-check"]).is_err());
    assert!(Cli::try_parse_from(["authtoken-check", "validate"]).is_err());
}
