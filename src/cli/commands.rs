use crate::config::{KeySetLocation, ValidatorConfig};
use crate::validator::AuthTokenValidator;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Read};
use std::time::Duration;

/// Command-line interface for the token validator
///
/// Configuration starts from the `AUTHTOKEN_*` environment variables; flags given on
/// the command line override them.
#[derive(Parser, Debug)]
#[command(name = "authtoken-check", version)]
#[command(about = "Validate bearer tokens against an issuer's published signing keys", long_about = None)]
pub struct Cli {
    /// Issuer base URI
    #[arg(long, global = true)]
    pub issuer: Option<String>,

    /// Key cache lifetime in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub max_key_age: Option<u64>,

    /// Clock skew tolerated on `exp`, in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub max_clock_skew: Option<u64>,

    /// Resolve the key set through OpenID discovery
    #[arg(long, global = true, default_value_t = false)]
    pub discovery: bool,

    /// Key set HTTP timeout in seconds (0 disables)
    #[arg(long, global = true, value_name = "SECS")]
    pub fetch_timeout: Option<u64>,

    /// Log at debug level
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Verify a token and print its claims as JSON
    Validate {
        /// The compact token, or `-` to read it from stdin
        token: String,
    },
    /// Fetch the issuer's key set once to check that it is reachable
    CheckConfig,
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    pub fn validator_config(&self) -> ValidatorConfig {
        let mut config = ValidatorConfig::from_env();
        if let Some(issuer) = &self.issuer {
            config = config.issuer(issuer.as_str());
        }
        if let Some(secs) = self.max_key_age {
            config = config.max_key_age(Duration::from_secs(secs));
        }
        if let Some(secs) = self.max_clock_skew {
            config = config.max_clock_skew(Duration::from_secs(secs));
        }
        if self.discovery {
            config = config.key_set_location(KeySetLocation::Discovery);
        }
        if let Some(secs) = self.fetch_timeout {
            config = config.fetch_timeout((secs > 0).then(|| Duration::from_secs(secs)));
        }
        config
    }
}

pub fn run_cli(cli: Cli) -> Result<()> {
    let config = cli.validator_config();
    let validator = AuthTokenValidator::new(config).context("invalid validator configuration")?;

    match &cli.command {
        Commands::Validate { token } => {
            let token = read_token(token)?;
            let verified = validator
                .from_signature(&token)
                .map_err(|e| anyhow!("token rejected ({}): {}", e.status(), e))?;
            let claims = serde_json::to_string_pretty(verified.claims())
                .context("failed to serialize claims")?;
            println!("{}", claims);
            Ok(())
        }
        Commands::CheckConfig => {
            validator.validate_configuration().map_err(|e| {
                let cause = std::error::Error::source(&e)
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                anyhow!("{}: {}", e, cause)
            })?;
            let stats = validator.key_cache().stats();
            println!(
                "ok: {} signing key(s) published by {}",
                stats.keys,
                validator.config().issuer_uri()
            );
            Ok(())
        }
    }
}

fn read_token(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.trim().to_string());
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read token from stdin")?;
    Ok(buf.trim().to_string())
}
