use authtoken_validator::cli::{run_cli, Cli};
use authtoken_validator::logging::{init_logging, LogConfig};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env();
    if cli.verbose {
        log_config = log_config.verbose();
    }
    let _log_guard = init_logging(&log_config)?;

    run_cli(cli)
}
