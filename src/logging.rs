//! Structured logging setup
//!
//! The library only emits `tracing` events; binaries and tests decide where they go.
//! [`init_logging`] installs a `tracing-subscriber` registry with an `EnvFilter` and a
//! JSON or pretty formatter writing to stderr, optionally through a non-blocking
//! `tracing-appender` writer.
//!
//! Tokens are credentials. Anything that logs one goes through [`redact_token`].

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Output format of the formatter layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Where log events go and how they look.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: Level,
    pub format: LogFormat,
    /// Write through a background thread instead of blocking the caller
    pub async_logging: bool,
    /// Include file:line location
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Json,
            async_logging: false,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Read `AUTHTOKEN_LOG_LEVEL`, `AUTHTOKEN_LOG_FORMAT` and `AUTHTOKEN_LOG_ASYNC`.
    /// Unset or unparsable values keep the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(level) = env_parse::<Level>("AUTHTOKEN_LOG_LEVEL") {
            config.level = level;
        }
        if let Ok(format) = env::var("AUTHTOKEN_LOG_FORMAT") {
            if format.eq_ignore_ascii_case("pretty") {
                config.format = LogFormat::Pretty;
            }
        }
        if let Some(async_logging) = env_parse::<bool>("AUTHTOKEN_LOG_ASYNC") {
            config.async_logging = async_logging;
        }
        config
    }

    /// Debug level, human-readable output with source locations.
    pub fn verbose(mut self) -> Self {
        self.level = Level::DEBUG;
        self.format = LogFormat::Pretty;
        self.include_location = true;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Install the global subscriber.
///
/// With async logging enabled the returned guard must be held until exit; dropping it
/// flushes the buffered writer.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let (writer, guard) = if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(non_blocking), Some(guard))
    } else {
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stderr), None)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

/// Loggable stand-in for a token: its length and first few characters.
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    if prefix.len() == token.len() {
        format!("<redacted {} chars>", token.len())
    } else {
        format!("{}***({} chars)", prefix, token.len())
    }
}
