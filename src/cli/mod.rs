//! # CLI Module
//!
//! Backs the `authtoken-check` binary, a thin operator tool over
//! [`AuthTokenValidator`](crate::AuthTokenValidator).
//!
//! ## Commands
//!
//! ```bash
//! # Verify a token and print its claims
//! authtoken-check --issuer https://auth.example.com/core validate eyJhbGciOi...
//!
//! # Read the token from stdin
//! echo "$TOKEN" | authtoken-check validate -
//!
//! # Health-check the issuer's key set
//! authtoken-check --discovery check-config
//! ```
//!
//! Exit status is non-zero when validation or the key set fetch fails.

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{run_cli, Cli, Commands};
