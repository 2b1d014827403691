//! Observability setup for function-calling agents.
//!
//! Library crates in this workspace only emit `tracing` events; binaries call
//! [`init`] once at startup to print them.

#![warn(missing_docs, clippy::pedantic)]

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Installs a formatted subscriber on stderr as the global default.
///
/// `RUST_LOG` takes precedence over `default_filter` when it is set.
///
/// # Errors
///
/// Fails when the filter does not parse or a global subscriber is already
/// installed.
pub fn init(default_filter: &str) -> Result<()> {
    let filter = env_filter(default_filter)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

/// Builds the filter [`init`] installs.
///
/// # Errors
///
/// Fails when `RUST_LOG` or `default_filter` is not a valid directive list.
pub fn env_filter(default_filter: &str) -> Result<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => {
            parse_filter(&directives).context("invalid RUST_LOG")
        }
        _ => parse_filter(default_filter),
    }
}

/// Parses a comma-separated list of `tracing` filter directives.
///
/// # Errors
///
/// Fails when a directive does not parse.
pub fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives).with_context(|| format!("invalid log filter `{directives}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_parse() {
        let filter = parse_filter("warn,fncall_tools=debug").unwrap();
        assert!(filter.to_string().contains("fncall_tools=debug"));
    }

    #[test]
    fn bad_levels_are_rejected() {
        let err = parse_filter("fncall_tools=loud").unwrap_err();
        assert!(err.to_string().contains("fncall_tools=loud"));
    }

    #[test]
    fn second_init_fails() {
        let _ = init("info");
        assert!(init("info").is_err());
    }
}
