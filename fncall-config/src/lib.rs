//! Configuration management for function dispatch.
//!
//! Settings live in a TOML file. Every section is optional and falls back to
//! its defaults, and a missing file means all defaults.

#![warn(missing_docs, clippy::pedantic)]

pub mod loader;
pub mod schema;

pub use loader::{from_toml_str, load, save};
pub use schema::{DEFAULT_LOG_FILTER, DispatchSettings, LoggingSettings, Settings};
