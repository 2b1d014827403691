//! Function-calling helpers for LLM agents.
//!
//! This facade bundles the workspace crates behind feature flags so
//! downstream users can enable only the pieces they need: function schemas
//! and allow-list dispatch (`tools`), trailing-expression snippet execution
//! (`exec`), TOML settings (`config`), and log setup (`telemetry`).

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use fncall_primitives as primitives;

/// Function descriptors, registry, and dispatch (enabled by `tools` feature).
#[cfg(feature = "tools")]
pub use fncall_tools as tools;

/// Snippet execution (enabled by `exec` feature).
#[cfg(feature = "exec")]
pub use fncall_exec as exec;

/// Settings management (enabled by `config` feature).
#[cfg(feature = "config")]
pub use fncall_config as config;

/// Log subscriber setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use fncall_telemetry as telemetry;
