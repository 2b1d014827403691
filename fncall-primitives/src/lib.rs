//! Core shared types for function-calling helpers.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod name;

/// Error type and result alias shared across the SDK.
pub use error::{Error, Result};
/// Validated identifiers for functions and their parameters.
pub use name::{FunctionName, MAX_NAME_LEN, validate_parameter_name};
