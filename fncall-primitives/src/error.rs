//! Shared error definitions for primitive types.

use thiserror::Error;

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while constructing primitive types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// Function name failed validation.
    #[error("invalid function name `{name}`: {reason}")]
    InvalidFunctionName {
        /// The offending name.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Parameter name failed validation.
    #[error("invalid parameter name `{name}`: {reason}")]
    InvalidParameterName {
        /// The offending name.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
}
