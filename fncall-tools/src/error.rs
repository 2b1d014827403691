//! Errors produced while describing, registering, and dispatching functions.

use thiserror::Error;

/// Result alias for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors produced by descriptor construction, registration, and invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A function or parameter name failed validation.
    #[error(transparent)]
    InvalidName(#[from] fncall_primitives::Error),

    /// Descriptor failed validation.
    #[error("invalid function descriptor: {reason}")]
    InvalidDescriptor {
        /// Human-readable reason for rejection.
        reason: String,
    },

    /// Function name collided with an existing registration.
    #[error("function `{name}` is already registered")]
    DuplicateFunction {
        /// Name of the offending function.
        name: String,
    },

    /// Requested function does not exist.
    #[error("function `{name}` is not registered")]
    UnknownFunction {
        /// Name of the missing function.
        name: String,
    },

    /// Call arguments could not be decoded into a JSON object.
    #[error("invalid arguments for `{function}`: {reason}")]
    InvalidArguments {
        /// Function the arguments were addressed to.
        function: String,
        /// Decoder or shape error.
        reason: String,
    },

    /// A required parameter was not supplied.
    #[error("`{function}` is missing required argument `{name}`")]
    MissingArgument {
        /// Function being called.
        function: String,
        /// Missing parameter.
        name: String,
    },

    /// An argument does not correspond to any declared parameter.
    #[error("`{function}` got an unexpected argument `{name}`")]
    UnexpectedArgument {
        /// Function being called.
        function: String,
        /// Unknown argument key.
        name: String,
    },

    /// An argument value does not fit the parameter type.
    #[error("argument `{name}` of `{function}` is invalid: {reason}")]
    ArgumentType {
        /// Function being called.
        function: String,
        /// Offending parameter.
        name: String,
        /// Why the value was refused.
        reason: String,
    },

    /// Function execution failed.
    #[error("function execution failed: {reason}")]
    Execution {
        /// Human-readable error returned by the implementation.
        reason: String,
    },
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_descriptor(reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            reason: reason.into(),
        }
    }
}
