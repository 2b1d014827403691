//! Errors raised while parsing or evaluating a snippet.

use std::io;

use thiserror::Error;

/// Result alias for executor operations.
pub type ExecResult<T> = Result<T, ExecError>;

/// Syntax error with its source position.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}, column {column}: {message}")]
pub struct ParseError {
    /// 1-based line.
    pub line: usize,
    /// 1-based column.
    pub column: usize,
    /// What went wrong.
    pub message: String,
}

impl ParseError {
    /// Creates a parse error at the given position.
    #[must_use]
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// Failure categories raised while evaluating.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Reference to an unbound name.
    #[error("name `{0}` is not defined")]
    Name(String),
    /// Operation applied to values of the wrong type.
    #[error("type error: {0}")]
    Type(String),
    /// Right type, unusable value.
    #[error("value error: {0}")]
    Value(String),
    /// Division or modulo by zero.
    #[error("division by zero")]
    ZeroDivision,
    /// Integer result outside the 64-bit range.
    #[error("integer overflow")]
    Overflow,
    /// Sequence index out of range.
    #[error("index out of range")]
    Index,
    /// Missing dictionary key.
    #[error("key `{0}` not found")]
    Key(String),
    /// Calls, expressions, or values nested past their depth limit.
    #[error("maximum recursion depth exceeded")]
    Recursion,
}

/// Errors produced by [`crate::Executor::run`].
#[derive(Debug, Error)]
pub enum ExecError {
    /// The snippet could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Evaluation failed.
    #[error("line {line}: {kind}")]
    Runtime {
        /// Line of the innermost statement being executed.
        line: usize,
        /// Failure category.
        kind: RuntimeErrorKind,
    },

    /// Writing `print` output failed.
    #[error("failed to write snippet output: {0}")]
    Output(#[from] io::Error),
}

impl ExecError {
    /// Returns the runtime failure category, if this is a runtime error.
    #[must_use]
    pub fn runtime_kind(&self) -> Option<&RuntimeErrorKind> {
        match self {
            Self::Runtime { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Attaches `line` to a runtime error raised below statement level.
    pub(crate) fn located(self, line: usize) -> Self {
        match self {
            Self::Runtime { line: 0, kind } => Self::Runtime { line, kind },
            other => other,
        }
    }
}

impl From<RuntimeErrorKind> for ExecError {
    fn from(kind: RuntimeErrorKind) -> Self {
        // Line 0 marks an error not yet tied to a statement.
        Self::Runtime { line: 0, kind }
    }
}
