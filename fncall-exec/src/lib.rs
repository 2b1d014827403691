//! Snippet execution that returns the value of a trailing expression.
//!
//! A snippet is parsed by a pluggable [`Grammar`], its last top-level
//! statement is rewritten to bind a reserved name when it is a bare
//! expression, and the program is evaluated in a fresh scope. The caller gets
//! that value back, or `None` when the snippet did not end in an expression.
//!
//! This is not a sandbox. Snippets can loop forever and allocate freely.

#![warn(missing_docs, clippy::pedantic)]

pub mod ast;
mod builtins;
pub mod error;
mod executor;
pub mod grammar;
mod interp;
pub mod rewrite;
mod value;

pub use builtins::Builtin;
pub use error::{ExecError, ExecResult, ParseError, RuntimeErrorKind};
pub use executor::{Executor, run};
pub use grammar::{Grammar, ScriptGrammar};
pub use interp::{MAX_CALL_DEPTH, MAX_EVAL_DEPTH};
pub use rewrite::{RESULT_NAME, capture_trailing_expression};
pub use value::{DictRef, ListRef, Value};
