//! Surface syntaxes that lower source text to [`crate::ast::Program`].

mod lexer;
mod parser;

use crate::ast::Program;
use crate::error::ParseError;

/// A snippet syntax.
///
/// Implementations turn source text into the grammar-neutral tree the
/// evaluator understands. They must never produce the reserved result name
/// ([`crate::RESULT_NAME`]) as an identifier.
pub trait Grammar {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Parses `source` into a program.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] with the offending line and column.
    fn parse(&self, source: &str) -> Result<Program, ParseError>;
}

/// The built-in indentation-structured scripting syntax.
///
/// Blocks are introduced by `:` and delimited by indentation. It supports
/// literals, lists, dictionaries, arithmetic, chained comparisons, boolean
/// operators, conditional expressions, calls, method calls, subscripts,
/// assignment, augmented assignment, `if`/`elif`/`else`, `while`, `for`,
/// `break`, `continue`, `pass`, and `def` with `return`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScriptGrammar;

impl Grammar for ScriptGrammar {
    fn name(&self) -> &'static str {
        "script"
    }

    fn parse(&self, source: &str) -> Result<Program, ParseError> {
        let tokens = lexer::tokenize(source)?;
        parser::Parser::new(tokens).program()
    }
}
