//! Entry point that ties parsing, capture, and evaluation together.

use std::io::{self, Write};

use tracing::debug;

use crate::error::ExecResult;
use crate::grammar::{Grammar, ScriptGrammar};
use crate::interp::Interpreter;
use crate::rewrite::{RESULT_NAME, capture_trailing_expression};
use crate::value::Value;

/// Runs snippets and returns the value of their trailing expression.
///
/// Every run starts from an empty scope; nothing a snippet binds survives
/// into the next run.
#[derive(Clone, Debug, Default)]
pub struct Executor<G = ScriptGrammar> {
    grammar: G,
}

impl Executor {
    /// Creates an executor for the built-in [`ScriptGrammar`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<G: Grammar> Executor<G> {
    /// Creates an executor that parses with `grammar`.
    pub fn with_grammar(grammar: G) -> Self {
        Self { grammar }
    }

    /// Returns the grammar snippets are parsed with.
    #[must_use]
    pub fn grammar(&self) -> &G {
        &self.grammar
    }

    /// Runs `source`, sending `print` output to stdout.
    ///
    /// # Errors
    ///
    /// See [`Executor::run_with_output`].
    pub fn run(&self, source: &str) -> ExecResult<Option<Value>> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.run_with_output(source, &mut out)
    }

    /// Runs `source`, sending `print` output to `out`.
    ///
    /// Returns the value of the last top-level statement when it is a bare
    /// expression, and `None` otherwise. Earlier statements run first, in
    /// order, for their side effects.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ExecError::Parse`] when the snippet does not parse,
    /// [`crate::ExecError::Runtime`] when evaluation fails, and
    /// [`crate::ExecError::Output`] when `out` cannot be written.
    pub fn run_with_output(&self, source: &str, out: &mut dyn Write) -> ExecResult<Option<Value>> {
        let mut program = self.grammar.parse(source)?;
        let captured = capture_trailing_expression(&mut program);
        debug!(
            grammar = self.grammar.name(),
            statements = program.body.len(),
            captured,
            "parsed snippet"
        );

        let mut interpreter = Interpreter::new(out);
        if let Err(err) = interpreter.execute(&program) {
            debug!(error = %err, "snippet failed");
            return Err(err);
        }
        let result = if captured {
            interpreter.take_global(RESULT_NAME)
        } else {
            None
        };
        drop(interpreter);
        out.flush()?;

        Ok(result)
    }
}

/// Runs `source` with a fresh default [`Executor`].
///
/// # Errors
///
/// See [`Executor::run_with_output`].
pub fn run(source: &str) -> ExecResult<Option<Value>> {
    Executor::new().run(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Literal, Program, Stmt, StmtKind};
    use crate::error::{ExecError, ParseError, RuntimeErrorKind};

    fn capture(source: &str) -> (Option<Value>, String) {
        let mut out = Vec::new();
        let value = Executor::new().run_with_output(source, &mut out).unwrap();
        (value, String::from_utf8(out).unwrap())
    }

    #[test]
    fn trailing_expression_value_is_returned() {
        assert_eq!(run("5 + 10").unwrap(), Some(Value::Int(15)));
        assert_eq!(run("a = 1\na + 1").unwrap(), Some(Value::Int(2)));
        assert_eq!(run("'x'.upper()").unwrap(), Some(Value::from("X")));
    }

    #[test]
    fn no_trailing_expression_means_no_value() {
        assert_eq!(run("a = 5\na = a + 10").unwrap(), None);
        assert_eq!(run("").unwrap(), None);
        assert_eq!(run("   \n\t\n").unwrap(), None);
        assert_eq!(run("# just a note").unwrap(), None);
        assert_eq!(run("def f():\n    return 1").unwrap(), None);
    }

    #[test]
    fn trailing_none_is_distinguishable_from_no_expression() {
        assert_eq!(run("None").unwrap(), Some(Value::None));
    }

    #[test]
    fn earlier_statements_run_first() {
        let (value, output) = capture("print('first')\nprint('second')\nlen('abc')");
        assert_eq!(value, Some(Value::Int(3)));
        assert_eq!(output, "first\nsecond\n");
    }

    #[test]
    fn trailing_print_yields_none_after_printing() {
        let (value, output) = capture("x = 2\nprint(x * 3)");
        assert_eq!(value, Some(Value::None));
        assert_eq!(output, "6\n");

        let (value, output) = capture("for i in range(2):\n    print(i)");
        assert_eq!(value, None);
        assert_eq!(output, "0\n1\n");
    }

    #[test]
    fn runs_share_no_state() {
        let executor = Executor::new();
        let mut out = Vec::new();
        assert_eq!(
            executor.run_with_output("a = 41\na + 1", &mut out).unwrap(),
            Some(Value::Int(42))
        );
        let err = executor.run_with_output("a", &mut out).unwrap_err();
        assert!(matches!(err.runtime_kind(), Some(RuntimeErrorKind::Name(name)) if name == "a"));

        let first = executor.run_with_output("[1, 2] + [3]", &mut out).unwrap();
        let second = executor.run_with_output("[1, 2] + [3]", &mut out).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn parse_errors_propagate() {
        let err = run("x = (1 +").unwrap_err();
        assert!(matches!(err, ExecError::Parse(_)));
    }

    #[test]
    fn side_effects_before_a_failure_are_kept() {
        let mut out = Vec::new();
        let err = Executor::new()
            .run_with_output("print('before')\n1 / 0", &mut out)
            .unwrap_err();
        assert!(matches!(
            err,
            ExecError::Runtime {
                line: 2,
                kind: RuntimeErrorKind::ZeroDivision
            }
        ));
        assert_eq!(out, b"before\n");
    }

    /// Each line is a decimal literal; the last one is the result.
    struct Numbers;

    impl Grammar for Numbers {
        fn name(&self) -> &'static str {
            "numbers"
        }

        fn parse(&self, source: &str) -> Result<Program, ParseError> {
            let body = source
                .lines()
                .enumerate()
                .map(|(i, line)| {
                    line.trim()
                        .parse::<i64>()
                        .map(|n| Stmt::new(StmtKind::Expr(Expr::Literal(Literal::Int(n))), i + 1))
                        .map_err(|_| ParseError::new(i + 1, 1, "not a number"))
                })
                .collect::<Result<_, _>>()?;
            Ok(Program { body })
        }
    }

    #[test]
    fn grammars_are_pluggable() {
        let executor = Executor::with_grammar(Numbers);
        assert_eq!(executor.grammar().name(), "numbers");
        assert_eq!(
            executor.run_with_output("1\n2\n3", &mut Vec::new()).unwrap(),
            Some(Value::Int(3))
        );
        assert!(executor.run_with_output("1 + 2", &mut Vec::new()).is_err());
    }
}
