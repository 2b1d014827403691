//! Trailing-expression capture.

use crate::ast::{Expr, Program, Stmt, StmtKind, Target};

/// Name the trailing expression's value is bound to.
///
/// No grammar can produce it as an identifier, so a snippet can neither read
/// nor overwrite it.
pub const RESULT_NAME: &str = "<result>";

/// Rewrites a trailing top-level expression statement into an assignment to
/// [`RESULT_NAME`].
///
/// Returns whether the rewrite happened. Only the last top-level statement
/// is considered; expressions nested in blocks are left alone.
pub fn capture_trailing_expression(program: &mut Program) -> bool {
    let Some(last) = program.body.last_mut() else {
        return false;
    };
    if !matches!(last.kind, StmtKind::Expr(_)) {
        return false;
    }
    let StmtKind::Expr(value) = std::mem::replace(&mut last.kind, StmtKind::Pass) else {
        return false;
    };
    last.kind = StmtKind::Assign {
        target: Target::Name(RESULT_NAME.to_owned()),
        value,
    };
    true
}

/// Returns the expression [`capture_trailing_expression`] would capture.
#[must_use]
pub fn trailing_expression(program: &Program) -> Option<&Expr> {
    match program.body.last() {
        Some(Stmt {
            kind: StmtKind::Expr(expr),
            ..
        }) => Some(expr),
        _ => None,
    }
}
