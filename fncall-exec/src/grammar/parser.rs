//! Recursive-descent parser over the token stream.

use std::rc::Rc;

use super::lexer::{Token, TokenKind};
use crate::ast::{
    BinOp, CmpOp, Expr, FunctionDef, Literal, LogicalOp, Program, Stmt, StmtKind, Target, UnaryOp,
};
use crate::error::ParseError;

type ParseResult<T> = Result<T, ParseError>;

/// Words that can never be used as names.
const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class", "continue",
    "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if", "import",
    "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
    "with", "yield",
];

/// Bounds parser recursion so hostile input cannot exhaust the host stack.
const MAX_NESTING: usize = 100;

const AUGMENTED: &[(&str, BinOp)] = &[
    ("+=", BinOp::Add),
    ("-=", BinOp::Sub),
    ("*=", BinOp::Mul),
    ("/=", BinOp::Div),
    ("//=", BinOp::FloorDiv),
    ("%=", BinOp::Mod),
    ("**=", BinOp::Pow),
    ("&=", BinOp::BitAnd),
    ("|=", BinOp::BitOr),
    ("^=", BinOp::BitXor),
    ("<<=", BinOp::Shl),
    (">>=", BinOp::Shr),
];

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    loop_depth: usize,
    function_depth: usize,
    nesting: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            loop_depth: 0,
            function_depth: 0,
            nesting: 0,
        }
    }

    pub(crate) fn program(mut self) -> ParseResult<Program> {
        let mut body = Vec::new();
        while !self.at_eof() {
            self.statement(&mut body)?;
        }
        Ok(Program { body })
    }

    // Statements

    fn statement(&mut self, out: &mut Vec<Stmt>) -> ParseResult<()> {
        let token = self.peek().clone();
        let stmt = match &token.kind {
            TokenKind::Indent => return Err(error_at(&token, "unexpected indent")),
            TokenKind::Name(word) if word == "if" => self.if_statement()?,
            TokenKind::Name(word) if word == "while" => self.while_statement()?,
            TokenKind::Name(word) if word == "for" => self.for_statement()?,
            TokenKind::Name(word) if word == "def" => self.def_statement()?,
            _ => return self.simple_line(out),
        };
        out.push(stmt);
        Ok(())
    }

    /// One or more `;`-separated simple statements ending the line.
    fn simple_line(&mut self, out: &mut Vec<Stmt>) -> ParseResult<()> {
        loop {
            out.push(self.simple_statement()?);
            if !self.eat_op(";") || self.at_line_end() {
                break;
            }
        }
        match self.peek().kind {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("expected end of statement")),
        }
    }

    fn simple_statement(&mut self) -> ParseResult<Stmt> {
        let token = self.peek().clone();
        let line = token.line;

        if let TokenKind::Name(word) = &token.kind {
            match word.as_str() {
                "pass" => {
                    self.advance();
                    return Ok(Stmt::new(StmtKind::Pass, line));
                }
                "break" | "continue" => {
                    if self.loop_depth == 0 {
                        return Err(error_at(&token, format!("`{word}` outside loop")));
                    }
                    self.advance();
                    let kind = if word == "break" {
                        StmtKind::Break
                    } else {
                        StmtKind::Continue
                    };
                    return Ok(Stmt::new(kind, line));
                }
                "return" => {
                    if self.function_depth == 0 {
                        return Err(error_at(&token, "`return` outside function"));
                    }
                    self.advance();
                    let value = if self.at_statement_end() {
                        None
                    } else {
                        Some(self.expression_list()?)
                    };
                    return Ok(Stmt::new(StmtKind::Return(value), line));
                }
                "import" | "from" => {
                    return Err(error_at(&token, "imports are not supported"));
                }
                _ => {}
            }
        }

        let expr = self.expression_list()?;

        if self.eat_op("=") {
            let target = assignment_target(expr, &token)?;
            let value = self.expression_list()?;
            if self.check_op("=") {
                return Err(self.unexpected("chained assignment is not supported"));
            }
            return Ok(Stmt::new(StmtKind::Assign { target, value }, line));
        }

        if let Some(op) = self.augmented_operator() {
            let target = assignment_target(expr, &token)?;
            let value = self.expression_list()?;
            return Ok(Stmt::new(StmtKind::AugAssign { target, op, value }, line));
        }

        Ok(Stmt::new(StmtKind::Expr(expr), line))
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.advance().line;
        let test = self.expression()?;
        let body = self.block()?;
        let mut branches = vec![(test, body)];
        let mut orelse = Vec::new();

        loop {
            if self.eat_keyword("elif") {
                let test = self.expression()?;
                let body = self.block()?;
                branches.push((test, body));
            } else {
                if self.eat_keyword("else") {
                    orelse = self.block()?;
                }
                break;
            }
        }

        Ok(Stmt::new(StmtKind::If { branches, orelse }, line))
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.advance().line;
        let test = self.expression()?;
        self.loop_depth += 1;
        let body = self.block()?;
        self.loop_depth -= 1;
        Ok(Stmt::new(StmtKind::While { test, body }, line))
    }

    fn for_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.advance().line;
        let target = self.identifier()?;
        if self.check_op(",") {
            return Err(self.unexpected("tuple unpacking is not supported"));
        }
        self.expect_keyword("in")?;
        let iter = self.expression_list()?;
        self.loop_depth += 1;
        let body = self.block()?;
        self.loop_depth -= 1;
        Ok(Stmt::new(StmtKind::For { target, iter, body }, line))
    }

    fn def_statement(&mut self) -> ParseResult<Stmt> {
        let line = self.advance().line;
        let name = self.identifier()?;
        self.expect_op("(")?;

        let mut params: Vec<String> = Vec::new();
        while !self.check_op(")") {
            let token = self.peek().clone();
            let param = self.identifier()?;
            if params.contains(&param) {
                return Err(error_at(
                    &token,
                    format!("duplicate parameter `{param}` in `{name}`"),
                ));
            }
            if self.eat_op(":") {
                // Annotations are accepted and ignored.
                self.expression()?;
            }
            if self.check_op("=") {
                return Err(self.unexpected("default parameter values are not supported"));
            }
            params.push(param);
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        if self.eat_op("->") {
            self.expression()?;
        }

        let enclosing_loops = std::mem::take(&mut self.loop_depth);
        self.function_depth += 1;
        let body = self.block()?;
        self.function_depth -= 1;
        self.loop_depth = enclosing_loops;

        Ok(Stmt::new(
            StmtKind::Def(Rc::new(FunctionDef { name, params, body })),
            line,
        ))
    }

    /// `:` followed by an indented suite or by simple statements on the same line.
    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect_op(":")?;
        let mut body = Vec::new();

        if !matches!(self.peek().kind, TokenKind::Newline) {
            self.simple_line(&mut body)?;
            return Ok(body);
        }

        self.advance();
        if !matches!(self.peek().kind, TokenKind::Indent) {
            return Err(self.unexpected("expected an indented block"));
        }
        self.advance();
        self.enter()?;
        while !matches!(self.peek().kind, TokenKind::Dedent | TokenKind::Eof) {
            self.statement(&mut body)?;
        }
        self.leave();
        if matches!(self.peek().kind, TokenKind::Dedent) {
            self.advance();
        }
        Ok(body)
    }

    // Expressions

    /// An expression that must not continue into a tuple.
    fn expression_list(&mut self) -> ParseResult<Expr> {
        let expr = self.expression()?;
        if self.check_op(",") {
            return Err(self.unexpected("tuples are not supported"));
        }
        Ok(expr)
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.enter()?;
        let body = self.or_test()?;
        let expr = if self.eat_keyword("if") {
            let test = self.or_test()?;
            self.expect_keyword("else")?;
            let orelse = self.expression()?;
            Expr::Conditional {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            }
        } else {
            body
        };
        self.leave();
        Ok(expr)
    }

    fn or_test(&mut self) -> ParseResult<Expr> {
        let mut left = self.and_test()?;
        while self.eat_keyword("or") {
            let right = self.and_test()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn and_test(&mut self) -> ParseResult<Expr> {
        let mut left = self.not_test()?;
        while self.eat_keyword("and") {
            let right = self.not_test()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn not_test(&mut self) -> ParseResult<Expr> {
        if !self.eat_keyword("not") {
            return self.comparison();
        }
        self.enter()?;
        let operand = self.not_test()?;
        self.leave();
        Ok(Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        })
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let left = self.bit_or()?;
        let mut rest = Vec::new();
        while let Some(op) = self.comparison_operator() {
            rest.push((op, self.bit_or()?));
        }
        if rest.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare {
                left: Box::new(left),
                rest,
            })
        }
    }

    fn comparison_operator(&mut self) -> Option<CmpOp> {
        let kind = self.peek().kind.clone();
        let op = match &kind {
            TokenKind::Op("==") => CmpOp::Eq,
            TokenKind::Op("!=") => CmpOp::NotEq,
            TokenKind::Op("<") => CmpOp::Lt,
            TokenKind::Op("<=") => CmpOp::LtE,
            TokenKind::Op(">") => CmpOp::Gt,
            TokenKind::Op(">=") => CmpOp::GtE,
            TokenKind::Name(word) if word == "in" => CmpOp::In,
            TokenKind::Name(word) if word == "not" => {
                if !matches!(&self.peek_at(1).kind, TokenKind::Name(next) if next == "in") {
                    return None;
                }
                self.advance();
                CmpOp::NotIn
            }
            TokenKind::Name(word) if word == "is" => {
                if matches!(&self.peek_at(1).kind, TokenKind::Name(next) if next == "not") {
                    self.advance();
                    CmpOp::IsNot
                } else {
                    CmpOp::Is
                }
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn bit_or(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[("|", BinOp::BitOr)], Self::bit_xor)
    }

    fn bit_xor(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[("^", BinOp::BitXor)], Self::bit_and)
    }

    fn bit_and(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[("&", BinOp::BitAnd)], Self::shift)
    }

    fn shift(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[("<<", BinOp::Shl), (">>", BinOp::Shr)], Self::arith)
    }

    fn arith(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[("+", BinOp::Add), ("-", BinOp::Sub)], Self::term)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[
                ("*", BinOp::Mul),
                ("/", BinOp::Div),
                ("//", BinOp::FloorDiv),
                ("%", BinOp::Mod),
            ],
            Self::factor,
        )
    }

    /// Left-associative run of the operators in `ops` over `operand`.
    fn binary_level(
        &mut self,
        ops: &[(&str, BinOp)],
        operand: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut left = operand(self)?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Op(symbol) => ops
                    .iter()
                    .find(|(candidate, _)| *candidate == symbol)
                    .map(|(_, op)| *op),
                _ => None,
            };
            let Some(op) = op else {
                return Ok(left);
            };
            self.advance();
            let right = operand(self)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Op("-") => UnaryOp::Neg,
            TokenKind::Op("+") => UnaryOp::Pos,
            TokenKind::Op("~") => UnaryOp::Invert,
            _ => return self.power(),
        };
        self.advance();
        self.enter()?;
        let operand = self.factor()?;
        self.leave();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    /// `**` binds tighter than a unary operator on its left but looser than
    /// one on its right, so `-2 ** -1` is `-(2 ** (-1))`.
    fn power(&mut self) -> ParseResult<Expr> {
        let base = self.postfix()?;
        if !self.eat_op("**") {
            return Ok(base);
        }
        self.enter()?;
        let exponent = self.factor()?;
        self.leave();
        Ok(Expr::Binary {
            op: BinOp::Pow,
            left: Box::new(base),
            right: Box::new(exponent),
        })
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.atom()?;
        loop {
            if self.eat_op("(") {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else if self.eat_op("[") {
                let index = self.expression()?;
                if self.check_op(":") {
                    return Err(self.unexpected("slices are not supported"));
                }
                self.expect_op("]")?;
                expr = Expr::Subscript {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat_op(".") {
                let method = self.identifier()?;
                if !self.eat_op("(") {
                    return Err(
                        self.unexpected("attribute access is only supported for method calls")
                    );
                }
                let args = self.arguments()?;
                expr = Expr::MethodCall {
                    receiver: Box::new(expr),
                    method,
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Positional arguments after an opening `(`, through the closing `)`.
    fn arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.check_op(")") {
            args.push(self.expression()?);
            if self.check_op("=") {
                return Err(self.unexpected("keyword arguments are not supported"));
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        Ok(args)
    }

    fn atom(&mut self) -> ParseResult<Expr> {
        let token = self.advance();
        let (line, column) = (token.line, token.column);
        match token.kind {
            TokenKind::Int(i) => Ok(Expr::Literal(Literal::Int(i))),
            TokenKind::Float(f) => Ok(Expr::Literal(Literal::Float(f))),
            TokenKind::Str(mut text) => {
                // Adjacent literals concatenate.
                while let TokenKind::Str(next) = &self.peek().kind {
                    text.push_str(next);
                    self.advance();
                }
                Ok(Expr::Literal(Literal::Str(text)))
            }
            TokenKind::Name(name) => name_atom(name, line, column),
            TokenKind::Op("(") => {
                if self.check_op(")") {
                    return Err(self.unexpected("tuples are not supported"));
                }
                let expr = self.expression_list()?;
                self.expect_op(")")?;
                Ok(expr)
            }
            TokenKind::Op("[") => {
                let mut items = Vec::new();
                while !self.check_op("]") {
                    items.push(self.expression()?);
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op("]")?;
                Ok(Expr::List(items))
            }
            TokenKind::Op("{") => {
                let mut entries = Vec::new();
                while !self.check_op("}") {
                    let key = self.expression()?;
                    self.expect_op(":")?;
                    let value = self.expression()?;
                    entries.push((key, value));
                    if !self.eat_op(",") {
                        break;
                    }
                }
                self.expect_op("}")?;
                Ok(Expr::Dict(entries))
            }
            TokenKind::Newline | TokenKind::Eof => {
                Err(ParseError::new(line, column, "unexpected end of input"))
            }
            TokenKind::Indent | TokenKind::Dedent => {
                Err(ParseError::new(line, column, "unexpected indentation"))
            }
            TokenKind::Op(op) => Err(ParseError::new(
                line,
                column,
                format!("invalid syntax at `{op}`"),
            )),
        }
    }

    fn identifier(&mut self) -> ParseResult<String> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Name(name) if !KEYWORDS.contains(&name.as_str()) => {
                self.advance();
                Ok(name)
            }
            _ => Err(error_at(&token, "expected an identifier")),
        }
    }

    fn augmented_operator(&mut self) -> Option<BinOp> {
        let TokenKind::Op(symbol) = self.peek().kind else {
            return None;
        };
        let op = AUGMENTED
            .iter()
            .find(|(candidate, _)| *candidate == symbol)
            .map(|(_, op)| *op)?;
        self.advance();
        Some(op)
    }

    // Token cursor

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.at_eof() {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn at_line_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Newline | TokenKind::Eof)
    }

    fn at_statement_end(&self) -> bool {
        self.at_line_end() || self.check_op(";")
    }

    fn check_op(&self, op: &str) -> bool {
        matches!(self.peek().kind, TokenKind::Op(found) if found == op)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        let found = self.check_op(op);
        if found {
            self.advance();
        }
        found
    }

    fn expect_op(&mut self, op: &str) -> ParseResult<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected `{op}`")))
        }
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        let found = matches!(&self.peek().kind, TokenKind::Name(name) if name == word);
        if found {
            self.advance();
        }
        found
    }

    fn expect_keyword(&mut self, word: &str) -> ParseResult<()> {
        if self.eat_keyword(word) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected `{word}`")))
        }
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING {
            return Err(self.unexpected("too many nested expressions or blocks"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.nesting -= 1;
    }

    fn unexpected(&self, message: &str) -> ParseError {
        let token = self.peek();
        let found = match &token.kind {
            TokenKind::Name(name) => format!("`{name}`"),
            TokenKind::Int(i) => format!("`{i}`"),
            TokenKind::Float(f) => format!("`{f}`"),
            TokenKind::Str(_) => "string literal".to_owned(),
            TokenKind::Op(op) => format!("`{op}`"),
            TokenKind::Newline => "end of line".to_owned(),
            TokenKind::Indent => "indent".to_owned(),
            TokenKind::Dedent => "dedent".to_owned(),
            TokenKind::Eof => "end of input".to_owned(),
        };
        error_at(token, format!("{message}, found {found}"))
    }
}

fn error_at(token: &Token, message: impl Into<String>) -> ParseError {
    ParseError::new(token.line, token.column, message)
}

fn name_atom(name: String, line: usize, column: usize) -> ParseResult<Expr> {
    let literal = match name.as_str() {
        "True" => Some(Literal::Bool(true)),
        "False" => Some(Literal::Bool(false)),
        "None" => Some(Literal::None),
        _ => None,
    };
    if let Some(literal) = literal {
        return Ok(Expr::Literal(literal));
    }
    if KEYWORDS.contains(&name.as_str()) {
        return Err(ParseError::new(
            line,
            column,
            format!("unexpected keyword `{name}`"),
        ));
    }
    Ok(Expr::Name(name))
}

fn assignment_target(expr: Expr, start: &Token) -> ParseResult<Target> {
    match expr {
        Expr::Name(name) => Ok(Target::Name(name)),
        Expr::Subscript { object, index } => Ok(Target::Subscript {
            object: *object,
            index: *index,
        }),
        _ => Err(error_at(start, "cannot assign to expression")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, ScriptGrammar};

    fn parse(source: &str) -> Program {
        ScriptGrammar.parse(source).unwrap()
    }

    fn parse_err(source: &str) -> ParseError {
        ScriptGrammar.parse(source).unwrap_err()
    }

    fn only_expr(source: &str) -> Expr {
        match parse(source).body.as_slice() {
            [Stmt {
                kind: StmtKind::Expr(expr),
                ..
            }] => expr.clone(),
            other => panic!("expected a single expression, got {other:?}"),
        }
    }

    fn int(i: i64) -> Expr {
        Expr::Literal(Literal::Int(i))
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            only_expr("1 + 2 * 3"),
            Expr::Binary {
                op: BinOp::Add,
                left: Box::new(int(1)),
                right: Box::new(Expr::Binary {
                    op: BinOp::Mul,
                    left: Box::new(int(2)),
                    right: Box::new(int(3)),
                }),
            }
        );
    }

    #[test]
    fn unary_minus_applies_after_power() {
        assert_eq!(
            only_expr("-2 ** 2"),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(Expr::Binary {
                    op: BinOp::Pow,
                    left: Box::new(int(2)),
                    right: Box::new(int(2)),
                }),
            }
        );
    }

    #[test]
    fn comparisons_chain() {
        let Expr::Compare { rest, .. } = only_expr("a < b not in c is not d") else {
            panic!("expected a comparison");
        };
        let ops: Vec<_> = rest.iter().map(|(op, _)| *op).collect();
        assert_eq!(ops, [CmpOp::Lt, CmpOp::NotIn, CmpOp::IsNot]);
    }

    #[test]
    fn method_calls_and_subscripts() {
        assert!(matches!(
            only_expr("d['k'].get(1)[0]"),
            Expr::Subscript { object, .. } if matches!(*object, Expr::MethodCall { ref method, .. } if method == "get")
        ));
    }

    #[test]
    fn statements_record_their_line() {
        let program = parse("x = 1\n\n# note\nif x:\n    y = 2\nelif x > 1: y = 3\nelse:\n    pass\nx\n");
        let lines: Vec<_> = program.body.iter().map(|stmt| stmt.line).collect();
        assert_eq!(lines, [1, 4, 9]);

        let StmtKind::If { branches, orelse } = &program.body[1].kind else {
            panic!("expected an if statement");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(orelse.len(), 1);
    }

    #[test]
    fn semicolons_separate_statements() {
        assert_eq!(parse("a = 1; b = 2; a + b;").body.len(), 3);
    }

    #[test]
    fn functions_and_loops() {
        let program = parse(
            "def fib(n: int) -> int:\n    if n < 2:\n        return n\n    return fib(n - 1) + fib(n - 2)\n\nfor i in range(3):\n    while True:\n        break\n",
        );
        let StmtKind::Def(def) = &program.body[0].kind else {
            panic!("expected a function definition");
        };
        assert_eq!(def.params, ["n"]);
        assert_eq!(def.body.len(), 2);
        assert!(matches!(program.body[1].kind, StmtKind::For { ref target, .. } if target == "i"));
    }

    #[test]
    fn augmented_assignment_to_subscript() {
        let program = parse("xs[0] += 1");
        assert!(matches!(
            &program.body[0].kind,
            StmtKind::AugAssign {
                target: Target::Subscript { .. },
                op: BinOp::Add,
                ..
            }
        ));
    }

    #[test]
    fn empty_source_has_no_statements() {
        assert!(parse("").body.is_empty());
        assert!(parse("\n   \n# comment only\n").body.is_empty());
    }

    #[test]
    fn control_flow_placement_is_checked() {
        assert!(parse_err("break").message.contains("outside loop"));
        assert!(parse_err("return 1").message.contains("outside function"));
        assert!(
            parse_err("while True:\n    def f():\n        continue\n")
                .message
                .contains("outside loop")
        );
    }

    #[test]
    fn unsupported_syntax_is_rejected() {
        for source in [
            "import os",
            "from os import path",
            "a, b = 1, 2",
            "x = (1, 2)",
            "obj.attr",
            "f(x=1)",
            "lambda: 1",
            "a = b = 1",
            "xs[1:2]",
            "1 = x",
            "def f(a=1):\n    pass",
        ] {
            assert!(ScriptGrammar.parse(source).is_err(), "{source} should not parse");
        }
    }

    #[test]
    fn errors_point_at_the_offending_token() {
        let err = parse_err("x = 1\ny = (2 +\n");
        assert_eq!(err.line, 2);

        let err = parse_err("x = 1 2");
        assert_eq!((err.line, err.column), (1, 7));

        let err = parse_err("if x:\ny");
        assert!(err.message.contains("indented block"));

        let err = parse_err("  x = 1");
        assert!(err.message.contains("indent"));
    }

    #[test]
    fn deep_nesting_is_an_error_not_a_crash() {
        let source = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        assert!(parse_err(&source).message.contains("nested"));
    }
}
