//! Grammar-neutral syntax tree for snippets.
//!
//! Every [`crate::grammar::Grammar`] lowers its surface syntax to these nodes,
//! and the evaluator only ever sees this tree.

use std::rc::Rc;

/// A parsed snippet: its top-level statements in source order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    /// Top-level statements.
    pub body: Vec<Stmt>,
}

/// A statement tagged with the line it starts on.
#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    /// What the statement does.
    pub kind: StmtKind,
    /// 1-based source line.
    pub line: usize,
}

impl Stmt {
    /// Creates a statement at `line`.
    #[must_use]
    pub fn new(kind: StmtKind, line: usize) -> Self {
        Self { kind, line }
    }
}

/// Statement forms.
#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    /// Expression evaluated for its side effects.
    Expr(Expr),
    /// `target = value`.
    Assign {
        /// Where the value is stored.
        target: Target,
        /// Value expression.
        value: Expr,
    },
    /// `target op= value`.
    AugAssign {
        /// Where the value is read from and stored.
        target: Target,
        /// Operator applied to the current value and `value`.
        op: BinOp,
        /// Right-hand operand.
        value: Expr,
    },
    /// `if` / `elif` chain with optional `else`.
    If {
        /// Condition and body per `if`/`elif` arm, in order.
        branches: Vec<(Expr, Vec<Stmt>)>,
        /// `else` body, empty when absent.
        orelse: Vec<Stmt>,
    },
    /// `while test: body`.
    While {
        /// Loop condition.
        test: Expr,
        /// Loop body.
        body: Vec<Stmt>,
    },
    /// `for target in iter: body`.
    For {
        /// Loop variable.
        target: String,
        /// Iterated expression.
        iter: Expr,
        /// Loop body.
        body: Vec<Stmt>,
    },
    /// Function definition.
    Def(Rc<FunctionDef>),
    /// `return [value]`.
    Return(Option<Expr>),
    /// `break`.
    Break,
    /// `continue`.
    Continue,
    /// `pass`.
    Pass,
}

/// Assignment destination.
#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    /// Plain variable.
    Name(String),
    /// `object[index]`.
    Subscript {
        /// Container expression.
        object: Expr,
        /// Index or key expression.
        index: Expr,
    },
}

/// User-defined function.
#[derive(Debug, PartialEq)]
pub struct FunctionDef {
    /// Function name.
    pub name: String,
    /// Positional parameter names.
    pub params: Vec<String>,
    /// Function body.
    pub body: Vec<Stmt>,
}

/// Literal constants.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    /// `None`.
    None,
    /// `True` / `False`.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// String literal.
    Str(String),
}

/// Expression forms.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Constant.
    Literal(Literal),
    /// Variable reference.
    Name(String),
    /// `[a, b, ...]`.
    List(Vec<Expr>),
    /// `{k: v, ...}`.
    Dict(Vec<(Expr, Expr)>),
    /// Prefix operator.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Infix arithmetic or bitwise operator.
    Binary {
        /// Operator.
        op: BinOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Short-circuiting `and` / `or`.
    Logical {
        /// Operator.
        op: LogicalOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand, evaluated only when needed.
        right: Box<Expr>,
    },
    /// Comparison chain `a < b <= c`.
    Compare {
        /// First operand.
        left: Box<Expr>,
        /// Subsequent operators and operands.
        rest: Vec<(CmpOp, Expr)>,
    },
    /// `body if test else orelse`.
    Conditional {
        /// Condition.
        test: Box<Expr>,
        /// Value when the condition holds.
        body: Box<Expr>,
        /// Value otherwise.
        orelse: Box<Expr>,
    },
    /// `callee(args...)`.
    Call {
        /// Called expression.
        callee: Box<Expr>,
        /// Positional arguments.
        args: Vec<Expr>,
    },
    /// `receiver.method(args...)`.
    MethodCall {
        /// Object the method is looked up on.
        receiver: Box<Expr>,
        /// Method name.
        method: String,
        /// Positional arguments.
        args: Vec<Expr>,
    },
    /// `object[index]`.
    Subscript {
        /// Container.
        object: Box<Expr>,
        /// Index or key.
        index: Box<Expr>,
    },
}

/// Prefix operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`.
    Neg,
    /// `+x`.
    Pos,
    /// `not x`.
    Not,
    /// `~x`.
    Invert,
}

/// Infix arithmetic and bitwise operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `//`
    FloorDiv,
    /// `%`
    Mod,
    /// `**`
    Pow,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
}

impl BinOp {
    /// Source spelling of the operator.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
        }
    }
}

/// Short-circuiting operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    /// `and`
    And,
    /// `or`
    Or,
}

/// Comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtE,
    /// `>`
    Gt,
    /// `>=`
    GtE,
    /// `in`
    In,
    /// `not in`
    NotIn,
    /// `is`
    Is,
    /// `is not`
    IsNot,
}
