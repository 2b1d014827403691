//! Tree-walking evaluator.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use crate::ast::{
    BinOp, CmpOp, Expr, FunctionDef, Literal, LogicalOp, Program, Stmt, StmtKind, Target, UnaryOp,
};
use crate::builtins::{self, Builtin};
use crate::error::{ExecResult, RuntimeErrorKind};
use crate::value::Value;

/// Maximum nesting of user-defined function calls.
pub const MAX_CALL_DEPTH: usize = 128;

/// Maximum number of expressions and blocks being evaluated at once.
///
/// Evaluation recurses on the host stack. Every nested expression and block
/// counts against this budget as well as every call, so the deepest
/// evaluation a snippet can reach fits a 2 MiB thread stack. Plain recursion
/// (one block and one call expression per frame) still reaches
/// [`MAX_CALL_DEPTH`] first.
pub const MAX_EVAL_DEPTH: usize = 300;

type Scope = HashMap<String, Value>;
type OpResult = Result<Value, RuntimeErrorKind>;

/// How a statement finished.
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Evaluates one program in a scope of its own.
///
/// Names are resolved in the innermost function frame, then the global
/// scope, then the builtins. Assignments inside a function bind in its frame.
pub(crate) struct Interpreter<'out> {
    globals: Scope,
    frames: Vec<Scope>,
    depth: usize,
    out: &'out mut dyn Write,
}

impl<'out> Interpreter<'out> {
    pub(crate) fn new(out: &'out mut dyn Write) -> Self {
        Self {
            globals: Scope::new(),
            frames: Vec::new(),
            depth: 0,
            out,
        }
    }

    pub(crate) fn execute(&mut self, program: &Program) -> ExecResult<()> {
        // Placement of `break`, `continue`, and `return` is checked when
        // parsing, so the top level always completes normally.
        self.block(&program.body).map(|_| ())
    }

    /// Removes and returns a global binding.
    pub(crate) fn take_global(&mut self, name: &str) -> Option<Value> {
        self.globals.remove(name)
    }

    /// Charges one level of [`MAX_EVAL_DEPTH`]; [`Self::ascend`] refunds it.
    fn descend(&mut self) -> ExecResult<()> {
        if self.depth >= MAX_EVAL_DEPTH {
            return Err(RuntimeErrorKind::Recursion.into());
        }
        self.depth += 1;
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth -= 1;
    }

    // Statements

    fn block(&mut self, body: &[Stmt]) -> ExecResult<Flow> {
        self.descend()?;
        let flow = self.statements(body);
        self.ascend();
        flow
    }

    fn statements(&mut self, body: &[Stmt]) -> ExecResult<Flow> {
        for stmt in body {
            match self.statement(stmt).map_err(|err| err.located(stmt.line))? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn statement(&mut self, stmt: &Stmt) -> ExecResult<Flow> {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value)?;
            }
            StmtKind::AugAssign { target, op, value } => self.augmented_assign(target, *op, value)?,
            StmtKind::If { branches, orelse } => {
                for (test, body) in branches {
                    if self.eval(test)?.is_truthy() {
                        return self.block(body);
                    }
                }
                return self.block(orelse);
            }
            StmtKind::While { test, body } => {
                while self.eval(test)?.is_truthy() {
                    match self.block(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            StmtKind::For { target, iter, body } => {
                let items = builtins::iterate(&self.eval(iter)?)?;
                for item in items {
                    self.bind(target.clone(), item);
                    match self.block(body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            StmtKind::Def(def) => self.bind(def.name.clone(), Value::Function(Rc::clone(def))),
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Pass => {}
        }
        Ok(Flow::Normal)
    }

    fn assign(&mut self, target: &Target, value: Value) -> ExecResult<()> {
        match target {
            Target::Name(name) => self.bind(name.clone(), value),
            Target::Subscript { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                set_item(&object, &index, value)?;
            }
        }
        Ok(())
    }

    fn augmented_assign(&mut self, target: &Target, op: BinOp, value: &Expr) -> ExecResult<()> {
        match target {
            Target::Name(name) => {
                let current = self.lookup(name)?;
                let operand = self.eval(value)?;
                let updated = binary(op, &current, &operand)?;
                self.bind(name.clone(), updated);
            }
            Target::Subscript { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                let current = get_item(&object, &index)?;
                let operand = self.eval(value)?;
                let updated = binary(op, &current, &operand)?;
                set_item(&object, &index, updated)?;
            }
        }
        Ok(())
    }

    fn bind(&mut self, name: String, value: Value) {
        let scope = self.frames.last_mut().unwrap_or(&mut self.globals);
        scope.insert(name, value);
    }

    fn lookup(&self, name: &str) -> ExecResult<Value> {
        let local = self.frames.last().and_then(|frame| frame.get(name));
        if let Some(value) = local.or_else(|| self.globals.get(name)) {
            return Ok(value.clone());
        }
        Builtin::lookup(name)
            .map(Value::Builtin)
            .ok_or_else(|| RuntimeErrorKind::Name(name.to_owned()).into())
    }

    // Expressions

    fn eval(&mut self, expr: &Expr) -> ExecResult<Value> {
        self.descend()?;
        let value = self.expression(expr);
        self.ascend();
        value
    }

    fn expression(&mut self, expr: &Expr) -> ExecResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::None => Value::None,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(i) => Value::Int(*i),
                Literal::Float(f) => Value::Float(*f),
                Literal::Str(s) => Value::Str(s.clone()),
            }),
            Expr::Name(name) => self.lookup(name),
            Expr::List(items) => {
                let items = self.eval_all(items)?;
                Ok(Value::list(items))
            }
            Expr::Dict(entries) => self.dict_literal(entries),
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                Ok(unary(*op, &operand)?)
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(binary(*op, &left, &right)?)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left)?;
                match (op, left.is_truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.eval(right),
                }
            }
            Expr::Compare { left, rest } => {
                let mut left = self.eval(left)?;
                for (op, right) in rest {
                    let right = self.eval(right)?;
                    if !compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::Conditional { test, body, orelse } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(body)
                } else {
                    self.eval(orelse)
                }
            }
            Expr::Call { callee, args } => {
                let callee = self.eval(callee)?;
                let args = self.eval_all(args)?;
                self.call(&callee, args)
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => {
                let receiver = self.eval(receiver)?;
                let args = self.eval_all(args)?;
                Ok(builtins::call_method(&receiver, method, args)?)
            }
            Expr::Subscript { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                Ok(get_item(&object, &index)?)
            }
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> ExecResult<Vec<Value>> {
        exprs.iter().map(|expr| self.eval(expr)).collect()
    }

    fn dict_literal(&mut self, entries: &[(Expr, Expr)]) -> ExecResult<Value> {
        let dict = Value::dict(Vec::with_capacity(entries.len()));
        for (key, value) in entries {
            let key = self.eval(key)?;
            let value = self.eval(value)?;
            set_item(&dict, &key, value)?;
        }
        Ok(dict)
    }

    fn call(&mut self, callee: &Value, args: Vec<Value>) -> ExecResult<Value> {
        match callee {
            Value::Builtin(builtin) => builtin.call(args, &mut *self.out),
            Value::Function(def) => self.call_function(def, args),
            other => Err(RuntimeErrorKind::Type(format!(
                "`{}` object is not callable",
                other.type_name()
            ))
            .into()),
        }
    }

    fn call_function(&mut self, def: &FunctionDef, args: Vec<Value>) -> ExecResult<Value> {
        if args.len() != def.params.len() {
            return Err(RuntimeErrorKind::Type(format!(
                "`{}` takes {} argument(s) but {} were given",
                def.name,
                def.params.len(),
                args.len()
            ))
            .into());
        }
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(RuntimeErrorKind::Recursion.into());
        }

        self.frames
            .push(def.params.iter().cloned().zip(args).collect());
        let flow = self.block(&def.body);
        self.frames.pop();

        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Normal | Flow::Break | Flow::Continue => Ok(Value::None),
        }
    }
}

fn get_item(object: &Value, index: &Value) -> OpResult {
    match object {
        Value::List(items) => {
            let items = items.borrow();
            let position = builtins::resolve_index(index, items.len())?;
            Ok(items[position].clone())
        }
        Value::Dict(entries) => {
            let key = builtins::dict_key(index)?;
            entries
                .borrow()
                .iter()
                .find(|(existing, _)| existing == key)
                .map(|(_, value)| value.clone())
                .ok_or_else(|| RuntimeErrorKind::Key(key.to_owned()))
        }
        Value::Str(s) => {
            let position = builtins::resolve_index(index, s.chars().count())?;
            Ok(s.chars()
                .nth(position)
                .map_or(Value::None, |c| Value::Str(c.to_string())))
        }
        other => Err(RuntimeErrorKind::Type(format!(
            "`{}` object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn set_item(object: &Value, index: &Value, value: Value) -> Result<(), RuntimeErrorKind> {
    match object {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let position = builtins::resolve_index(index, items.len())?;
            items[position] = value;
            Ok(())
        }
        Value::Dict(entries) => {
            let key = builtins::dict_key(index)?;
            let mut entries = entries.borrow_mut();
            match entries.iter_mut().find(|(existing, _)| existing == key) {
                Some((_, slot)) => *slot = value,
                None => entries.push((key.to_owned(), value)),
            }
            Ok(())
        }
        other => Err(RuntimeErrorKind::Type(format!(
            "`{}` object does not support item assignment",
            other.type_name()
        ))),
    }
}

fn unary(op: UnaryOp, operand: &Value) -> OpResult {
    match (op, operand) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Pos, Value::Float(f)) => Ok(Value::Float(*f)),
        (UnaryOp::Neg | UnaryOp::Pos | UnaryOp::Invert, Value::Int(_) | Value::Bool(_)) => {
            let i = operand.as_int().unwrap_or_default();
            match op {
                UnaryOp::Neg => i.checked_neg().map(Value::Int).ok_or(RuntimeErrorKind::Overflow),
                UnaryOp::Invert => Ok(Value::Int(!i)),
                _ => Ok(Value::Int(i)),
            }
        }
        (_, other) => {
            let symbol = match op {
                UnaryOp::Neg => "-",
                UnaryOp::Pos => "+",
                _ => "~",
            };
            Err(RuntimeErrorKind::Type(format!(
                "bad operand type for unary {symbol}: `{}`",
                other.type_name()
            )))
        }
    }
}

fn binary(op: BinOp, left: &Value, right: &Value) -> OpResult {
    let unsupported = || {
        RuntimeErrorKind::Type(format!(
            "unsupported operand types for {}: `{}` and `{}`",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))
    };

    match (left, right) {
        (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
            let (a, b) = (
                left.as_int().unwrap_or_default(),
                right.as_int().unwrap_or_default(),
            );
            if let (Value::Bool(x), Value::Bool(y)) = (left, right) {
                match op {
                    BinOp::BitAnd => return Ok(Value::Bool(x & y)),
                    BinOp::BitOr => return Ok(Value::Bool(x | y)),
                    BinOp::BitXor => return Ok(Value::Bool(x ^ y)),
                    _ => {}
                }
            }
            int_binary(op, a, b)
        }
        (Value::Str(a), Value::Str(b)) if op == BinOp::Add => Ok(Value::Str(format!("{a}{b}"))),
        (Value::List(a), Value::List(b)) if op == BinOp::Add => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (Value::Str(s), Value::Int(_) | Value::Bool(_)) | (Value::Int(_) | Value::Bool(_), Value::Str(s))
            if op == BinOp::Mul =>
        {
            let count = repeat_count(left.as_int().or(right.as_int()).unwrap_or_default());
            if s.is_empty() || count == 0 {
                return Ok(Value::Str(String::new()));
            }
            let len = s.len().checked_mul(count).ok_or(RuntimeErrorKind::Overflow)?;
            let mut repeated = String::new();
            repeated
                .try_reserve_exact(len)
                .map_err(|_| RuntimeErrorKind::Overflow)?;
            for _ in 0..count {
                repeated.push_str(s);
            }
            Ok(Value::Str(repeated))
        }
        (Value::List(items), Value::Int(_) | Value::Bool(_))
        | (Value::Int(_) | Value::Bool(_), Value::List(items))
            if op == BinOp::Mul =>
        {
            let count = repeat_count(left.as_int().or(right.as_int()).unwrap_or_default());
            let items = items.borrow();
            if items.is_empty() || count == 0 {
                return Ok(Value::list(Vec::new()));
            }
            let len = items
                .len()
                .checked_mul(count)
                .ok_or(RuntimeErrorKind::Overflow)?;
            let mut repeated = Vec::new();
            repeated
                .try_reserve_exact(len)
                .map_err(|_| RuntimeErrorKind::Overflow)?;
            for _ in 0..count {
                repeated.extend(items.iter().cloned());
            }
            Ok(Value::list(repeated))
        }
        _ => match (left.as_float(), right.as_float()) {
            (Some(a), Some(b)) => float_binary(op, a, b).ok_or_else(unsupported)?,
            _ => Err(unsupported()),
        },
    }
}

fn repeat_count(count: i64) -> usize {
    usize::try_from(count.max(0)).unwrap_or(usize::MAX)
}

#[allow(clippy::cast_precision_loss)]
fn int_binary(op: BinOp, a: i64, b: i64) -> OpResult {
    let checked = |result: Option<i64>| result.map(Value::Int).ok_or(RuntimeErrorKind::Overflow);
    match op {
        BinOp::Add => checked(a.checked_add(b)),
        BinOp::Sub => checked(a.checked_sub(b)),
        BinOp::Mul => checked(a.checked_mul(b)),
        BinOp::Div => {
            if b == 0 {
                return Err(RuntimeErrorKind::ZeroDivision);
            }
            Ok(Value::Float(a as f64 / b as f64))
        }
        BinOp::FloorDiv => {
            if b == 0 {
                return Err(RuntimeErrorKind::ZeroDivision);
            }
            let quotient = a.checked_div(b).ok_or(RuntimeErrorKind::Overflow)?;
            let inexact = a % b != 0;
            if inexact && ((a < 0) != (b < 0)) {
                Ok(Value::Int(quotient - 1))
            } else {
                Ok(Value::Int(quotient))
            }
        }
        BinOp::Mod => {
            if b == 0 {
                return Err(RuntimeErrorKind::ZeroDivision);
            }
            // The remainder takes the sign of the divisor.
            let remainder = a.checked_rem(b).unwrap_or(0);
            if remainder != 0 && ((remainder < 0) != (b < 0)) {
                Ok(Value::Int(remainder + b))
            } else {
                Ok(Value::Int(remainder))
            }
        }
        BinOp::Pow => {
            if b < 0 {
                return float_binary(op, a as f64, b as f64).ok_or(RuntimeErrorKind::Overflow)?;
            }
            match a {
                0 | 1 => Ok(Value::Int(if b == 0 { 1 } else { a })),
                -1 => Ok(Value::Int(if b % 2 == 0 { 1 } else { -1 })),
                _ => {
                    let exponent = u32::try_from(b).map_err(|_| RuntimeErrorKind::Overflow)?;
                    checked(a.checked_pow(exponent))
                }
            }
        }
        BinOp::BitAnd => Ok(Value::Int(a & b)),
        BinOp::BitOr => Ok(Value::Int(a | b)),
        BinOp::BitXor => Ok(Value::Int(a ^ b)),
        BinOp::Shl | BinOp::Shr if b < 0 => {
            Err(RuntimeErrorKind::Value("negative shift count".into()))
        }
        BinOp::Shl => {
            if a == 0 {
                return Ok(Value::Int(0));
            }
            let shift = u32::try_from(b)
                .ok()
                .filter(|&shift| shift < 64)
                .ok_or(RuntimeErrorKind::Overflow)?;
            let shifted = a << shift;
            if shifted >> shift == a {
                Ok(Value::Int(shifted))
            } else {
                Err(RuntimeErrorKind::Overflow)
            }
        }
        BinOp::Shr => {
            let shift = u32::try_from(b.min(63)).unwrap_or(63);
            Ok(Value::Int(a >> shift))
        }
    }
}

/// Float arithmetic. Returns `None` for operators floats do not support.
fn float_binary(op: BinOp, a: f64, b: f64) -> Option<OpResult> {
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div | BinOp::FloorDiv | BinOp::Mod if b == 0.0 => {
            return Some(Err(RuntimeErrorKind::ZeroDivision));
        }
        BinOp::Div => a / b,
        BinOp::FloorDiv => (a / b).floor(),
        BinOp::Mod => {
            let remainder = a % b;
            if remainder != 0.0 && ((remainder < 0.0) != (b < 0.0)) {
                remainder + b
            } else {
                remainder
            }
        }
        BinOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Some(Err(RuntimeErrorKind::ZeroDivision));
            }
            if a < 0.0 && b.fract() != 0.0 {
                return Some(Err(RuntimeErrorKind::Value(
                    "negative number cannot be raised to a fractional power".into(),
                )));
            }
            a.powf(b)
        }
        BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr => return None,
    };
    Some(Ok(Value::Float(value)))
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<bool, RuntimeErrorKind> {
    Ok(match op {
        CmpOp::Eq => left.equals(right)?,
        CmpOp::NotEq => !left.equals(right)?,
        CmpOp::Lt => left.compare(right)?.is_lt(),
        CmpOp::LtE => left.compare(right)?.is_le(),
        CmpOp::Gt => left.compare(right)?.is_gt(),
        CmpOp::GtE => left.compare(right)?.is_ge(),
        CmpOp::In => contains(right, left)?,
        CmpOp::NotIn => !contains(right, left)?,
        CmpOp::Is => identical(left, right),
        CmpOp::IsNot => !identical(left, right),
    })
}

fn contains(container: &Value, item: &Value) -> Result<bool, RuntimeErrorKind> {
    match container {
        Value::List(items) => {
            for candidate in items.borrow().iter() {
                if candidate.equals(item)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Value::Dict(entries) => Ok(item
            .as_str()
            .is_some_and(|key| entries.borrow().iter().any(|(existing, _)| existing == key))),
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(RuntimeErrorKind::Type(format!(
                "`in <str>` requires str as left operand, not `{}`",
                other.type_name()
            ))),
        },
        other => Err(RuntimeErrorKind::Type(format!(
            "argument of type `{}` is not iterable",
            other.type_name()
        ))),
    }
}

/// Identity: reference types compare by allocation, everything else by value
/// within the same type.
fn identical(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
        (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Builtin(a), Value::Builtin(b)) => a == b,
        _ => false,
    }
}
