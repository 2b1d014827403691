//! Runtime values produced by snippets.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

use serde_json::{Map, Number};

use crate::ast::FunctionDef;
use crate::builtins::Builtin;
use crate::error::RuntimeErrorKind;

/// Shared, mutable list storage.
pub type ListRef = Rc<RefCell<Vec<Value>>>;

/// Shared, mutable dictionary storage in insertion order.
pub type DictRef = Rc<RefCell<Vec<(String, Value)>>>;

/// Container nesting beyond which comparison fails and rendering elides.
const MAX_VALUE_DEPTH: usize = 100;

/// Allocations of the containers currently being walked, outermost first.
type Walk = Vec<*const ()>;

/// A snippet value.
///
/// Lists and dictionaries are reference types: assigning one to a second
/// name aliases it, so mutation through either name is visible through both.
/// A container may hold itself; rendering shows the cycle as `[...]` or
/// `{...}`.
#[derive(Clone)]
pub enum Value {
    /// `None`.
    None,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// String.
    Str(String),
    /// List.
    List(ListRef),
    /// Dictionary with string keys.
    Dict(DictRef),
    /// User-defined function.
    Function(Rc<FunctionDef>),
    /// Built-in function.
    Builtin(Builtin),
}

impl Value {
    /// Wraps `items` in a new list.
    #[must_use]
    pub fn list(items: Vec<Value>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    /// Wraps `entries` in a new dictionary.
    #[must_use]
    pub fn dict(entries: Vec<(String, Value)>) -> Self {
        Self::Dict(Rc::new(RefCell::new(entries)))
    }

    /// Name of the value's type as shown in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Dict(_) => "dict",
            Self::Function(_) => "function",
            Self::Builtin(_) => "builtin_function",
        }
    }

    /// Truth value used by conditions and `not`.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.borrow().is_empty(),
            Self::Dict(entries) => !entries.borrow().is_empty(),
            Self::Function(_) | Self::Builtin(_) => true,
        }
    }

    /// Returns the integer value of ints and bools.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Returns the numeric value of ints, bools, and floats.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            other => other.as_int().map(|i| i as f64),
        }
    }

    /// Returns the string contents of a `str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Value equality with numeric cross-type comparison (`1 == 1.0`).
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeErrorKind::Recursion`] when distinct containers nest
    /// too deeply to compare, which includes containers that hold themselves.
    pub fn equals(&self, other: &Value) -> Result<bool, RuntimeErrorKind> {
        self.equals_within(other, 0)
    }

    fn equals_within(&self, other: &Value, depth: usize) -> Result<bool, RuntimeErrorKind> {
        match (self, other) {
            (Self::List(a), Self::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(true);
                }
                if depth >= MAX_VALUE_DEPTH {
                    return Err(RuntimeErrorKind::Recursion);
                }
                let (a, b) = (a.borrow(), b.borrow());
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !x.equals_within(y, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Self::Dict(a), Self::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(true);
                }
                if depth >= MAX_VALUE_DEPTH {
                    return Err(RuntimeErrorKind::Recursion);
                }
                let (a, b) = (a.borrow(), b.borrow());
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (key, value) in a.iter() {
                    let Some((_, other)) = b.iter().find(|(other, _)| other == key) else {
                        return Ok(false);
                    };
                    if !value.equals_within(other, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Ok(self.scalar_equals(other)),
        }
    }

    fn scalar_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Int(_) | Self::Bool(_), Self::Int(_) | Self::Bool(_)) => {
                self.as_int() == other.as_int()
            }
            (Self::Float(_), _) | (_, Self::Float(_)) => match (self.as_float(), other.as_float())
            {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            _ => false,
        }
    }

    /// Ordering for `<`, `<=`, `>`, `>=`, `min`, `max`, and `sorted`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeErrorKind::Type`] for values that have no ordering and
    /// [`RuntimeErrorKind::Recursion`] for lists nested too deeply to compare.
    pub fn compare(&self, other: &Value) -> Result<Ordering, RuntimeErrorKind> {
        self.compare_within(other, 0)
    }

    fn compare_within(&self, other: &Value, depth: usize) -> Result<Ordering, RuntimeErrorKind> {
        let unordered = || {
            RuntimeErrorKind::Type(format!(
                "`<` not supported between `{}` and `{}`",
                self.type_name(),
                other.type_name()
            ))
        };

        match (self, other) {
            (Self::Int(_) | Self::Bool(_), Self::Int(_) | Self::Bool(_)) => {
                Ok(self.as_int().cmp(&other.as_int()))
            }
            (Self::Str(a), Self::Str(b)) => Ok(a.cmp(b)),
            (Self::List(a), Self::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(Ordering::Equal);
                }
                if depth >= MAX_VALUE_DEPTH {
                    return Err(RuntimeErrorKind::Recursion);
                }
                let (a, b) = (a.borrow(), b.borrow());
                for (x, y) in a.iter().zip(b.iter()) {
                    if x.equals_within(y, depth + 1)? {
                        continue;
                    }
                    return x.compare_within(y, depth + 1);
                }
                Ok(a.len().cmp(&b.len()))
            }
            _ => match (self.as_float(), other.as_float()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).ok_or_else(unordered),
                _ => Err(unordered()),
            },
        }
    }

    /// Quoted, unambiguous rendering used inside containers.
    #[must_use]
    pub fn repr(&self) -> String {
        let mut text = String::new();
        // Writing into a `String` cannot fail.
        let _ = render(self, true, &mut Walk::new(), &mut text);
        text
    }

    /// Converts the value to JSON.
    ///
    /// Non-finite floats become `null` and functions become their display
    /// string. A container that holds itself, or sits deeper than the nesting
    /// limit, becomes the string `"[...]"` or `"{...}"`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        self.json_within(&mut Walk::new())
    }

    fn json_within(&self, walk: &mut Walk) -> serde_json::Value {
        match self {
            Self::None => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => {
                Number::from_f64(*f).map_or(serde_json::Value::Null, serde_json::Value::Number)
            }
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => {
                let id = Rc::as_ptr(items).cast::<()>();
                if !enter(walk, id) {
                    return serde_json::Value::from("[...]");
                }
                let json = items
                    .borrow()
                    .iter()
                    .map(|item| item.json_within(walk))
                    .collect();
                walk.pop();
                json
            }
            Self::Dict(entries) => {
                let id = Rc::as_ptr(entries).cast::<()>();
                if !enter(walk, id) {
                    return serde_json::Value::from("{...}");
                }
                let json = entries
                    .borrow()
                    .iter()
                    .map(|(key, value)| (key.clone(), value.json_within(walk)))
                    .collect::<Map<_, _>>();
                walk.pop();
                serde_json::Value::Object(json)
            }
            Self::Function(_) | Self::Builtin(_) => serde_json::Value::String(self.to_string()),
        }
    }
}

/// Pushes `id` onto `walk` unless it is already being walked or the walk is
/// at the nesting limit.
fn enter(walk: &mut Walk, id: *const ()) -> bool {
    if walk.len() >= MAX_VALUE_DEPTH || walk.contains(&id) {
        return false;
    }
    walk.push(id);
    true
}

/// Writes `value` as `print` shows it, quoting strings when `quoted`.
fn render(value: &Value, quoted: bool, walk: &mut Walk, out: &mut dyn fmt::Write) -> fmt::Result {
    match value {
        Value::None => out.write_str("None"),
        Value::Bool(true) => out.write_str("True"),
        Value::Bool(false) => out.write_str("False"),
        Value::Int(i) => write!(out, "{i}"),
        Value::Float(x) => out.write_str(&format_float(*x)),
        Value::Str(s) if quoted => out.write_str(&quote(s)),
        Value::Str(s) => out.write_str(s),
        Value::List(items) => {
            if !enter(walk, Rc::as_ptr(items).cast::<()>()) {
                return out.write_str("[...]");
            }
            out.write_char('[')?;
            for (i, item) in items.borrow().iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                render(item, true, walk, out)?;
            }
            walk.pop();
            out.write_char(']')
        }
        Value::Dict(entries) => {
            if !enter(walk, Rc::as_ptr(entries).cast::<()>()) {
                return out.write_str("{...}");
            }
            out.write_char('{')?;
            for (i, (key, value)) in entries.borrow().iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                write!(out, "{}: ", quote(key))?;
                render(value, true, walk, out)?;
            }
            walk.pop();
            out.write_char('}')
        }
        Value::Function(def) => write!(out, "<function {}>", def.name),
        Value::Builtin(builtin) => write!(out, "<built-in function {}>", builtin.name()),
    }
}

impl PartialEq for Value {
    /// Snippet `==`; values too deeply nested to compare are unequal.
    fn eq(&self, other: &Self) -> bool {
        matches!(self.equals(other), Ok(true))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        render(self, false, &mut Walk::new(), f)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Self::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Self::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Self::List(_) => f.debug_tuple("List").field(&format_args!("{}", self.repr())).finish(),
            Self::Dict(_) => f.debug_tuple("Dict").field(&format_args!("{}", self.repr())).finish(),
            Self::Function(def) => f.debug_tuple("Function").field(&def.name).finish(),
            Self::Builtin(builtin) => f.debug_tuple("Builtin").field(builtin).finish(),
        }
    }
}

/// Renders floats the way the snippet language prints them: whole numbers
/// keep a trailing `.0`, very large or small magnitudes use exponents.
fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".into();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf".into() } else { "-inf".into() };
    }
    let magnitude = x.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let formatted = format!("{x:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent:0>2}")
            }
            Some((mantissa, exponent)) => {
                format!("{mantissa}e-{:0>2}", &exponent[1..])
            }
            None => formatted,
        };
    }
    if x.fract() == 0.0 {
        format!("{x:.1}")
    } else {
        format!("{x}")
    }
}

fn quote(s: &str) -> String {
    let delimiter = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push(delimiter);
    for c in s.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c if c == delimiter => {
                quoted.push('\\');
                quoted.push(c);
            }
            c => quoted.push(c),
        }
    }
    quoted.push(delimiter);
    quoted
}
