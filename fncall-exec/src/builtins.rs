//! Built-in functions and methods available to every snippet.

use std::cmp::Ordering;
use std::io::Write;
use std::num::IntErrorKind;

use crate::error::{ExecResult, RuntimeErrorKind};
use crate::value::Value;

type BuiltinResult = Result<Value, RuntimeErrorKind>;

/// Functions bound in the global scope before a snippet runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    /// `print(*values)`
    Print,
    /// `len(x)`
    Len,
    /// `str(x)`
    Str,
    /// `int(x)`
    Int,
    /// `float(x)`
    Float,
    /// `bool(x)`
    Bool,
    /// `abs(x)`
    Abs,
    /// `min(iterable)` or `min(a, b, ...)`
    Min,
    /// `max(iterable)` or `max(a, b, ...)`
    Max,
    /// `sum(iterable[, start])`
    Sum,
    /// `range([start,] stop[, step])`
    Range,
    /// `sorted(iterable)`
    Sorted,
}

const ALL: [Builtin; 12] = [
    Builtin::Print,
    Builtin::Len,
    Builtin::Str,
    Builtin::Int,
    Builtin::Float,
    Builtin::Bool,
    Builtin::Abs,
    Builtin::Min,
    Builtin::Max,
    Builtin::Sum,
    Builtin::Range,
    Builtin::Sorted,
];

impl Builtin {
    /// Name the builtin is bound to.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Print => "print",
            Self::Len => "len",
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Abs => "abs",
            Self::Min => "min",
            Self::Max => "max",
            Self::Sum => "sum",
            Self::Range => "range",
            Self::Sorted => "sorted",
        }
    }

    /// Finds the builtin bound to `name`.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    /// Calls the builtin. `print` writes to `out`.
    pub(crate) fn call(self, args: Vec<Value>, out: &mut dyn Write) -> ExecResult<Value> {
        let result = match self {
            Self::Print => {
                let line = args
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(out, "{line}")?;
                Ok(Value::None)
            }
            Self::Len => {
                let [value] = exact::<1>(self.name(), args)?;
                len(&value)
            }
            Self::Str => match optional(self.name(), args)? {
                None => Ok(Value::from("")),
                Some(value) => Ok(Value::Str(value.to_string())),
            },
            Self::Int => match optional(self.name(), args)? {
                None => Ok(Value::Int(0)),
                Some(value) => to_int(&value),
            },
            Self::Float => match optional(self.name(), args)? {
                None => Ok(Value::Float(0.0)),
                Some(value) => to_float(&value),
            },
            Self::Bool => match optional(self.name(), args)? {
                None => Ok(Value::Bool(false)),
                Some(value) => Ok(Value::Bool(value.is_truthy())),
            },
            Self::Abs => {
                let [value] = exact::<1>(self.name(), args)?;
                abs(&value)
            }
            Self::Min => extreme(self.name(), args, Ordering::Less),
            Self::Max => extreme(self.name(), args, Ordering::Greater),
            Self::Sum => sum(args),
            Self::Range => range(args),
            Self::Sorted => {
                let [value] = exact::<1>(self.name(), args)?;
                sorted(iterate(&value)?).map(Value::list)
            }
        };
        Ok(result?)
    }
}

/// Materializes the items a `for` loop or builtin iterates over: list
/// items, dictionary keys, or string characters.
pub(crate) fn iterate(value: &Value) -> Result<Vec<Value>, RuntimeErrorKind> {
    match value {
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Dict(entries) => Ok(entries
            .borrow()
            .iter()
            .map(|(key, _)| Value::Str(key.clone()))
            .collect()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        other => Err(RuntimeErrorKind::Type(format!(
            "`{}` is not iterable",
            other.type_name()
        ))),
    }
}

/// Calls `receiver.method(args)`.
pub(crate) fn call_method(receiver: &Value, method: &str, args: Vec<Value>) -> BuiltinResult {
    match (receiver, method) {
        (Value::List(items), "append") => {
            let [item] = exact::<1>("append", args)?;
            items.borrow_mut().push(item);
            Ok(Value::None)
        }
        (Value::List(items), "pop") => {
            let mut items = items.borrow_mut();
            let index = match optional("pop", args)? {
                None => items.len().checked_sub(1).ok_or(RuntimeErrorKind::Index)?,
                Some(index) => resolve_index(&index, items.len())?,
            };
            Ok(items.remove(index))
        }
        (Value::Dict(entries), "get") => {
            let (key, default) = match <[Value; 1]>::try_from(args) {
                Ok([key]) => (key, Value::None),
                Err(args) => {
                    let [key, default] = exact::<2>("get", args)?;
                    (key, default)
                }
            };
            let key = dict_key(&key)?;
            Ok(entries
                .borrow()
                .iter()
                .find(|(k, _)| *k == key)
                .map_or(default, |(_, value)| value.clone()))
        }
        (Value::Dict(entries), "keys") => {
            exact::<0>("keys", args)?;
            Ok(Value::list(
                entries
                    .borrow()
                    .iter()
                    .map(|(key, _)| Value::Str(key.clone()))
                    .collect(),
            ))
        }
        (Value::Dict(entries), "values") => {
            exact::<0>("values", args)?;
            Ok(Value::list(
                entries.borrow().iter().map(|(_, value)| value.clone()).collect(),
            ))
        }
        (Value::Str(s), "upper") => {
            exact::<0>("upper", args)?;
            Ok(Value::Str(s.to_uppercase()))
        }
        (Value::Str(s), "lower") => {
            exact::<0>("lower", args)?;
            Ok(Value::Str(s.to_lowercase()))
        }
        (Value::Str(s), "strip") => {
            exact::<0>("strip", args)?;
            Ok(Value::from(s.trim()))
        }
        (Value::Str(s), "split") => {
            let parts: Vec<Value> = match optional("split", args)? {
                None => s.split_whitespace().map(Value::from).collect(),
                Some(Value::Str(sep)) if sep.is_empty() => {
                    return Err(RuntimeErrorKind::Value("empty separator".into()));
                }
                Some(Value::Str(sep)) => s.split(sep.as_str()).map(Value::from).collect(),
                Some(other) => {
                    return Err(RuntimeErrorKind::Type(format!(
                        "separator must be str, not `{}`",
                        other.type_name()
                    )));
                }
            };
            Ok(Value::list(parts))
        }
        (Value::Str(s), "join") => {
            let [items] = exact::<1>("join", args)?;
            let parts = iterate(&items)?
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_owned).ok_or_else(|| {
                        RuntimeErrorKind::Type(format!(
                            "join expects str items, found `{}`",
                            item.type_name()
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Str(parts.join(s)))
        }
        (other, _) => Err(RuntimeErrorKind::Type(format!(
            "`{}` has no method `{method}`",
            other.type_name()
        ))),
    }
}

/// Converts a subscript into a position within a sequence of `len` items,
/// counting negative indices from the end.
pub(crate) fn resolve_index(index: &Value, len: usize) -> Result<usize, RuntimeErrorKind> {
    let Some(index) = index.as_int() else {
        return Err(RuntimeErrorKind::Type(format!(
            "indices must be integers, not `{}`",
            index.type_name()
        )));
    };
    let len = i64::try_from(len).map_err(|_| RuntimeErrorKind::Index)?;
    let position = if index < 0 { index + len } else { index };
    if (0..len).contains(&position) {
        usize::try_from(position).map_err(|_| RuntimeErrorKind::Index)
    } else {
        Err(RuntimeErrorKind::Index)
    }
}

/// Dictionary keys are strings.
pub(crate) fn dict_key(key: &Value) -> Result<&str, RuntimeErrorKind> {
    key.as_str().ok_or_else(|| {
        RuntimeErrorKind::Type(format!(
            "dictionary keys must be str, not `{}`",
            key.type_name()
        ))
    })
}

fn exact<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N], RuntimeErrorKind> {
    let count = args.len();
    args.try_into().map_err(|_| {
        RuntimeErrorKind::Type(format!(
            "`{name}` takes {N} argument(s) but {count} were given"
        ))
    })
}

fn optional(name: &str, args: Vec<Value>) -> Result<Option<Value>, RuntimeErrorKind> {
    if args.len() > 1 {
        return Err(RuntimeErrorKind::Type(format!(
            "`{name}` takes at most 1 argument but {} were given",
            args.len()
        )));
    }
    Ok(args.into_iter().next())
}

fn len(value: &Value) -> BuiltinResult {
    let len = match value {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.borrow().len(),
        Value::Dict(entries) => entries.borrow().len(),
        other => {
            return Err(RuntimeErrorKind::Type(format!(
                "`{}` has no len()",
                other.type_name()
            )));
        }
    };
    i64::try_from(len)
        .map(Value::Int)
        .map_err(|_| RuntimeErrorKind::Overflow)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn to_int(value: &Value) -> BuiltinResult {
    match value {
        Value::Int(_) | Value::Bool(_) => Ok(Value::Int(value.as_int().unwrap_or_default())),
        Value::Float(f) if f.is_nan() => Err(RuntimeErrorKind::Value(
            "cannot convert nan to int".into(),
        )),
        Value::Float(f) => {
            let truncated = f.trunc();
            if truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
                Ok(Value::Int(truncated as i64))
            } else {
                Err(RuntimeErrorKind::Overflow)
            }
        }
        Value::Str(s) => s
            .trim()
            .replace('_', "")
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|err| match err.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => RuntimeErrorKind::Overflow,
                _ => RuntimeErrorKind::Value(format!("invalid literal for int(): '{s}'")),
            }),
        other => Err(RuntimeErrorKind::Type(format!(
            "int() argument must be a string or a number, not `{}`",
            other.type_name()
        ))),
    }
}

fn to_float(value: &Value) -> BuiltinResult {
    if let Some(f) = value.as_float() {
        return Ok(Value::Float(f));
    }
    match value {
        Value::Str(s) => {
            let text = s.trim();
            let parsed = match text.to_ascii_lowercase().as_str() {
                "nan" => Some(f64::NAN),
                "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
                "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
                _ => text.parse::<f64>().ok(),
            };
            parsed.map(Value::Float).ok_or_else(|| {
                RuntimeErrorKind::Value(format!("could not convert string to float: '{s}'"))
            })
        }
        other => Err(RuntimeErrorKind::Type(format!(
            "float() argument must be a string or a number, not `{}`",
            other.type_name()
        ))),
    }
}

fn abs(value: &Value) -> BuiltinResult {
    match value {
        Value::Float(f) => Ok(Value::Float(f.abs())),
        Value::Int(_) | Value::Bool(_) => value
            .as_int()
            .unwrap_or_default()
            .checked_abs()
            .map(Value::Int)
            .ok_or(RuntimeErrorKind::Overflow),
        other => Err(RuntimeErrorKind::Type(format!(
            "bad operand type for abs(): `{}`",
            other.type_name()
        ))),
    }
}

/// `min` when `wanted` is `Less`, `max` when it is `Greater`. Ties keep the
/// first candidate.
fn extreme(name: &str, args: Vec<Value>, wanted: Ordering) -> BuiltinResult {
    let candidates = match <[Value; 1]>::try_from(args) {
        Ok([iterable]) => iterate(&iterable)?,
        Err(args) => args,
    };
    let mut candidates = candidates.into_iter();
    let Some(mut best) = candidates.next() else {
        return Err(RuntimeErrorKind::Value(format!("{name}() arg is an empty sequence")));
    };
    for candidate in candidates {
        if candidate.compare(&best)? == wanted {
            best = candidate;
        }
    }
    Ok(best)
}

fn sum(args: Vec<Value>) -> BuiltinResult {
    let (iterable, start) = match <[Value; 1]>::try_from(args) {
        Ok([iterable]) => (iterable, Value::Int(0)),
        Err(args) => {
            let [iterable, start] = exact::<2>("sum", args)?;
            (iterable, start)
        }
    };
    iterate(&iterable)?
        .into_iter()
        .try_fold(start, |total, item| match (&total, &item) {
            (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => total
                .as_int()
                .unwrap_or_default()
                .checked_add(item.as_int().unwrap_or_default())
                .map(Value::Int)
                .ok_or(RuntimeErrorKind::Overflow),
            _ => match (total.as_float(), item.as_float()) {
                (Some(a), Some(b)) => Ok(Value::Float(a + b)),
                _ => Err(RuntimeErrorKind::Type(format!(
                    "unsupported operand types for sum: `{}` and `{}`",
                    total.type_name(),
                    item.type_name()
                ))),
            },
        })
}

fn range(args: Vec<Value>) -> BuiltinResult {
    let bounds = args
        .iter()
        .map(|arg| {
            arg.as_int().ok_or_else(|| {
                RuntimeErrorKind::Type(format!(
                    "range() arguments must be integers, not `{}`",
                    arg.type_name()
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => {
            return Err(RuntimeErrorKind::Type(format!(
                "range expected 1 to 3 arguments, got {}",
                bounds.len()
            )));
        }
    };
    if step == 0 {
        return Err(RuntimeErrorKind::Value("range() arg 3 must not be zero".into()));
    }

    let span = i128::from(stop) - i128::from(start);
    let step_wide = i128::from(step);
    let count = if (span > 0) == (step > 0) && span != 0 {
        (span.abs() + step_wide.abs() - 1) / step_wide.abs()
    } else {
        0
    };
    let count = usize::try_from(count).map_err(|_| RuntimeErrorKind::Overflow)?;

    let mut items = Vec::new();
    items
        .try_reserve_exact(count)
        .map_err(|_| RuntimeErrorKind::Overflow)?;
    let mut current = start;
    for _ in 0..count {
        items.push(Value::Int(current));
        current = current.wrapping_add(step);
    }
    Ok(Value::list(items))
}

fn sorted(mut items: Vec<Value>) -> Result<Vec<Value>, RuntimeErrorKind> {
    let mut failure = None;
    items.sort_by(|a, b| {
        a.compare(b).unwrap_or_else(|err| {
            failure.get_or_insert(err);
            Ordering::Equal
        })
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(builtin: Builtin, args: Vec<Value>) -> Value {
        builtin.call(args, &mut Vec::new()).unwrap()
    }

    #[test]
    fn lookup_knows_every_builtin() {
        for builtin in ALL {
            assert_eq!(Builtin::lookup(builtin.name()), Some(builtin));
        }
        assert_eq!(Builtin::lookup("eval"), None);
    }

    #[test]
    fn print_joins_arguments_with_spaces() {
        let mut out = Vec::new();
        Builtin::Print
            .call(vec![Value::from("total"), Value::Int(3), Value::None], &mut out)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "total 3 None\n");
    }

    #[test]
    fn conversions() {
        assert_eq!(call(Builtin::Int, vec![Value::Float(-2.9)]), Value::Int(-2));
        assert_eq!(call(Builtin::Int, vec![Value::from(" 42 ")]), Value::Int(42));
        assert_eq!(call(Builtin::Float, vec![Value::Int(2)]), Value::Float(2.0));
        assert_eq!(call(Builtin::Str, vec![Value::Float(1.0)]), Value::from("1.0"));
        assert_eq!(call(Builtin::Bool, vec![Value::list(vec![])]), Value::Bool(false));

        let err = Builtin::Int
            .call(vec![Value::from("4x")], &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err.runtime_kind(), Some(RuntimeErrorKind::Value(_))));
    }

    #[test]
    fn oversized_int_literals_overflow() {
        for text in ["9".repeat(30), format!("-{}", "9".repeat(30))] {
            let err = Builtin::Int
                .call(vec![Value::from(text)], &mut Vec::new())
                .unwrap_err();
            assert_eq!(err.runtime_kind(), Some(&RuntimeErrorKind::Overflow));
        }
        assert_eq!(
            call(Builtin::Int, vec![Value::from("-9_223_372_036_854_775_808")]),
            Value::Int(i64::MIN)
        );
    }

    #[test]
    fn aggregates() {
        let numbers = Value::list(vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        assert_eq!(call(Builtin::Min, vec![numbers.clone()]), Value::Int(1));
        assert_eq!(call(Builtin::Max, vec![Value::Int(4), Value::Float(4.5)]), Value::Float(4.5));
        assert_eq!(call(Builtin::Sum, vec![numbers.clone()]), Value::Int(6));
        assert_eq!(
            call(Builtin::Sum, vec![numbers.clone(), Value::Float(0.5)]),
            Value::Float(6.5)
        );
        assert_eq!(call(Builtin::Sorted, vec![numbers]).to_string(), "[1, 2, 3]");
        assert_eq!(call(Builtin::Len, vec![Value::from("héllo")]), Value::Int(5));
    }

    #[test]
    fn range_follows_step_direction() {
        assert_eq!(call(Builtin::Range, vec![Value::Int(3)]).to_string(), "[0, 1, 2]");
        assert_eq!(
            call(Builtin::Range, vec![Value::Int(5), Value::Int(0), Value::Int(-2)]).to_string(),
            "[5, 3, 1]"
        );
        assert!(
            Builtin::Range
                .call(vec![Value::Int(1), Value::Int(2), Value::Int(0)], &mut Vec::new())
                .is_err()
        );
        assert_eq!(
            call(Builtin::Range, vec![Value::Int(0), Value::Int(7), Value::Int(3)]).to_string(),
            "[0, 3, 6]"
        );
        assert_eq!(
            call(Builtin::Range, vec![Value::Int(3), Value::Int(0)]).to_string(),
            "[]"
        );
        assert_eq!(
            call(
                Builtin::Range,
                vec![Value::Int(i64::MAX - 1), Value::Int(i64::MAX)]
            )
            .to_string(),
            "[9223372036854775806]"
        );
    }

    #[test]
    fn huge_ranges_fail_without_allocating() {
        let err = Builtin::Range
            .call(vec![Value::Int(i64::MIN), Value::Int(i64::MAX)], &mut Vec::new())
            .unwrap_err();
        assert_eq!(err.runtime_kind(), Some(&RuntimeErrorKind::Overflow));
    }

    #[test]
    fn sorting_mixed_types_fails() {
        let mixed = Value::list(vec![Value::Int(1), Value::from("a")]);
        let err = Builtin::Sorted.call(vec![mixed], &mut Vec::new()).unwrap_err();
        assert!(matches!(err.runtime_kind(), Some(RuntimeErrorKind::Type(_))));
    }

    #[test]
    fn methods() {
        let items = Value::list(vec![Value::Int(1)]);
        call_method(&items, "append", vec![Value::Int(2)]).unwrap();
        assert_eq!(call_method(&items, "pop", vec![Value::Int(0)]).unwrap(), Value::Int(1));
        assert_eq!(items.to_string(), "[2]");

        let dict = Value::dict(vec![("a".into(), Value::Int(1))]);
        assert_eq!(call_method(&dict, "get", vec![Value::from("a")]).unwrap(), Value::Int(1));
        assert_eq!(
            call_method(&dict, "get", vec![Value::from("b"), Value::Int(0)]).unwrap(),
            Value::Int(0)
        );
        assert_eq!(call_method(&dict, "keys", vec![]).unwrap().to_string(), "['a']");

        let words = call_method(&Value::from(" a b "), "split", vec![]).unwrap();
        assert_eq!(
            call_method(&Value::from("-"), "join", vec![words]).unwrap(),
            Value::from("a-b")
        );
        assert!(matches!(
            call_method(&Value::Int(1), "upper", vec![]),
            Err(RuntimeErrorKind::Type(_))
        ));
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        assert_eq!(resolve_index(&Value::Int(-1), 3).unwrap(), 2);
        assert_eq!(resolve_index(&Value::Int(3), 3), Err(RuntimeErrorKind::Index));
        assert!(matches!(
            resolve_index(&Value::from("0"), 3),
            Err(RuntimeErrorKind::Type(_))
        ));
    }
}
