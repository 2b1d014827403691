//! Allow-list gated dispatch of function-call requests.
//!
//! A [`FunctionCall`] is the record an agent produces when it wants a function
//! run: a name plus a JSON-encoded argument object. The [`Dispatcher`] checks
//! the name against its [`AllowList`], decodes the arguments, resolves the
//! function in a [`FunctionRegistry`], and calls it with exactly those keyword
//! arguments. Names outside the allow-list are refused without running
//! anything; every other failure is returned to the caller as a [`ToolError`].

use std::collections::BTreeSet;
use std::sync::Arc;

use fncall_primitives::FunctionName;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ToolError, ToolResult};
use crate::registry::FunctionRegistry;
use crate::schema::FunctionArgs;

/// Request to run a named function with JSON-encoded keyword arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    name: String,
    arguments: String,
}

impl FunctionCall {
    /// Creates a call request.
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Returns the requested function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the raw JSON argument string.
    #[must_use]
    pub fn arguments(&self) -> &str {
        &self.arguments
    }

    /// Decodes the argument string into a keyword-argument map.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] when the string is not JSON or
    /// does not encode an object.
    pub fn parse_arguments(&self) -> ToolResult<FunctionArgs> {
        let invalid = |reason: String| ToolError::InvalidArguments {
            function: self.name.clone(),
            reason,
        };

        match serde_json::from_str::<Value>(&self.arguments) {
            Ok(Value::Object(args)) => Ok(args),
            Ok(other) => Err(invalid(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
            Err(err) => Err(invalid(err.to_string())),
        }
    }
}

/// Fixed set of function names a dispatcher is permitted to run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList {
    names: BTreeSet<FunctionName>,
}

impl AllowList {
    /// Builds an allow-list from raw names.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidName`] if any entry is not a valid function
    /// name.
    pub fn new<I, S>(names: I) -> ToolResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names
            .into_iter()
            .map(FunctionName::new)
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { names })
    }

    /// Returns true when `name` may be dispatched.
    #[must_use]
    pub fn permits(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Iterates over the permitted names in order.
    pub fn names(&self) -> impl Iterator<Item = &FunctionName> {
        self.names.iter()
    }

    /// Returns true when nothing is permitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<FunctionName> for AllowList {
    fn from_iter<T: IntoIterator<Item = FunctionName>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

/// Result of a dispatch attempt that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The function ran and produced this value.
    Completed(Value),
    /// The request named a function outside the allow-list; nothing ran.
    Rejected {
        /// Name that was refused.
        name: String,
        /// Rejection notice.
        reason: String,
    },
}

impl DispatchOutcome {
    /// Returns true when the call was refused.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Returns the function result, or `None` for a rejected call.
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Rejected { .. } => None,
        }
    }
}

/// Routes [`FunctionCall`]s to registered functions.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    registry: Arc<FunctionRegistry>,
    allow: AllowList,
}

impl Dispatcher {
    /// Creates a dispatcher over `registry` that only runs names in `allow`.
    #[must_use]
    pub fn new(registry: Arc<FunctionRegistry>, allow: AllowList) -> Self {
        for name in allow.names() {
            if !registry.contains(name.as_str()) {
                warn!(function = %name, "allow-listed function is not registered");
            }
        }
        Self { registry, allow }
    }

    /// Returns the registry calls are resolved against.
    #[must_use]
    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    /// Returns the allow-list.
    #[must_use]
    pub fn allow_list(&self) -> &AllowList {
        &self.allow
    }

    /// Runs the function named by `call`.
    ///
    /// A name outside the allow-list is logged and reported as
    /// [`DispatchOutcome::Rejected`] without decoding arguments or running
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] when the argument string is not a
    /// JSON object, [`ToolError::UnknownFunction`] when an allowed name is not
    /// registered, and otherwise whatever the function binding or body returns.
    pub fn dispatch(&self, call: &FunctionCall) -> ToolResult<DispatchOutcome> {
        let name = call.name();
        if !self.allow.permits(name) {
            let reason = format!("function `{name}` is not in the allow-list");
            warn!(function = name, "function call rejected: {reason}");
            return Ok(DispatchOutcome::Rejected {
                name: name.to_owned(),
                reason,
            });
        }

        let args = call.parse_arguments()?;
        debug!(function = name, arguments = args.len(), "dispatching function call");

        let output = self.registry.invoke(name, args)?;
        info!(function = name, "function call completed");
        Ok(DispatchOutcome::Completed(output))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use serde_json::json;

    use crate::schema::{FunctionDescriptor, ParamType, ParameterSpec};

    fn registry(calls: Arc<Mutex<Vec<FunctionArgs>>>) -> Arc<FunctionRegistry> {
        let mut registry = FunctionRegistry::new();
        let descriptor = FunctionDescriptor::builder("add")
            .parameter(ParameterSpec::required("a", ParamType::Integer))
            .parameter(ParameterSpec::defaulted("b", ParamType::Integer, 1))
            .build()
            .unwrap();
        registry
            .register_function(descriptor, move |args: FunctionArgs| -> ToolResult<Value> {
                calls.lock().unwrap().push(args.clone());
                let a = args["a"].as_i64().unwrap_or_default();
                let b = args["b"].as_i64().unwrap_or_default();
                Ok(json!(a + b))
            })
            .unwrap();

        let shutdown = FunctionDescriptor::builder("shutdown").build().unwrap();
        registry
            .register_function(shutdown, |_: FunctionArgs| -> ToolResult<Value> {
                panic!("shutdown must never be dispatched")
            })
            .unwrap();

        Arc::new(registry)
    }

    fn dispatcher(calls: &Arc<Mutex<Vec<FunctionArgs>>>) -> Dispatcher {
        Dispatcher::new(
            registry(Arc::clone(calls)),
            AllowList::new(["add", "ghost"]).unwrap(),
        )
    }

    #[test]
    fn disallowed_call_is_rejected_without_running() {
        let calls = Arc::default();
        let dispatcher = dispatcher(&calls);

        let outcome = dispatcher
            .dispatch(&FunctionCall::new("shutdown", "{}"))
            .unwrap();

        assert!(outcome.is_rejected());
        assert!(matches!(&outcome, DispatchOutcome::Rejected { name, .. } if name == "shutdown"));
        assert_eq!(outcome.into_value(), None);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn rejection_happens_before_argument_decoding() {
        let calls = Arc::default();
        let dispatcher = dispatcher(&calls);

        let outcome = dispatcher
            .dispatch(&FunctionCall::new("shutdown", "not json"))
            .unwrap();
        assert!(outcome.is_rejected());
    }

    #[test]
    fn allowed_call_receives_exactly_its_arguments() {
        let calls = Arc::default();
        let dispatcher = dispatcher(&calls);

        let outcome = dispatcher
            .dispatch(&FunctionCall::new("add", r#"{"a": 2, "b": 40}"#))
            .unwrap();

        assert_eq!(outcome, DispatchOutcome::Completed(json!(42)));
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(Value::Object(calls[0].clone()), json!({ "a": 2, "b": 40 }));
    }

    #[test]
    fn omitted_defaults_are_filled() {
        let calls = Arc::default();
        let dispatcher = dispatcher(&calls);

        let value = dispatcher
            .dispatch(&FunctionCall::new("add", r#"{"a": 2}"#))
            .unwrap()
            .into_value();
        assert_eq!(value, Some(json!(3)));
    }

    #[test]
    fn malformed_arguments_error() {
        let calls = Arc::default();
        let dispatcher = dispatcher(&calls);

        let err = dispatcher
            .dispatch(&FunctionCall::new("add", "{\"a\": "))
            .expect_err("truncated JSON should fail");
        assert!(matches!(err, ToolError::InvalidArguments { .. }));

        let err = dispatcher
            .dispatch(&FunctionCall::new("add", "[1, 2]"))
            .expect_err("array arguments should fail");
        assert!(
            matches!(err, ToolError::InvalidArguments { reason, .. } if reason.contains("an array"))
        );
    }

    #[test]
    fn mismatched_arguments_propagate() {
        let calls = Arc::default();
        let dispatcher = dispatcher(&calls);

        let err = dispatcher
            .dispatch(&FunctionCall::new("add", r#"{"x": 1}"#))
            .expect_err("unknown keyword should fail");
        assert!(matches!(err, ToolError::UnexpectedArgument { name, .. } if name == "x"));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn allowed_but_unregistered_name_errors() {
        let calls = Arc::default();
        let dispatcher = dispatcher(&calls);

        let err = dispatcher
            .dispatch(&FunctionCall::new("ghost", "{}"))
            .expect_err("unregistered function should fail");
        assert!(matches!(err, ToolError::UnknownFunction { name } if name == "ghost"));
    }

    #[test]
    fn call_request_deserializes_from_agent_reply() {
        let call: FunctionCall =
            serde_json::from_value(json!({ "name": "add", "arguments": "{\"a\": 1}" })).unwrap();
        assert_eq!(call.name(), "add");
        assert_eq!(
            Value::Object(call.parse_arguments().unwrap()),
            json!({ "a": 1 })
        );
    }

    #[test]
    fn allow_list_validates_names() {
        let err = AllowList::new(["fine", "not fine"]).unwrap_err();
        assert!(matches!(err, ToolError::InvalidName(_)));

        let allow: AllowList = serde_json::from_value(json!(["b", "a"])).unwrap();
        let names: Vec<_> = allow.names().map(FunctionName::as_str).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(allow.permits("a"));
        assert!(!allow.permits("c"));
    }
}
