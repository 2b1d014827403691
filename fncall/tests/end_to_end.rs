use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fncall::config;
use fncall::exec::{self, ExecError, Value};
use fncall::tools::{
    DispatchOutcome, Dispatcher, FunctionCall, FunctionRegistry, ToolError, ToolResult, tool,
};
use serde_json::json;

static SNIPPET_RUNS: AtomicUsize = AtomicUsize::new(0);

#[tool]
fn example_function(param1: i64, #[tool(default = "default")] param2: String) -> String {
    format!("{param1}:{param2}")
}

/// Evaluates a code snippet and returns the value of its last expression.
#[tool]
fn run_snippet(code: String) -> Result<serde_json::Value, String> {
    SNIPPET_RUNS.fetch_add(1, Ordering::SeqCst);
    let mut output = Vec::new();
    let value = exec::Executor::new()
        .run_with_output(&code, &mut output)
        .map_err(|err| err.to_string())?;
    Ok(json!({
        "result": value.map(|value| value.to_json()),
        "output": String::from_utf8_lossy(&output),
    }))
}

fn dispatcher(allow: &[&str]) -> Dispatcher {
    let mut registry = FunctionRegistry::new();
    registry
        .register_binding(example_function_binding().unwrap())
        .unwrap();
    registry
        .register_binding(run_snippet_binding().unwrap())
        .unwrap();
    let settings = config::from_toml_str(&format!(
        "[dispatch]\nallow = [{}]\n",
        allow
            .iter()
            .map(|name| format!("\"{name}\""))
            .collect::<Vec<_>>()
            .join(", ")
    ))
    .unwrap();
    Dispatcher::new(
        Arc::new(registry),
        settings.dispatch.allow_list().unwrap(),
    )
}

#[test]
fn descriptor_uses_the_object_schema_layout() {
    let descriptor = example_function_descriptor().unwrap();
    assert_eq!(
        descriptor.to_json(),
        json!({
            "name": "example_function",
            "description": null,
            "parameters": {
                "title": "Input for `example_function`",
                "type": "object",
                "properties": {
                    "param1": { "title": "Param1", "type": "integer" },
                    "param2": { "title": "Param2", "type": "string", "default": "default" },
                },
                "required": ["param1"],
            },
        })
    );
    assert_eq!(
        serde_json::to_value(&descriptor).unwrap(),
        descriptor.to_json()
    );
}

#[test]
fn allowed_call_receives_its_arguments_and_defaults() {
    let dispatcher = dispatcher(&["example_function"]);

    let outcome = dispatcher
        .dispatch(&FunctionCall::new("example_function", r#"{"param1": 7}"#))
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Completed(json!("7:default")));

    let outcome = dispatcher
        .dispatch(&FunctionCall::new(
            "example_function",
            r#"{"param1": 7, "param2": "given"}"#,
        ))
        .unwrap();
    assert_eq!(outcome.into_value(), Some(json!("7:given")));
}

#[test]
fn model_can_run_snippets_through_dispatch() {
    let dispatcher = dispatcher(&["run_snippet"]);
    let call: FunctionCall = serde_json::from_value(json!({
        "name": "run_snippet",
        "arguments": json!({ "code": "xs = [3, 1, 2]\nprint(len(xs))\nsorted(xs)" }).to_string(),
    }))
    .unwrap();

    let outcome = dispatcher.dispatch(&call).unwrap();
    assert_eq!(
        outcome,
        DispatchOutcome::Completed(json!({ "result": [1, 2, 3], "output": "3\n" }))
    );

    let failed = dispatcher
        .dispatch(&FunctionCall::new("run_snippet", r#"{"code": "1 / 0"}"#))
        .unwrap_err();
    assert!(matches!(failed, ToolError::Execution { reason } if reason.contains("division by zero")));
}

#[test]
fn rejected_call_runs_nothing() {
    let dispatcher = dispatcher(&["example_function"]);
    let before = SNIPPET_RUNS.load(Ordering::SeqCst);

    let outcome = dispatcher
        .dispatch(&FunctionCall::new("run_snippet", "not even json"))
        .unwrap();

    assert!(outcome.is_rejected());
    assert_eq!(SNIPPET_RUNS.load(Ordering::SeqCst), before);
}

#[test]
fn bad_arguments_are_errors() -> ToolResult<()> {
    let dispatcher = dispatcher(&["example_function"]);

    let err = dispatcher
        .dispatch(&FunctionCall::new("example_function", r#"{"param2": "x"}"#))
        .unwrap_err();
    assert!(matches!(err, ToolError::MissingArgument { name, .. } if name == "param1"));

    let err = dispatcher
        .dispatch(&FunctionCall::new("example_function", r#"{"param1": "seven"}"#))
        .unwrap_err();
    assert!(matches!(err, ToolError::ArgumentType { name, .. } if name == "param1"));

    let err = dispatcher
        .dispatch(&FunctionCall::new("example_function", "[1]"))
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments { .. }));
    Ok(())
}

#[test]
fn executor_captures_the_trailing_expression() -> Result<(), ExecError> {
    assert_eq!(exec::run("5 + 10")?, Some(Value::Int(15)));
    assert_eq!(exec::run("a = 5\na = a + 10")?, None);
    assert_eq!(exec::run("")?, None);
    assert_eq!(exec::run("a = 1\na + 1")?, Some(Value::Int(2)));
    assert_eq!(exec::run("a = 1\na + 1")?, exec::run("a = 1\na + 1")?);
    Ok(())
}
