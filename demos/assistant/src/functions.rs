//! Functions the demo exposes to the model.

use fncall::exec::Executor;
use fncall::tools::{FunctionRegistry, ToolResult, tool};
use serde_json::{Value, json};

/// Get the current weather in a given location.
#[tool]
pub fn get_current_weather(location: String, #[tool(default = "celsius")] unit: String) -> Value {
    // Canned reading; a real deployment would call a weather service here.
    let temperature = if unit == "fahrenheit" { 72 } else { 22 };
    json!({
        "location": location,
        "temperature": temperature,
        "unit": unit,
        "forecast": ["sunny", "windy"],
    })
}

/// Evaluate a code snippet and return the value of its last expression.
///
/// Anything the snippet prints is returned alongside the result.
#[tool]
pub fn run_snippet(code: String) -> Result<Value, String> {
    let mut printed = Vec::new();
    let result = Executor::new()
        .run_with_output(&code, &mut printed)
        .map_err(|err| err.to_string())?;
    Ok(json!({
        "result": result.map(|value| value.to_json()),
        "output": String::from_utf8_lossy(&printed),
    }))
}

/// Builds the registry of every demo function.
pub fn registry() -> ToolResult<FunctionRegistry> {
    let mut registry = FunctionRegistry::new();
    registry.register_binding(get_current_weather_binding()?)?;
    registry.register_binding(run_snippet_binding()?)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_describes_every_function() {
        let registry = registry().unwrap();
        let names: Vec<_> = registry
            .descriptors()
            .iter()
            .map(|descriptor| descriptor.name().to_string())
            .collect();
        assert_eq!(names, ["get_current_weather", "run_snippet"]);
    }

    #[test]
    fn snippets_report_result_and_output() {
        let reply = run_snippet("print('hi')\n6 * 7".to_owned()).unwrap();
        assert_eq!(reply, json!({ "result": 42, "output": "hi\n" }));

        let reply = run_snippet("x = 1".to_owned()).unwrap();
        assert_eq!(reply["result"], Value::Null);

        assert!(run_snippet("import os".to_owned()).is_err());
    }

    #[test]
    fn hostile_snippets_fail_cleanly() {
        let reply = run_snippet("a = [1]\na.append(a)\nprint(a)\na".to_owned()).unwrap();
        assert_eq!(reply, json!({ "result": [1, "[...]"], "output": "[1, [...]]\n" }));

        let err = run_snippet("a = []\na.append(a)\nb = []\nb.append(b)\na == b".to_owned())
            .unwrap_err();
        assert!(err.contains("maximum recursion depth exceeded"));

        let err = run_snippet("[1] * (2 ** 62)".to_owned()).unwrap_err();
        assert!(err.contains("integer overflow"));
    }
}
