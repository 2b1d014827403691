//! Function description, registration, and dispatch for function-calling agents.
//!
//! The modules exposed here describe functions to a language model
//! ([`schema`]), hold their implementations in an explicit registry
//! ([`registry`]), and route the model's function-call requests to them behind
//! an allow-list ([`dispatch`]).

#![warn(missing_docs, clippy::pedantic)]

extern crate self as fncall_tools;

pub mod dispatch;
pub mod error;
pub mod macros;
pub mod registry;
pub mod schema;

pub use dispatch::{AllowList, DispatchOutcome, Dispatcher, FunctionCall};
pub use error::{ToolError, ToolResult};
pub use macros::tool;
pub use registry::{Function, FunctionBinding, FunctionHandle, FunctionRegistry};
pub use schema::{
    FunctionArgs, FunctionDescriptor, FunctionDescriptorBuilder, ParamType, ParameterSpec,
    Requirement,
};

#[doc(hidden)]
pub mod __private {
    //! Support items referenced by `#[tool]` expansions.

    pub use serde_json::{Value, json};

    use serde::Serialize;
    use serde::de::DeserializeOwned;

    use crate::{FunctionArgs, ToolError, ToolResult};

    /// Removes `name` from `args` and decodes it as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ArgumentType`] when the value does not decode.
    pub fn take_argument<T: DeserializeOwned>(
        function: &str,
        args: &mut FunctionArgs,
        name: &str,
    ) -> ToolResult<T> {
        let value = args.remove(name).unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|err| ToolError::ArgumentType {
            function: function.to_owned(),
            name: name.to_owned(),
            reason: err.to_string(),
        })
    }

    /// Encodes a function's return value.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Execution`] when the value cannot be represented
    /// as JSON.
    pub fn to_output<T: Serialize>(function: &str, output: T) -> ToolResult<Value> {
        serde_json::to_value(output).map_err(|err| {
            ToolError::execution(format!("`{function}` returned an unencodable value: {err}"))
        })
    }
}
