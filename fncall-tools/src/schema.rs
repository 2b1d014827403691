//! Function descriptors and their JSON-Schema rendering.
//!
//! A [`FunctionDescriptor`] records a function's name, documentation, and an
//! ordered list of [`ParameterSpec`]s. Descriptors are either assembled by
//! hand through [`FunctionDescriptor::builder`] or generated from a typed
//! declaration by the `#[tool]` attribute. Serializing a descriptor yields the
//! `{name, description, parameters}` record handed to a language model, where
//! `parameters` is an object schema describing the keyword arguments.

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

use fncall_primitives::{FunctionName, validate_parameter_name};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::error::{ToolError, ToolResult};

/// Keyword arguments passed to a function, keyed by parameter name.
pub type FunctionArgs = Map<String, Value>;

/// Declared type of a parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    /// Whole number.
    Integer,
    /// Any JSON number.
    Number,
    /// UTF-8 string.
    String,
    /// `true` or `false`.
    Boolean,
    /// Homogeneous list of the inner type.
    Array(Box<ParamType>),
    /// JSON object with arbitrary keys.
    Object,
    /// Unconstrained value.
    Any,
}

impl ParamType {
    /// Creates an array type over `items`.
    #[must_use]
    pub fn array(items: ParamType) -> Self {
        Self::Array(Box::new(items))
    }

    /// Returns the JSON-Schema `type` keyword, or `None` for [`ParamType::Any`].
    #[must_use]
    pub fn json_type(&self) -> Option<&'static str> {
        match self {
            Self::Integer => Some("integer"),
            Self::Number => Some("number"),
            Self::String => Some("string"),
            Self::Boolean => Some("boolean"),
            Self::Array(_) => Some("array"),
            Self::Object => Some("object"),
            Self::Any => None,
        }
    }

    /// Returns true when `value` is a well-typed instance.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (Self::Integer, Value::Number(number)) => number.is_i64() || number.is_u64(),
            (Self::Number, Value::Number(_))
            | (Self::String, Value::String(_))
            | (Self::Boolean, Value::Bool(_))
            | (Self::Object, Value::Object(_)) => true,
            (Self::Array(items), Value::Array(values)) => values.iter().all(|v| items.accepts(v)),
            _ => false,
        }
    }

    fn schema(&self) -> Map<String, Value> {
        let mut schema = Map::new();
        if let Some(ty) = self.json_type() {
            schema.insert("type".into(), Value::from(ty));
        }
        if let Self::Array(items) = self {
            schema.insert("items".into(), Value::Object(items.schema()));
        }
        schema
    }
}

impl Display for ParamType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array(items) => write!(f, "array of {items}"),
            Self::Any => f.write_str("any"),
            other => f.write_str(other.json_type().unwrap_or("any")),
        }
    }
}

/// Whether a parameter must be supplied, and what fills it when absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Requirement {
    /// The caller must supply a value.
    Required,
    /// The value falls back to the given default.
    Default(Value),
    /// The value falls back to `null`.
    Optional,
}

/// Description of a single parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterSpec {
    name: String,
    ty: ParamType,
    requirement: Requirement,
}

impl ParameterSpec {
    /// A parameter that must be supplied.
    #[must_use]
    pub fn required(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            requirement: Requirement::Required,
        }
    }

    /// A parameter that falls back to `default` when omitted.
    #[must_use]
    pub fn defaulted(name: impl Into<String>, ty: ParamType, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            ty,
            requirement: Requirement::Default(default.into()),
        }
    }

    /// A parameter that may be omitted or `null`.
    #[must_use]
    pub fn optional(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            requirement: Requirement::Optional,
        }
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type.
    #[must_use]
    pub fn ty(&self) -> &ParamType {
        &self.ty
    }

    /// Returns the requirement marker.
    #[must_use]
    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// Returns true when the caller must supply this parameter.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.requirement == Requirement::Required
    }

    /// Returns the default value, if one was declared.
    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        match &self.requirement {
            Requirement::Default(value) => Some(value),
            _ => None,
        }
    }

    /// Returns true when `value` may be bound to this parameter.
    ///
    /// `null` is only accepted for optional parameters and parameters whose
    /// default is `null`.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return matches!(
                self.requirement,
                Requirement::Optional | Requirement::Default(Value::Null)
            );
        }
        self.ty.accepts(value)
    }

    fn property_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("title".into(), Value::from(field_title(&self.name)));
        schema.extend(self.ty.schema());
        if let Requirement::Default(default) = &self.requirement {
            if !default.is_null() {
                schema.insert("default".into(), default.clone());
            }
        }
        Value::Object(schema)
    }
}

/// Structured description of a callable function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionDescriptor {
    name: FunctionName,
    description: Option<String>,
    parameters: Vec<ParameterSpec>,
}

impl FunctionDescriptor {
    /// Starts building a descriptor for the named function.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> FunctionDescriptorBuilder {
        FunctionDescriptorBuilder {
            name: name.into(),
            description: None,
            parameters: Vec::new(),
        }
    }

    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &FunctionName {
        &self.name
    }

    /// Returns the documentation string, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the parameters in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|param| param.name == name)
    }

    /// Renders the parameters as an object schema.
    #[must_use]
    pub fn parameters_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|param| (param.name.clone(), param.property_schema()))
            .collect();
        let required: Vec<Value> = self
            .parameters
            .iter()
            .filter(|param| param.is_required())
            .map(|param| Value::from(param.name.clone()))
            .collect();

        let mut schema = json!({
            "title": format!("Input for `{}`", self.name),
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            schema["required"] = Value::Array(required);
        }
        schema
    }

    /// Renders the full `{name, description, parameters}` record.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name.as_str(),
            "description": self.description,
            "parameters": self.parameters_schema(),
        })
    }

    /// Matches keyword arguments against the declared parameters.
    ///
    /// Unknown keys, missing required parameters, and ill-typed values are
    /// rejected. Omitted defaulted parameters receive their default and omitted
    /// optional parameters receive `null`, so the returned map holds exactly
    /// one entry per parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnexpectedArgument`], [`ToolError::MissingArgument`],
    /// or [`ToolError::ArgumentType`].
    pub fn bind(&self, mut args: FunctionArgs) -> ToolResult<FunctionArgs> {
        if let Some(unexpected) = args.keys().find(|key| self.parameter(key).is_none()) {
            return Err(ToolError::UnexpectedArgument {
                function: self.name.to_string(),
                name: unexpected.clone(),
            });
        }

        for param in &self.parameters {
            match args.get(&param.name) {
                Some(value) if !param.accepts(value) => {
                    return Err(ToolError::ArgumentType {
                        function: self.name.to_string(),
                        name: param.name.clone(),
                        reason: format!("expected {}", param.ty),
                    });
                }
                Some(_) => {}
                None => {
                    let fallback = match &param.requirement {
                        Requirement::Required => {
                            return Err(ToolError::MissingArgument {
                                function: self.name.to_string(),
                                name: param.name.clone(),
                            });
                        }
                        Requirement::Default(value) => value.clone(),
                        Requirement::Optional => Value::Null,
                    };
                    args.insert(param.name.clone(), fallback);
                }
            }
        }

        Ok(args)
    }
}

impl Serialize for FunctionDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("FunctionDescriptor", 3)?;
        record.serialize_field("name", self.name.as_str())?;
        record.serialize_field("description", &self.description)?;
        record.serialize_field("parameters", &self.parameters_schema())?;
        record.end()
    }
}

/// Builder for [`FunctionDescriptor`].
#[derive(Debug)]
pub struct FunctionDescriptorBuilder {
    name: String,
    description: Option<String>,
    parameters: Vec<ParameterSpec>,
}

impl FunctionDescriptorBuilder {
    /// Sets the documentation string. Blank text clears it.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.trim().is_empty()).then_some(description);
        self
    }

    /// Appends a parameter.
    #[must_use]
    pub fn parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Appends several parameters in order.
    #[must_use]
    pub fn parameters<I>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = ParameterSpec>,
    {
        self.parameters.extend(parameters);
        self
    }

    /// Finalises the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidName`] for malformed function or parameter
    /// names, and [`ToolError::InvalidDescriptor`] for duplicate parameters or
    /// defaults that do not match the declared type.
    pub fn build(self) -> ToolResult<FunctionDescriptor> {
        let name = FunctionName::new(self.name)?;

        let mut seen = HashSet::new();
        for param in &self.parameters {
            validate_parameter_name(&param.name)?;
            if !seen.insert(param.name.as_str()) {
                return Err(ToolError::invalid_descriptor(format!(
                    "parameter `{}` of `{name}` is declared twice",
                    param.name
                )));
            }
            if let Requirement::Default(default) = &param.requirement {
                if !default.is_null() && !param.ty.accepts(default) {
                    return Err(ToolError::invalid_descriptor(format!(
                        "default for `{}` of `{name}` is not {}",
                        param.name, param.ty
                    )));
                }
            }
        }

        Ok(FunctionDescriptor {
            name,
            description: self.description,
            parameters: self.parameters,
        })
    }
}

/// Human-readable title for a parameter: underscores become spaces and each
/// word is capitalised with the rest lowercased (`max_items` → `Max Items`).
fn field_title(name: &str) -> String {
    let mut title = String::with_capacity(name.len());
    let mut previous_cased = false;
    for c in name.chars() {
        let c = if c == '_' { ' ' } else { c };
        if c.is_alphabetic() {
            if previous_cased {
                title.extend(c.to_lowercase());
            } else {
                title.extend(c.to_uppercase());
            }
            previous_cased = true;
        } else {
            title.push(c);
            previous_cased = false;
        }
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_function() -> FunctionDescriptor {
        FunctionDescriptor::builder("example_function")
            .parameter(ParameterSpec::required("param1", ParamType::Integer))
            .parameter(ParameterSpec::defaulted(
                "param2",
                ParamType::String,
                "default",
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn descriptor_matches_object_schema_layout() {
        let descriptor = example_function();

        assert_eq!(
            serde_json::to_value(&descriptor).unwrap(),
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
        assert_eq!(descriptor.to_json(), serde_json::to_value(&descriptor).unwrap());
    }

    #[test]
    fn one_entry_per_parameter_with_requirement() {
        let descriptor = FunctionDescriptor::builder("search")
            .description("Search the index.")
            .parameters([
                ParameterSpec::required("query", ParamType::String),
                ParameterSpec::defaulted("limit", ParamType::Integer, 10),
                ParameterSpec::optional("tags", ParamType::array(ParamType::String)),
                ParameterSpec::defaulted("exact", ParamType::Boolean, false),
            ])
            .build()
            .unwrap();

        assert_eq!(descriptor.parameters().len(), 4);
        assert_eq!(descriptor.description(), Some("Search the index."));

        let names: Vec<_> = descriptor.parameters().iter().map(ParameterSpec::name).collect();
        assert_eq!(names, ["query", "limit", "tags", "exact"]);

        assert!(descriptor.parameter("query").unwrap().is_required());
        assert_eq!(
            descriptor.parameter("limit").unwrap().default_value(),
            Some(&json!(10))
        );
        assert_eq!(
            descriptor.parameter("tags").unwrap().requirement(),
            &Requirement::Optional
        );
        assert_eq!(
            descriptor.parameter("exact").unwrap().default_value(),
            Some(&json!(false))
        );

        let schema = descriptor.parameters_schema();
        assert_eq!(schema["required"], json!(["query"]));
        assert_eq!(
            schema["properties"]["tags"],
            json!({ "title": "Tags", "type": "array", "items": { "type": "string" } })
        );
    }

    #[test]
    fn required_is_omitted_when_everything_has_defaults() {
        let descriptor = FunctionDescriptor::builder("ping")
            .parameter(ParameterSpec::defaulted("host", ParamType::String, "localhost"))
            .build()
            .unwrap();

        assert!(descriptor.parameters_schema().get("required").is_none());
    }

    #[test]
    fn any_type_has_no_type_keyword() {
        let descriptor = FunctionDescriptor::builder("store")
            .parameter(ParameterSpec::required("payload", ParamType::Any))
            .build()
            .unwrap();

        assert_eq!(
            descriptor.parameters_schema()["properties"]["payload"],
            json!({ "title": "Payload" })
        );
    }

    #[test]
    fn titles_follow_word_capitalisation() {
        assert_eq!(field_title("max_items"), "Max Items");
        assert_eq!(field_title("userID"), "Userid");
        assert_eq!(field_title("param1x"), "Param1X");
    }

    #[test]
    fn build_rejects_bad_descriptors() {
        let err = FunctionDescriptor::builder("bad name").build().unwrap_err();
        assert!(matches!(err, ToolError::InvalidName(_)));

        let err = FunctionDescriptor::builder("f")
            .parameter(ParameterSpec::required("9lives", ParamType::Integer))
            .build()
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidName(_)));

        let err = FunctionDescriptor::builder("f")
            .parameter(ParameterSpec::required("x", ParamType::Integer))
            .parameter(ParameterSpec::required("x", ParamType::String))
            .build()
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidDescriptor { .. }));

        let err = FunctionDescriptor::builder("f")
            .parameter(ParameterSpec::defaulted("x", ParamType::Integer, "ten"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidDescriptor { .. }));
    }

    #[test]
    fn bind_fills_defaults_and_validates() {
        let descriptor = FunctionDescriptor::builder("search")
            .parameters([
                ParameterSpec::required("query", ParamType::String),
                ParameterSpec::defaulted("limit", ParamType::Integer, 10),
                ParameterSpec::optional("tag", ParamType::String),
            ])
            .build()
            .unwrap();

        let bound = descriptor
            .bind(json!({ "query": "rust" }).as_object().cloned().unwrap())
            .unwrap();
        assert_eq!(
            Value::Object(bound),
            json!({ "query": "rust", "limit": 10, "tag": null })
        );

        let err = descriptor.bind(FunctionArgs::new()).unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument { name, .. } if name == "query"));

        let args = json!({ "query": "rust", "page": 2 }).as_object().cloned().unwrap();
        let err = descriptor.bind(args).unwrap_err();
        assert!(matches!(err, ToolError::UnexpectedArgument { name, .. } if name == "page"));

        let args = json!({ "query": "rust", "limit": 2.5 }).as_object().cloned().unwrap();
        let err = descriptor.bind(args).unwrap_err();
        assert!(matches!(err, ToolError::ArgumentType { name, .. } if name == "limit"));

        let args = json!({ "query": null }).as_object().cloned().unwrap();
        let err = descriptor.bind(args).unwrap_err();
        assert!(matches!(err, ToolError::ArgumentType { name, .. } if name == "query"));
    }

    #[test]
    fn nested_arrays_check_their_items() {
        let ty = ParamType::array(ParamType::array(ParamType::Integer));
        assert!(ty.accepts(&json!([[1, 2], [3]])));
        assert!(!ty.accepts(&json!([[1, "2"]])));
        assert_eq!(ty.to_string(), "array of array of integer");
    }
}
