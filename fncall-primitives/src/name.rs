//! Identifier types for callable functions and their parameters.

use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Longest name accepted for functions and parameters.
pub const MAX_NAME_LEN: usize = 64;

/// Name under which a function is described to, and called by, an agent.
///
/// Names are 1 to [`MAX_NAME_LEN`] characters of ASCII alphanumerics,
/// underscore, or dash, which is the set accepted by function-calling APIs.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FunctionName(String);

impl FunctionName {
    /// Creates a function name after validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFunctionName`] if the supplied name is empty,
    /// too long, or contains unsupported characters.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_function_name(&name)?;
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FunctionName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FunctionName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FunctionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for FunctionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for FunctionName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<FunctionName> for String {
    fn from(value: FunctionName) -> Self {
        value.0
    }
}

fn validate_function_name(name: &str) -> Result<()> {
    let reject = |reason: String| Error::InvalidFunctionName {
        name: name.to_owned(),
        reason,
    };

    if name.is_empty() {
        return Err(reject("name cannot be empty".into()));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(reject(format!("name length must be <= {MAX_NAME_LEN}")));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
    {
        return Err(reject(
            "name must contain ASCII alphanumerics, underscore, or dash".into(),
        ));
    }

    Ok(())
}

/// Validates a parameter name.
///
/// Parameter names are identifiers: a letter or underscore followed by ASCII
/// alphanumerics or underscores, at most [`MAX_NAME_LEN`] characters.
///
/// # Errors
///
/// Returns [`Error::InvalidParameterName`] when the name is not an identifier.
pub fn validate_parameter_name(name: &str) -> Result<()> {
    let reject = |reason: String| Error::InvalidParameterName {
        name: name.to_owned(),
        reason,
    };

    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(reject("name cannot be empty".into()));
    };

    if name.len() > MAX_NAME_LEN {
        return Err(reject(format!("name length must be <= {MAX_NAME_LEN}")));
    }

    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(reject("name must start with a letter or underscore".into()));
    }

    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(reject(
            "name must contain ASCII alphanumerics or underscore".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_function_calling_names() {
        for name in ["get_weather", "search-docs", "f", "Run2"] {
            assert_eq!(FunctionName::new(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn rejects_invalid_function_names() {
        for name in ["", "has space", "dotted.name", &"x".repeat(MAX_NAME_LEN + 1)] {
            let err = FunctionName::new(name).expect_err("name should be rejected");
            assert!(matches!(err, Error::InvalidFunctionName { .. }), "{name}");
        }
    }

    #[test]
    fn parameter_names_are_identifiers() {
        assert!(validate_parameter_name("city").is_ok());
        assert!(validate_parameter_name("_private2").is_ok());

        for name in ["", "2fast", "with-dash", "a b"] {
            let err = validate_parameter_name(name).expect_err("name should be rejected");
            assert!(matches!(err, Error::InvalidParameterName { .. }), "{name}");
        }
    }

    #[test]
    fn deserialization_validates() {
        let name: FunctionName = serde_json::from_str("\"lookup\"").unwrap();
        assert_eq!(name.to_string(), "lookup");

        assert!(serde_json::from_str::<FunctionName>("\"no good\"").is_err());
    }
}
