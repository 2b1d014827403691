//! Strongly typed configuration schemas.

use anyhow::{Context, Result};
use fncall_primitives::FunctionName;
use fncall_tools::AllowList;
use serde::{Deserialize, Serialize};

/// Default `tracing` filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Top-level settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// `[dispatch]` section.
    pub dispatch: DispatchSettings,
    /// `[logging]` section.
    pub logging: LoggingSettings,
}

impl Settings {
    /// Checks values serde cannot check on its own.
    ///
    /// # Errors
    ///
    /// Fails when an allow-list entry is not a valid function name.
    pub fn validate(&self) -> Result<()> {
        for name in &self.dispatch.allow {
            FunctionName::new(name.as_str())
                .with_context(|| format!("invalid entry in dispatch.allow: `{name}`"))?;
        }
        Ok(())
    }
}

/// Which functions the model may call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchSettings {
    /// Names of functions the dispatcher will execute. Empty rejects every call.
    pub allow: Vec<String>,
}

impl DispatchSettings {
    /// Builds the dispatcher allow-list.
    ///
    /// # Errors
    ///
    /// Fails when an entry is not a valid function name.
    pub fn allow_list(&self) -> Result<AllowList> {
        AllowList::new(self.allow.iter().cloned()).context("invalid dispatch allow-list")
    }
}

/// Log output settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_allow_nothing() {
        let settings = Settings::default();
        assert!(settings.dispatch.allow_list().unwrap().is_empty());
        assert_eq!(settings.logging.filter, DEFAULT_LOG_FILTER);
        settings.validate().unwrap();
    }

    #[test]
    fn allow_list_matches_entries() {
        let dispatch = DispatchSettings {
            allow: vec!["get_weather".into(), "search-docs".into()],
        };
        let allow = dispatch.allow_list().unwrap();
        assert!(allow.permits("get_weather"));
        assert!(allow.permits("search-docs"));
        assert!(!allow.permits("delete_everything"));
    }

    #[test]
    fn invalid_names_are_reported() {
        let settings = Settings {
            dispatch: DispatchSettings {
                allow: vec!["ok".into(), "not ok".into()],
            },
            ..Settings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("not ok"));
        assert!(settings.dispatch.allow_list().is_err());
    }
}
