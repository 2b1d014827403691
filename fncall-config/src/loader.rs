//! Configuration loader implementations.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::schema::Settings;

/// Parses and validates settings from TOML text.
///
/// # Errors
///
/// Fails on malformed TOML, unknown keys, or invalid values.
pub fn from_toml_str(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).context("failed to parse settings (TOML)")?;
    settings.validate()?;
    Ok(settings)
}

/// Loads settings from `path`, or returns defaults when it does not exist.
///
/// # Errors
///
/// Fails when the file exists but cannot be read or parsed.
pub fn load(path: &Path) -> Result<Settings> {
    if !path.exists() {
        debug!(path = %path.display(), "settings file not found, using defaults");
        return Ok(Settings::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings = from_toml_str(&contents)
        .with_context(|| format!("invalid settings file {}", path.display()))?;
    debug!(
        path = %path.display(),
        allowed = settings.dispatch.allow.len(),
        "loaded settings"
    );
    Ok(settings)
}

/// Writes settings to `path` as TOML, creating parent directories.
///
/// # Errors
///
/// Fails when the settings cannot be serialized or the file cannot be written.
pub fn save(settings: &Settings, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(settings).context("failed to serialize settings")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write settings file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DispatchSettings, LoggingSettings};

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn sections_are_optional() {
        let settings = from_toml_str("[dispatch]\nallow = [\"lookup\"]\n").unwrap();
        assert_eq!(settings.dispatch.allow, ["lookup"]);
        assert_eq!(settings.logging, LoggingSettings::default());

        assert_eq!(from_toml_str("").unwrap(), Settings::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = from_toml_str("[dispatch]\nalow = []\n").unwrap_err();
        assert!(format!("{err:#}").contains("alow"));
    }

    #[test]
    fn invalid_allow_entries_are_rejected() {
        let err = from_toml_str("[dispatch]\nallow = [\"rm -rf\"]\n").unwrap_err();
        assert!(format!("{err:#}").contains("rm -rf"));
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("fncall.toml");
        let settings = Settings {
            dispatch: DispatchSettings {
                allow: vec!["get_weather".into()],
            },
            logging: LoggingSettings {
                filter: "fncall_tools=debug".into(),
            },
        };

        save(&settings, &path).unwrap();
        assert_eq!(load(&path).unwrap(), settings);
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[dispatch\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }
}
