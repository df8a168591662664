//! Configuration loading for handoff.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::{Error, Result};

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV: &str = "HANDOFF_CONFIG";

/// Get the handoff config directory (platform config dir).
pub fn get_config_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "handoff", "handoff")
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    Ok(dirs.config_dir().to_path_buf())
}

/// Get the settings file path, honouring `$HANDOFF_CONFIG`.
pub fn get_settings_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(get_config_dir()?.join("settings.json"))
}

/// Load settings from the default location.
pub fn load_settings() -> Result<Settings> {
    load_settings_from(&get_settings_path()?)
}

/// Load and validate settings from `path`.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Settings file not found at {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let settings: Settings = serde_json::from_str(&content)?;
    validate_settings(&settings)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Resolve startup settings before logging is up.
///
/// An explicit path must load. Otherwise the default location is tried and
/// defaults are used on failure; the failure is handed back so the caller can
/// report it once a subscriber is installed.
pub fn resolve_settings(explicit: Option<&Path>) -> Result<(Settings, Option<Error>)> {
    match explicit {
        Some(path) => Ok((load_settings_from(path)?, None)),
        None => Ok(settings_or_default(load_settings())),
    }
}

fn settings_or_default(loaded: Result<Settings>) -> (Settings, Option<Error>) {
    match loaded {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    }
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.handoff.timeout_ms == Some(0) {
        return Err(Error::Config(
            "handoff.timeout_ms must be greater than zero".to_string(),
        ));
    }
    if let Some(filter) = settings.logging.filter.as_deref() {
        if filter.trim().is_empty() {
            return Err(Error::Config("logging.filter must not be empty".to_string()));
        }
    }
    Ok(())
}

/// Handoff session configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct HandoffSettings {
    /// Deadline applied to tokens built from settings. `None` means no
    /// deadline.
    pub timeout_ms: Option<u64>,
}

/// Logging configuration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: Option<String>,
    /// Directory for the rolling log file. Console only when unset.
    pub dir: Option<PathBuf>,
    #[serde(default = "default_log_file_name")]
    pub file_name: String,
}

fn default_log_file_name() -> String {
    "handoff.log".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: None,
            dir: None,
            file_name: default_log_file_name(),
        }
    }
}

/// handoff settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub handoff: HandoffSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn timeout(&self) -> Option<Duration> {
        self.handoff.timeout_ms.map(Duration::from_millis)
    }

    /// Build a cancellation token honouring the configured deadline.
    ///
    /// Must be called from within a tokio runtime when a timeout is set.
    pub fn token(&self) -> CancelToken {
        match self.timeout() {
            Some(timeout) => CancelToken::with_timeout(timeout),
            None => CancelToken::new(),
        }
    }
}
