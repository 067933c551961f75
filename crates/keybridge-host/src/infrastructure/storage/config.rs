//! TOML-based configuration persistence for the bridge.
//!
//! Reads and writes [`BridgeConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\KeyBridge\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/keybridge/config.toml` or `~/.config/keybridge/config.toml`
//! - macOS:    `~/Library/Application Support/KeyBridge/config.toml`
//!
//! An explicit path (`--config`) bypasses the platform lookup.
//!
//! ```toml
//! [bridge]
//! log_level = "info"
//!
//! [serial]
//! port = "COM7"
//! baud_rate = 9600
//! poll_interval_ms = 10
//!
//! [overlay]
//! inactivity_timeout_secs = 5
//! tick_interval_ms = 100
//! ```
//!
//! Every field has a serde default, so a missing file, a missing section, or
//! a missing key all fall back to the values above.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::settings::{Settings, SettingsError, SettingsStore};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeConfig {
    #[serde(default)]
    pub bridge: BridgeSection,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeSection {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Serial link to the selector device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SerialConfig {
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Sleep between reads when no data is waiting.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Overlay behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverlayConfig {
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,
    /// Period of the presentation tick (sleep checks, prompts).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_port() -> String {
    "COM7".to_string()
}
fn default_baud_rate() -> u32 {
    9600
}
fn default_poll_interval_ms() -> u64 {
    10
}
fn default_inactivity_timeout_secs() -> u64 {
    5
}
fn default_tick_interval_ms() -> u64 {
    100
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self { log_level: default_log_level() }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl BridgeConfig {
    /// Checks every value the bridge depends on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if !(1..=1000).contains(&self.serial.poll_interval_ms) {
            return Err(ConfigError::Invalid(format!(
                "poll interval must be between 1 and 1000 ms, got {}",
                self.serial.poll_interval_ms
            )));
        }
        if self.overlay.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick interval must be positive".into()));
        }
        Ok(())
    }

    /// The user-editable subset.
    pub fn settings(&self) -> Settings {
        Settings {
            port: self.serial.port.clone(),
            baud_rate: self.serial.baud_rate,
            inactivity_timeout_secs: self.overlay.inactivity_timeout_secs,
        }
    }

    /// Copies the user-editable subset into this config.
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.serial.port = settings.port.clone();
        self.serial.baud_rate = settings.baud_rate;
        self.overlay.inactivity_timeout_secs = settings.inactivity_timeout_secs;
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.serial.poll_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.overlay.tick_interval_ms)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the config from `path`, returning `BridgeConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<BridgeConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BridgeConfig::default()),
        Err(e) => Err(ConfigError::Io { path: path.to_path_buf(), source: e }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &BridgeConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("KeyBridge"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("keybridge"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library").join("Application Support").join("KeyBridge"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Settings store ────────────────────────────────────────────────────────────

/// Saves settings from the configuration surface into a TOML file.
///
/// Keeps the full config in memory so that saving the user-editable subset
/// does not drop the other sections.
#[derive(Debug)]
pub struct TomlSettingsStore {
    path: PathBuf,
    config: BridgeConfig,
}

impl TomlSettingsStore {
    pub fn new(path: PathBuf, config: BridgeConfig) -> Self {
        Self { path, config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }
}

impl SettingsStore for TomlSettingsStore {
    fn save(&mut self, settings: &Settings) -> Result<(), SettingsError> {
        let mut updated = self.config.clone();
        updated.apply_settings(settings);
        save_config_to(&self.path, &updated).map_err(|e| SettingsError::Persist(e.to_string()))?;
        self.config = updated;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
