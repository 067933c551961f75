//! User-editable settings and the port that persists them.
//!
//! The settings dialog itself lives in the overlay; it only hands a complete
//! [`Settings`] value to the presentation context.  Validation happens here
//! so that every surface (dialog, console, command line) enforces the same
//! rules.

use thiserror::Error;

/// Error type for settings updates.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// A field has an unacceptable value.
    #[error("{0}")]
    Invalid(String),
    /// The settings could not be written to storage.
    #[error("failed to save settings: {0}")]
    Persist(String),
}

/// The settings the configuration surface may change at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Serial port name, e.g. `COM7` or `/dev/ttyACM0`.
    pub port: String,
    /// Serial baud rate.
    pub baud_rate: u32,
    /// Seconds without activity before the overlay goes to sleep.
    pub inactivity_timeout_secs: u64,
}

impl Settings {
    /// Checks every field.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] describing the first bad field.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.port.trim().is_empty() {
            return Err(SettingsError::Invalid("serial port must not be empty".into()));
        }
        if self.baud_rate == 0 {
            return Err(SettingsError::Invalid("baud rate must be positive".into()));
        }
        if self.inactivity_timeout_secs < 1 {
            return Err(SettingsError::Invalid("timeout must be at least 1 second".into()));
        }
        Ok(())
    }

    /// `true` if applying `other` needs a new serial connection.
    pub fn serial_differs(&self, other: &Settings) -> bool {
        self.port != other.port || self.baud_rate != other.baud_rate
    }
}

/// Persists settings saved from the configuration surface.
///
/// Implemented by the TOML config store in the infrastructure layer.
pub trait SettingsStore: Send {
    /// Writes `settings` to durable storage.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Persist`] when storage fails.
    fn save(&mut self, settings: &Settings) -> Result<(), SettingsError>;
}
