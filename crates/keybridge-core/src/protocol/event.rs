//! Typed events decoded from the selector device's serial output.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A decoded, typed unit of device input.
///
/// Every raw line yields exactly one `Event`.  [`Event::ConnectionError`] is
/// the only variant not derived from a line: the serial reader synthesizes it
/// when the device connection fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A candidate key is highlighted on the device.
    Selection { char: char, mode: String },
    /// A character was committed.  An empty commit is normalized to a single
    /// blank (`" "`) by the decoder.
    Confirmed { char: String },
    /// The device's ESC action fired.
    Escape,
    /// The device's backspace action fired.
    Backspace,
    /// The device inserted a space.
    SpaceInserted,
    /// The device's enter action fired.
    Enter,
    /// The active input mode was switched.
    ModeChanged { mode: String },
    /// The line matched no known pattern.  Kept verbatim for diagnostics and
    /// never acted upon.
    Unknown { raw: String },
    /// Device-level failure reported by the serial reader.
    ConnectionError { message: String },
}

impl Event {
    /// Short, stable name of the variant, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Selection { .. } => "selection",
            Event::Confirmed { .. } => "confirmed",
            Event::Escape => "escape",
            Event::Backspace => "backspace",
            Event::SpaceInserted => "space_inserted",
            Event::Enter => "enter",
            Event::ModeChanged { .. } => "mode_changed",
            Event::Unknown { .. } => "unknown",
            Event::ConnectionError { .. } => "connection_error",
        }
    }
}

/// Non-printable keys the injection layer must be able to press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Escape,
    Backspace,
    Enter,
}

impl NamedKey {
    /// The canonical lowercase key name (`"esc"`, `"backspace"`, `"enter"`).
    pub fn name(self) -> &'static str {
        match self {
            NamedKey::Escape => "esc",
            NamedKey::Backspace => "backspace",
            NamedKey::Enter => "enter",
        }
    }
}

impl fmt::Display for NamedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when parsing a key name that is not one of the [`NamedKey`]s.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key name: {0:?}")]
pub struct UnknownKeyName(pub String);

impl FromStr for NamedKey {
    type Err = UnknownKeyName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "esc" | "escape" => Ok(NamedKey::Escape),
            "backspace" => Ok(NamedKey::Backspace),
            "enter" | "return" => Ok(NamedKey::Enter),
            _ => Err(UnknownKeyName(s.to_string())),
        }
    }
}
