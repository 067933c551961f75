//! InputDispatcher: turns decoded events into keystrokes and display updates.
//!
//! This use case sits at the application layer and delegates to two ports:
//! a [`KeystrokeInjector`] for OS-level key injection and a [`DisplaySink`]
//! for the overlay.  Both are implemented in the infrastructure layer.
//!
//! | Event           | Injection           | Display                      |
//! |-----------------|---------------------|------------------------------|
//! | `Selection`     | –                   | selected char + mode         |
//! | `Confirmed`     | type the text       | last sent = text             |
//! | `Escape`        | press `esc`         | last sent = `ESC`            |
//! | `Backspace`     | press `backspace`   | last sent = `BACKSPACE`      |
//! | `SpaceInserted` | type `" "`          | last sent = `SPACE`          |
//! | `Enter`         | press `enter`       | last sent = `ENTER`          |
//! | `ModeChanged`   | –                   | mode + status `Mode: <mode>` |
//! | `ConnectionError` | –                 | status = message             |
//! | `Unknown`       | –                   | –                            |
//!
//! Injection failures never stop the pipeline: [`InputDispatcher::dispatch`]
//! reports them on the status line and returns, so the next event is
//! dispatched as usual.

use std::sync::Arc;

use keybridge_core::{Event, NamedKey};
use thiserror::Error;
use tracing::{debug, warn};

/// Error type for keystroke injection.
#[derive(Debug, Error)]
pub enum InjectionError {
    #[error("platform error: {0}")]
    Platform(String),
    #[error("character {0:?} cannot be typed on this host")]
    UnsupportedCharacter(char),
    #[error("injector not initialized")]
    NotInitialized,
}

/// Platform-agnostic keystroke injection.
///
/// Each supported OS provides an implementation in the infrastructure layer.
#[cfg_attr(test, mockall::automock)]
pub trait KeystrokeInjector: Send + Sync {
    /// Types `text` literally, character by character.
    fn type_text(&self, text: &str) -> Result<(), InjectionError>;

    /// Presses and releases a non-printable key.
    fn press_key(&self, key: NamedKey) -> Result<(), InjectionError>;
}

/// The overlay's display state, as seen from the core.
///
/// Implementations must be cheap and must not fail; they only record what
/// should be shown.
pub trait DisplaySink: Send + Sync {
    /// Shows the highlighted candidate key and the active mode.
    fn set_selected(&self, ch: char, mode: &str);
    /// Shows the active mode.
    fn set_mode(&self, mode: &str);
    /// Shows what was last sent to the host.
    fn set_last_sent(&self, text: &str);
    /// Replaces the status line.
    fn set_status(&self, text: &str);
    /// Shows (`true`) or hides (`false`) the overlay.
    fn set_awake(&self, awake: bool);
    /// Shows the modal "connection problem, click Restart" prompt.
    fn show_connection_prompt(&self, message: &str);
    /// Hides the connection prompt if it is visible.
    fn dismiss_connection_prompt(&self);
}

/// The Input Dispatcher use case.
pub struct InputDispatcher {
    injector: Arc<dyn KeystrokeInjector>,
    display: Arc<dyn DisplaySink>,
}

impl InputDispatcher {
    pub fn new(injector: Arc<dyn KeystrokeInjector>, display: Arc<dyn DisplaySink>) -> Self {
        Self { injector, display }
    }

    /// Dispatches one event.
    ///
    /// Injection failures are logged and shown as `Input error: <cause>` on
    /// the status line; they are not returned.
    pub fn dispatch(&self, event: &Event) {
        if let Err(e) = self.try_dispatch(event) {
            warn!("failed to inject {} event: {e}", event.kind());
            self.display.set_status(&format!("Input error: {e}"));
        }
    }

    /// Dispatches one event, returning the injection failure if any.
    ///
    /// When injection fails the display is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`InjectionError`] if the OS keystroke injection fails.
    pub fn try_dispatch(&self, event: &Event) -> Result<(), InjectionError> {
        match event {
            Event::Selection { char, mode } => self.display.set_selected(*char, mode),
            Event::Confirmed { char } => {
                self.injector.type_text(char)?;
                self.display.set_last_sent(char);
            }
            Event::Escape => self.press(NamedKey::Escape, "ESC")?,
            Event::Backspace => self.press(NamedKey::Backspace, "BACKSPACE")?,
            Event::SpaceInserted => {
                self.injector.type_text(" ")?;
                self.display.set_last_sent("SPACE");
            }
            Event::Enter => self.press(NamedKey::Enter, "ENTER")?,
            Event::ModeChanged { mode } => {
                self.display.set_mode(mode);
                self.display.set_status(&format!("Mode: {mode}"));
            }
            Event::ConnectionError { message } => self.display.set_status(message),
            Event::Unknown { raw } => debug!("ignoring unrecognized line {raw:?}"),
        }
        Ok(())
    }

    fn press(&self, key: NamedKey, label: &str) -> Result<(), InjectionError> {
        self.injector.press_key(key)?;
        self.display.set_last_sent(label);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
