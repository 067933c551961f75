//! Headless overlay that renders through `tracing`.

use std::sync::Mutex;

use tracing::{info, warn};

use crate::application::dispatch_input::DisplaySink;

/// What the overlay would currently show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlaySnapshot {
    pub selected: Option<char>,
    pub mode: String,
    pub last_sent: String,
    pub status: String,
    pub awake: bool,
    pub prompt: Option<String>,
}

/// A [`DisplaySink`] that logs each change and keeps the current state.
#[derive(Debug)]
pub struct LogDisplay {
    state: Mutex<OverlaySnapshot>,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(OverlaySnapshot { awake: true, ..OverlaySnapshot::default() }),
        }
    }

    /// A copy of the current overlay contents.
    pub fn snapshot(&self) -> OverlaySnapshot {
        self.with_state(|s| s.clone())
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut OverlaySnapshot) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

impl Default for LogDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for LogDisplay {
    fn set_selected(&self, ch: char, mode: &str) {
        self.with_state(|s| {
            s.selected = Some(ch);
            s.mode = mode.to_string();
        });
        info!(target: "overlay", "selected {ch:?} ({mode})");
    }

    fn set_mode(&self, mode: &str) {
        self.with_state(|s| s.mode = mode.to_string());
        info!(target: "overlay", "mode {mode}");
    }

    fn set_last_sent(&self, text: &str) {
        self.with_state(|s| s.last_sent = text.to_string());
        info!(target: "overlay", "sent {text:?}");
    }

    fn set_status(&self, text: &str) {
        self.with_state(|s| s.status = text.to_string());
        info!(target: "overlay", "status: {text}");
    }

    fn set_awake(&self, awake: bool) {
        self.with_state(|s| s.awake = awake);
        info!(target: "overlay", "{}", if awake { "shown" } else { "hidden" });
    }

    fn show_connection_prompt(&self, message: &str) {
        self.with_state(|s| s.prompt = Some(message.to_string()));
        warn!(target: "overlay", "{message} (type `restart` to reconnect)");
    }

    fn dismiss_connection_prompt(&self) {
        self.with_state(|s| s.prompt = None);
        info!(target: "overlay", "connection prompt dismissed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_awake_and_empty() {
        let display = LogDisplay::new();

        let snap = display.snapshot();

        assert!(snap.awake);
        assert_eq!(snap.selected, None);
        assert_eq!(snap.prompt, None);
    }

    #[test]
    fn test_tracks_latest_values() {
        // Arrange
        let display = LogDisplay::new();

        // Act
        display.set_selected('Q', "Letters");
        display.set_mode("Numbers");
        display.set_last_sent("BACKSPACE");
        display.set_status("Ready");
        display.set_awake(false);

        // Assert
        let snap = display.snapshot();
        assert_eq!(snap.selected, Some('Q'));
        assert_eq!(snap.mode, "Numbers");
        assert_eq!(snap.last_sent, "BACKSPACE");
        assert_eq!(snap.status, "Ready");
        assert!(!snap.awake);
    }

    #[test]
    fn test_prompt_show_and_dismiss() {
        let display = LogDisplay::new();

        display.show_connection_prompt("Disconnected");
        assert_eq!(display.snapshot().prompt.as_deref(), Some("Disconnected"));

        display.dismiss_connection_prompt();
        assert_eq!(display.snapshot().prompt, None);
    }
}
