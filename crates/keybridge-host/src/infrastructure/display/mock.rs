//! Recording display for tests.
//!
//! Each call is pushed into a `Mutex<Vec<DisplayCall>>` so assertions can
//! check exactly what the overlay was told, and in what order.

use std::sync::{Mutex, MutexGuard};

use crate::application::dispatch_input::DisplaySink;

/// One recorded [`DisplaySink`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCall {
    Selected(char, String),
    Mode(String),
    LastSent(String),
    Status(String),
    Awake(bool),
    Prompt(String),
    PromptDismissed,
}

/// A [`DisplaySink`] that records every call.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub calls: Mutex<Vec<DisplayCall>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all calls so far.
    pub fn recorded(&self) -> Vec<DisplayCall> {
        self.lock().clone()
    }

    /// Removes and returns all calls so far.
    pub fn take(&self) -> Vec<DisplayCall> {
        std::mem::take(&mut *self.lock())
    }

    /// Every status text, oldest first.
    pub fn statuses(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|c| match c {
                DisplayCall::Status(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: DisplayCall) {
        self.lock().push(call);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DisplayCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DisplaySink for RecordingDisplay {
    fn set_selected(&self, ch: char, mode: &str) {
        self.push(DisplayCall::Selected(ch, mode.to_string()));
    }
    fn set_mode(&self, mode: &str) {
        self.push(DisplayCall::Mode(mode.to_string()));
    }
    fn set_last_sent(&self, text: &str) {
        self.push(DisplayCall::LastSent(text.to_string()));
    }
    fn set_status(&self, text: &str) {
        self.push(DisplayCall::Status(text.to_string()));
    }
    fn set_awake(&self, awake: bool) {
        self.push(DisplayCall::Awake(awake));
    }
    fn show_connection_prompt(&self, message: &str) {
        self.push(DisplayCall::Prompt(message.to_string()));
    }
    fn dismiss_connection_prompt(&self) {
        self.push(DisplayCall::PromptDismissed);
    }
}
