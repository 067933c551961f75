//! macOS keystroke injection with Core Graphics keyboard events.
//!
//! Text is injected by attaching the characters to a synthesized key event
//! (`CGEventKeyboardSetUnicodeString`), which bypasses the keyboard layout.
//! Named keys use their ANSI virtual keycodes.
//!
//! # Accessibility permission
//!
//! Posting at `kCGHIDEventTap` requires the Accessibility permission
//! (System Settings → Privacy & Security → Accessibility).  Without it the
//! events are silently dropped.

#![cfg(target_os = "macos")]

use core_graphics::event::{CGEvent, CGEventTapLocation, CGKeyCode};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use keybridge_core::NamedKey;

use crate::application::dispatch_input::{InjectionError, KeystrokeInjector};

const KEYCODE_ESCAPE: CGKeyCode = 0x35;
const KEYCODE_DELETE: CGKeyCode = 0x33;
const KEYCODE_RETURN: CGKeyCode = 0x24;

/// macOS implementation of [`KeystrokeInjector`].
pub struct MacosKeystrokeInjector;

impl MacosKeystrokeInjector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MacosKeystrokeInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl KeystrokeInjector for MacosKeystrokeInjector {
    fn type_text(&self, text: &str) -> Result<(), InjectionError> {
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            let s: &str = ch.encode_utf8(&mut buf);
            post(0, true, Some(s))?;
            post(0, false, Some(s))?;
        }
        Ok(())
    }

    fn press_key(&self, key: NamedKey) -> Result<(), InjectionError> {
        let keycode = keycode(key);
        post(keycode, true, None)?;
        post(keycode, false, None)
    }
}

fn keycode(key: NamedKey) -> CGKeyCode {
    match key {
        NamedKey::Escape => KEYCODE_ESCAPE,
        NamedKey::Backspace => KEYCODE_DELETE,
        NamedKey::Enter => KEYCODE_RETURN,
    }
}

fn post(keycode: CGKeyCode, key_down: bool, text: Option<&str>) -> Result<(), InjectionError> {
    let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
        .map_err(|_| InjectionError::Platform("failed to create CGEventSource".into()))?;
    let event = CGEvent::new_keyboard_event(source, keycode, key_down)
        .map_err(|_| InjectionError::Platform("failed to create keyboard event".into()))?;
    if let Some(text) = text {
        event.set_string(text);
    }
    event.post(CGEventTapLocation::HID);
    Ok(())
}
