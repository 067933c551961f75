//! Windows keystroke injection via the SendInput API.
//!
//! Text is injected as `KEYEVENTF_UNICODE` events, one down/up pair per
//! UTF-16 code unit, so the active keyboard layout does not matter.  Named
//! keys use their virtual-key codes.

#![cfg(target_os = "windows")]

use keybridge_core::NamedKey;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
    KEYEVENTF_UNICODE, VIRTUAL_KEY, VK_BACK, VK_ESCAPE, VK_RETURN,
};

use crate::application::dispatch_input::{InjectionError, KeystrokeInjector};

/// Windows implementation of [`KeystrokeInjector`] using SendInput.
pub struct WindowsKeystrokeInjector;

impl WindowsKeystrokeInjector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsKeystrokeInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl KeystrokeInjector for WindowsKeystrokeInjector {
    fn type_text(&self, text: &str) -> Result<(), InjectionError> {
        let inputs: Vec<INPUT> = text
            .encode_utf16()
            .flat_map(|unit| {
                [
                    keyboard_input(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE),
                    keyboard_input(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE | KEYEVENTF_KEYUP),
                ]
            })
            .collect();
        send(&inputs)
    }

    fn press_key(&self, key: NamedKey) -> Result<(), InjectionError> {
        let vk = virtual_key(key);
        send(&[
            keyboard_input(vk, 0, KEYBD_EVENT_FLAGS(0)),
            keyboard_input(vk, 0, KEYEVENTF_KEYUP),
        ])
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn virtual_key(key: NamedKey) -> VIRTUAL_KEY {
    match key {
        NamedKey::Escape => VK_ESCAPE,
        NamedKey::Backspace => VK_BACK,
        NamedKey::Enter => VK_RETURN,
    }
}

fn keyboard_input(vk: VIRTUAL_KEY, scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

/// Sends `inputs` and checks that the OS accepted every one of them.
fn send(inputs: &[INPUT]) -> Result<(), InjectionError> {
    if inputs.is_empty() {
        return Ok(());
    }
    // SAFETY: every element is a fully initialized KEYBDINPUT
    let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
    if sent as usize != inputs.len() {
        return Err(InjectionError::Platform(format!(
            "SendInput accepted {sent} of {} events: {}",
            inputs.len(),
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}
