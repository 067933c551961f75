//! Linux X11 keystroke injection via the XTest extension.
//!
//! `XTestFakeKeyEvent` takes an X11 *keycode*, not a KeySym, so every
//! character goes through:
//!
//! ```text
//! char → KeySym → XKeysymToKeycode(display, keysym) → keycode
//! ```
//!
//! Characters whose KeySym is only reachable at shift level 1 of their
//! keycode are typed with `Shift_L` held.  Characters the current keyboard
//! mapping cannot produce are rejected with
//! [`InjectionError::UnsupportedCharacter`].
//!
//! # Permissions
//!
//! XTest requires access to the X display named by `DISPLAY`.  If it is not
//! set or the server is unreachable, [`LinuxXTestInjector::new`] fails with a
//! `Platform` error.

use std::ptr;
use std::sync::Mutex;

use keybridge_core::NamedKey;
use x11::{keysym, xlib, xtest};

use crate::application::dispatch_input::{InjectionError, KeystrokeInjector};

/// `CurrentTime`: let the server timestamp the synthesized event.
const CURRENT_TIME: std::os::raw::c_ulong = 0;

/// KeySyms for Unicode characters outside Latin-1 live at `0x0100_0000 + code point`.
const UNICODE_KEYSYM_OFFSET: xlib::KeySym = 0x0100_0000;

struct DisplayHandle(*mut xlib::Display);

// SAFETY: the pointer is only dereferenced by Xlib while the owning Mutex is
// held, so no two threads use the connection at once.
unsafe impl Send for DisplayHandle {}

/// Linux X11/XTest keystroke injector.
pub struct LinuxXTestInjector {
    display: Mutex<DisplayHandle>,
}

impl LinuxXTestInjector {
    /// Connects to the X display named by `DISPLAY`.
    ///
    /// # Errors
    ///
    /// Returns `InjectionError::Platform` if the X display cannot be opened.
    pub fn new() -> Result<Self, InjectionError> {
        // SAFETY: a null name selects the DISPLAY environment variable
        let display = unsafe { xlib::XOpenDisplay(ptr::null()) };
        if display.is_null() {
            return Err(InjectionError::Platform(
                "cannot open X display (is DISPLAY set?)".into(),
            ));
        }
        Ok(Self { display: Mutex::new(DisplayHandle(display)) })
    }

    fn with_display<R>(&self, f: impl FnOnce(*mut xlib::Display) -> R) -> Result<R, InjectionError> {
        let handle = self
            .display
            .lock()
            .map_err(|_| InjectionError::Platform("X display lock poisoned".into()))?;
        Ok(f(handle.0))
    }
}

impl KeystrokeInjector for LinuxXTestInjector {
    fn type_text(&self, text: &str) -> Result<(), InjectionError> {
        self.with_display(|display| {
            for ch in text.chars() {
                type_char(display, ch)?;
            }
            // SAFETY: display is a live connection guarded by the mutex
            unsafe { xlib::XFlush(display) };
            Ok(())
        })?
    }

    fn press_key(&self, key: NamedKey) -> Result<(), InjectionError> {
        self.with_display(|display| {
            // SAFETY: display is a live connection guarded by the mutex
            let keycode = unsafe { xlib::XKeysymToKeycode(display, named_keysym(key)) };
            if keycode == 0 {
                return Err(InjectionError::Platform(format!("no keycode for {key}")));
            }
            tap(display, keycode);
            // SAFETY: as above
            unsafe { xlib::XFlush(display) };
            Ok(())
        })?
    }
}

impl Drop for LinuxXTestInjector {
    fn drop(&mut self) {
        if let Ok(handle) = self.display.get_mut() {
            // SAFETY: the connection was opened in `new` and is closed exactly once
            unsafe { xlib::XCloseDisplay(handle.0) };
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn named_keysym(key: NamedKey) -> xlib::KeySym {
    let sym = match key {
        NamedKey::Escape => keysym::XK_Escape,
        NamedKey::Backspace => keysym::XK_BackSpace,
        NamedKey::Enter => keysym::XK_Return,
    };
    xlib::KeySym::from(sym)
}

/// The KeySym X11 assigns to a printable character.
fn char_keysym(ch: char) -> xlib::KeySym {
    let code = xlib::KeySym::from(u32::from(ch));
    match ch {
        ' '..='~' | '\u{a0}'..='\u{ff}' => code,
        _ => UNICODE_KEYSYM_OFFSET + code,
    }
}

fn type_char(display: *mut xlib::Display, ch: char) -> Result<(), InjectionError> {
    let sym = char_keysym(ch);
    // SAFETY: display is a live connection guarded by the caller's mutex
    let keycode = unsafe { xlib::XKeysymToKeycode(display, sym) };
    if keycode == 0 {
        return Err(InjectionError::UnsupportedCharacter(ch));
    }

    // SAFETY: as above
    let needs_shift = unsafe {
        xlib::XKeycodeToKeysym(display, keycode, 0) != sym
            && xlib::XKeycodeToKeysym(display, keycode, 1) == sym
    };

    if needs_shift {
        // SAFETY: as above
        let shift = unsafe { xlib::XKeysymToKeycode(display, xlib::KeySym::from(keysym::XK_Shift_L)) };
        fake_key(display, shift, true);
        tap(display, keycode);
        fake_key(display, shift, false);
    } else {
        tap(display, keycode);
    }
    Ok(())
}

fn tap(display: *mut xlib::Display, keycode: xlib::KeyCode) {
    fake_key(display, keycode, true);
    fake_key(display, keycode, false);
}

fn fake_key(display: *mut xlib::Display, keycode: xlib::KeyCode, pressed: bool) {
    // SAFETY: display is a live connection guarded by the caller's mutex
    unsafe {
        xtest::XTestFakeKeyEvent(
            display,
            u32::from(keycode),
            if pressed { xlib::True } else { xlib::False },
            CURRENT_TIME,
        );
    }
}
