//! keybridge-host library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the host do?
//!
//! A selector device (a microcontroller with a few buttons) lets the user
//! scroll through characters and commit one.  It reports what it is doing as
//! text lines over a serial port.  The host application:
//!
//! 1. Opens the serial port on a dedicated reader thread and decodes every
//!    line into a typed `Event` (see `keybridge_core::decode`).
//! 2. Hands the events to the presentation context through a FIFO channel.
//! 3. Lets the activity/sleep controller decide whether the event wakes the
//!    overlay or is dispatched.
//! 4. Dispatches events to the host's keystroke injection API (`SendInput`
//!    on Windows, XTest on Linux, Core Graphics on macOS) and to the overlay
//!    display.

/// Application layer: event channel, dispatch, presentation loop, settings.
pub mod application;

/// Infrastructure layer: serial port, OS injectors, display sinks, storage.
pub mod infrastructure;
