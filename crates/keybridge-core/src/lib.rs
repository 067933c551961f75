//! # keybridge-core
//!
//! Shared library for KeyBridge containing the serial line protocol decoder,
//! the typed event model, and the activity/sleep state machine that decides
//! when the overlay is visible and which events may reach keystroke
//! injection.
//!
//! This crate has zero dependencies on OS APIs, serial ports, UI toolkits, or
//! async runtimes.  Everything in it is a pure function or a plain state
//! machine driven by explicit timestamps, which keeps it trivially testable.
//!
//! # Architecture overview
//!
//! KeyBridge connects a microcontroller (a small "selector" keyboard that
//! reports which key is highlighted and which one was committed) to the host
//! computer's input system.  The microcontroller speaks free text over a
//! serial line, one message per line:
//!
//! ```text
//! Selected: [Q] | Mode: Letters
//! Confirmed: Q
//! Backspace
//! ```
//!
//! - **`protocol`** – How lines become events.  [`decode`] classifies each
//!   line against a fixed, ordered list of matchers and always returns
//!   exactly one [`Event`].
//!
//! - **`domain`** – Pure state machines.  [`ActivityController`] tracks the
//!   time of the last qualifying activity and toggles the overlay between
//!   [`OverlayState::Awake`] and [`OverlayState::Asleep`];
//!   [`ConnectionState`] describes the serial link lifecycle.

pub mod domain;
pub mod protocol;

pub use domain::activity::{ActivityController, Admission, LiveTimeout, OverlayState};
pub use domain::connection::{ConnectionState, ConnectionStatus};
pub use protocol::decoder::{decode, LineMatcher, MATCHERS};
pub use protocol::event::{Event, NamedKey, UnknownKeyName};
