//! Application layer for the host.
//!
//! # Use cases
//!
//! - **`event_channel`** – The single-producer/single-consumer FIFO carrying
//!   decoded events from the serial reader thread to the presentation
//!   context.  It is the only structure shared between the two.
//!
//! - **`dispatch_input`** – Maps each `Event` to keystroke injection and
//!   display updates.  The OS call is made by a `KeystrokeInjector`
//!   implementation injected at construction time.
//!
//! - **`presentation`** – The presentation context: drains the event
//!   channel, runs the inactivity tick, gates events through the
//!   activity/sleep controller, and reacts to overlay commands.
//!
//! - **`settings`** – The editable settings and the port used to persist
//!   them.

pub mod dispatch_input;
pub mod event_channel;
pub mod presentation;
pub mod settings;
