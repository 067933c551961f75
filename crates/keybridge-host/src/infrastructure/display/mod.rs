//! Display sinks for the overlay.
//!
//! The bridge runs headless: [`log::LogDisplay`] renders every overlay update
//! through `tracing`.  [`mock::RecordingDisplay`] records updates for tests.

pub mod log;
pub mod mock;
