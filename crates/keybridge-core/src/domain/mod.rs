//! Domain layer: pure state machines with no OS dependencies.
//!
//! # Modules
//!
//! - **`activity`** – The Activity/Sleep controller.  Decides when the
//!   overlay goes to sleep (no activity for longer than the configured
//!   timeout) and when an incoming event merely wakes it instead of being
//!   dispatched.
//!
//! - **`connection`** – The lifecycle states of the serial link.  Only the
//!   serial reader ever changes it; everyone else observes it.

pub mod activity;
pub mod connection;
