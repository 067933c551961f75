//! Persistent storage for the host.
//!
//! - **`config`** – TOML configuration file: load, validate, save, and the
//!   [`SettingsStore`](crate::application::settings::SettingsStore)
//!   implementation used by the settings surface.

pub mod config;
