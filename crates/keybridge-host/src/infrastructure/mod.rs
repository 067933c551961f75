//! Infrastructure layer for the host application.
//!
//! Contains OS-facing adapters: the serial port, keystroke injection APIs,
//! display sinks, config storage, the stdin control surface, and process
//! restart.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `keybridge_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`serial`** – Opens the selector's serial port and runs the reader
//!   thread that decodes lines into events.  Never reconnects on its own.
//!
//! - **`injection`** – OS-specific implementations of `KeystrokeInjector`,
//!   selected at compile time with `#[cfg(target_os)]`, plus a
//!   `MockInjector` for tests and `--dry-run`.
//!
//! - **`display`** – `DisplaySink` implementations: a headless overlay that
//!   logs through `tracing`, and a recording sink for tests.
//!
//! - **`storage`** – TOML configuration file in the platform config directory.
//!
//! - **`console`** – Line commands on stdin (`restart`, `quit`, ...) mapped to
//!   overlay commands.
//!
//! - **`restart`** – Re-executes the current binary with the same arguments.

pub mod console;
pub mod display;
pub mod injection;
pub mod restart;
pub mod serial;
pub mod storage;
