//! Mock keystroke injector.
//!
//! The real injectors press keys on the machine running the tests.  The
//! `MockInjector` replaces every OS call with in-memory recording, so tests
//! (and `--dry-run`) can observe exactly what would have been typed, and in
//! which order.
//!
//! # `should_fail` flag
//!
//! Set `should_fail = true` to make every call return
//! `InjectionError::Platform`.  Use [`MockInjector::fail_on_call`] to fail
//! only one specific call (0-based) and succeed on the rest.

use std::sync::{Mutex, MutexGuard};

use keybridge_core::NamedKey;
use tracing::info;

use crate::application::dispatch_input::{InjectionError, KeystrokeInjector};

/// One recorded injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Injected {
    Text(String),
    Key(NamedKey),
}

/// An injector that records all calls without touching the OS.
#[derive(Debug, Default)]
pub struct MockInjector {
    /// Every successful call, oldest first.
    pub calls: Mutex<Vec<Injected>>,
    /// When `true`, every call returns `InjectionError::Platform`.
    pub should_fail: bool,
    fail_on: Option<usize>,
    attempts: Mutex<usize>,
    log_calls: bool,
}

impl MockInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// An injector that only logs what it would type.  Used by `--dry-run`.
    pub fn logging() -> Self {
        Self { log_calls: true, ..Self::default() }
    }

    /// Fails the `index`-th call (counting from 0) and succeeds on all others.
    pub fn fail_on_call(index: usize) -> Self {
        Self { fail_on: Some(index), ..Self::default() }
    }

    /// Snapshot of the recorded calls.
    pub fn recorded(&self) -> Vec<Injected> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: Injected) -> Result<(), InjectionError> {
        let attempt = {
            let mut attempts = lock(&self.attempts);
            let current = *attempts;
            *attempts += 1;
            current
        };
        if self.should_fail || self.fail_on == Some(attempt) {
            return Err(InjectionError::Platform("mock failure".into()));
        }
        if self.log_calls {
            info!("dry run: would inject {call:?}");
        }
        lock(&self.calls).push(call);
        Ok(())
    }
}

impl KeystrokeInjector for MockInjector {
    fn type_text(&self, text: &str) -> Result<(), InjectionError> {
        self.record(Injected::Text(text.to_string()))
    }

    fn press_key(&self, key: NamedKey) -> Result<(), InjectionError> {
        self.record(Injected::Key(key))
    }
}

// A panicking test thread must not hide the calls recorded before it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
