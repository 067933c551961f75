//! Platform keystroke injectors.
//!
//! The correct implementation is selected at compile time via `#[cfg(target_os = ...)]`.

use std::sync::Arc;

use crate::application::dispatch_input::{InjectionError, KeystrokeInjector};

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "macos")]
pub mod macos;

/// Builds the injector for the OS this binary was compiled for.
///
/// # Errors
///
/// Returns [`InjectionError`] if the platform back-end cannot be initialized
/// (for example, no X display on Linux) or the OS is not supported.
pub fn platform_injector() -> Result<Arc<dyn KeystrokeInjector>, InjectionError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Arc::new(windows::WindowsKeystrokeInjector::new()))
    }
    #[cfg(target_os = "linux")]
    {
        Ok(Arc::new(linux::LinuxXTestInjector::new()?))
    }
    #[cfg(target_os = "macos")]
    {
        Ok(Arc::new(macos::MacosKeystrokeInjector::new()))
    }
    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        Err(InjectionError::NotInitialized)
    }
}
