//! Process restart.
//!
//! Reconnecting to the selector is done by starting the whole process again
//! with the same arguments, so no state from the failed connection survives.

use std::io;
use std::process::Command;

use tracing::info;

/// Builds a command that runs this executable with the current arguments.
///
/// # Errors
///
/// Returns an error if the path of the current executable is unavailable.
pub fn relaunch_command() -> io::Result<Command> {
    let exe = std::env::current_exe()?;
    let mut command = Command::new(exe);
    command.args(std::env::args_os().skip(1));
    Ok(command)
}

/// Replaces (Unix) or re-spawns (elsewhere) the current process.
///
/// On Unix this only returns if `exec` failed.  Elsewhere it returns after
/// the new process has been spawned and the caller must exit.
///
/// # Errors
///
/// Returns the I/O error that prevented the relaunch.
pub fn relaunch() -> io::Result<()> {
    let mut command = relaunch_command()?;
    info!("relaunching {:?}", command.get_program());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        Err(command.exec())
    }

    #[cfg(not(unix))]
    {
        command.spawn().map(|_| ())
    }
}
