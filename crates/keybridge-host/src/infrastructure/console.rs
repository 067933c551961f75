//! Headless control surface: overlay commands typed on stdin.
//!
//! | Input                          | Command                  |
//! |--------------------------------|--------------------------|
//! | `restart` / `reconnect`        | `Restart`                |
//! | `quit` / `exit` / `close`      | `Close`                  |
//! | `settings`                     | `SettingsOpened`         |
//! | `done`                         | `SettingsClosed`         |
//! | `save <port> <baud> <timeout>` | `SettingsSaved`          |
//! | `poke`                         | `Interaction`            |

use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::application::presentation::UiCommand;
use crate::application::settings::Settings;

/// Error type for console input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?} (try restart, quit, settings, done, save, poke)")]
    Unknown(String),
    #[error("usage: save <port> <baud> <timeout-secs>")]
    SaveUsage,
}

/// Parses one console line.
///
/// # Errors
///
/// Returns [`ParseCommandError`] for blank, unknown, or malformed input.
pub fn parse_command(line: &str) -> Result<UiCommand, ParseCommandError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(ParseCommandError::Empty);
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "restart" | "reconnect" => UiCommand::Restart,
        "quit" | "exit" | "close" => UiCommand::Close,
        "settings" => UiCommand::SettingsOpened,
        "done" => UiCommand::SettingsClosed,
        "poke" => UiCommand::Interaction,
        "save" => UiCommand::SettingsSaved(parse_save(words.collect())?),
        _ => return Err(ParseCommandError::Unknown(verb.to_string())),
    };
    Ok(command)
}

fn parse_save(args: Vec<&str>) -> Result<Settings, ParseCommandError> {
    let [port, baud, timeout] = args.as_slice() else {
        return Err(ParseCommandError::SaveUsage);
    };
    Ok(Settings {
        port: (*port).to_string(),
        baud_rate: baud.parse().map_err(|_| ParseCommandError::SaveUsage)?,
        inactivity_timeout_secs: timeout.parse().map_err(|_| ParseCommandError::SaveUsage)?,
    })
}

/// Reads stdin on its own thread and forwards parsed commands.
///
/// The thread ends at end of input or once the receiver is gone.
///
/// # Errors
///
/// Returns an error only if the OS refuses to spawn the thread.
pub fn spawn_console(commands: mpsc::UnboundedSender<UiCommand>) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || read_commands(io::stdin().lock(), &commands))
}

fn read_commands(input: impl BufRead, commands: &mpsc::UnboundedSender<UiCommand>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("console input failed: {e}");
                return;
            }
        };
        match parse_command(&line) {
            Ok(command) => {
                if commands.send(command).is_err() {
                    return;
                }
            }
            Err(ParseCommandError::Empty) => {}
            Err(e) => warn!("{e}"),
        }
    }
    debug!("console input closed");
}
