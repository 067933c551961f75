//! KeyBridge host entry point.
//!
//! Wires together the serial reader thread, the keystroke injector, the
//! headless overlay, and the presentation loop, then runs until the overlay
//! asks to close or restart.
//!
//! # Architecture
//!
//! ```text
//! serial-reader thread                  presentation loop (Tokio)
//!  └─ open port ─ poll ─ decode ──FIFO──> OverlayPresenter::run
//!  └─ ConnectionStatus ────────watch────>  ├─ activity gate ─> InputDispatcher
//!                                          ├─ tick: sleep / prompts
//! console thread / Ctrl-C ───UiCommand───> └─ commands: settings, restart, close
//! ```
//!
//! # Usage
//!
//! ```text
//! keybridge [OPTIONS]
//!
//! Options:
//!   --config <PATH>                Config file [default: platform config dir]
//!   --port <PORT>                  Serial port, e.g. COM7 or /dev/ttyACM0
//!   --baud <BAUD>                  Serial baud rate
//!   --inactivity-timeout <SECS>    Seconds before the overlay sleeps
//!   --dry-run                      Log keystrokes instead of injecting them
//! ```
//!
//! Each option except `--dry-run` can also be set through a `KEYBRIDGE_*`
//! environment variable.  Command-line values override the config file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use keybridge_core::{ConnectionStatus, LiveTimeout};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use keybridge_host::application::dispatch_input::{DisplaySink, InputDispatcher, KeystrokeInjector};
use keybridge_host::application::event_channel::event_channel;
use keybridge_host::application::presentation::{ExitReason, OverlayPresenter, UiCommand};
use keybridge_host::infrastructure::{
    console::spawn_console,
    display::log::LogDisplay,
    injection::{mock::MockInjector, platform_injector},
    restart::relaunch,
    serial::{
        reader::{spawn_reader, SerialReaderConfig},
        SystemSerialOpener,
    },
    storage::config::{config_file_path, load_config_from, BridgeConfig, TomlSettingsStore},
};

/// How long shutdown waits for the serial reader before abandoning it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Serial selector device to keystroke bridge.
#[derive(Debug, Parser)]
#[command(
    name = "keybridge",
    about = "Types the characters chosen on a serial selector device",
    version
)]
struct Cli {
    /// Path of the TOML config file.
    #[arg(long, env = "KEYBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Serial port of the selector device.
    #[arg(long, env = "KEYBRIDGE_PORT")]
    port: Option<String>,

    /// Serial baud rate.
    #[arg(long, env = "KEYBRIDGE_BAUD")]
    baud: Option<u32>,

    /// Seconds without activity before the overlay goes to sleep.
    #[arg(long, env = "KEYBRIDGE_INACTIVITY_TIMEOUT")]
    inactivity_timeout: Option<u64>,

    /// Log keystrokes instead of injecting them.
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut BridgeConfig) {
        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(secs) = self.inactivity_timeout {
            config.overlay.inactivity_timeout_secs = secs;
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Config comes first: it carries the default log level.
    let config_path = cli.config.clone().map_or_else(config_file_path, Ok);
    let loaded = match &config_path {
        Ok(path) => load_config_from(path),
        Err(_) => Ok(BridgeConfig::default()),
    };
    let file_config = loaded.as_ref().ok().cloned().unwrap_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&file_config.bridge.log_level)),
        )
        .init();

    info!("KeyBridge starting");
    if let Err(e) = &loaded {
        warn!("{e}; using default configuration");
    }
    let store_path = match config_path {
        Ok(path) => path,
        Err(e) => {
            warn!("{e}; settings will be saved to ./config.toml");
            PathBuf::from("config.toml")
        }
    };

    let mut config = file_config.clone();
    cli.apply_overrides(&mut config);
    config.validate().context("invalid configuration")?;

    // ── Keystroke injection and overlay ───────────────────────────────────────
    let injector: Arc<dyn KeystrokeInjector> = if cli.dry_run {
        info!("dry run: keystrokes will be logged, not injected");
        Arc::new(MockInjector::logging())
    } else {
        platform_injector().context("keystroke injection unavailable (try --dry-run)")?
    };
    let display: Arc<dyn DisplaySink> = Arc::new(LogDisplay::new());
    let dispatcher = InputDispatcher::new(injector, Arc::clone(&display));

    // ── Channels ──────────────────────────────────────────────────────────────
    let (event_tx, event_rx) = event_channel();
    let (state_tx, state_rx) = watch::channel(ConnectionStatus::default());
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let settings = config.settings();
    let presenter = OverlayPresenter::new(
        tokio::time::Instant::now().into_std(),
        settings,
        LiveTimeout::from_secs(config.overlay.inactivity_timeout_secs),
        dispatcher,
        Arc::clone(&display),
        Box::new(TomlSettingsStore::new(store_path, file_config)),
        state_rx,
    );

    // ── Serial reader ─────────────────────────────────────────────────────────
    let reader = spawn_reader(
        SerialReaderConfig {
            port: config.serial.port.clone(),
            baud_rate: config.serial.baud_rate,
            poll_interval: config.poll_interval(),
        },
        Arc::new(SystemSerialOpener),
        event_tx,
        state_tx,
    )
    .context("failed to start serial reader thread")?;

    // ── Control surfaces ──────────────────────────────────────────────────────
    let ctrl_c_tx = command_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = ctrl_c_tx.send(UiCommand::Close);
        }
    });
    if let Err(e) = spawn_console(command_tx.clone()) {
        warn!("console commands unavailable: {e}");
    }

    display.set_status(&format!("Connecting to {}...", config.serial.port));
    info!("KeyBridge ready. Type `restart`, `quit`, `settings`, `done`, `save`, or `poke`.");

    let exit = presenter.run(event_rx, command_rx, config.tick_interval()).await;
    drop(command_tx);

    // ── Shutdown ──────────────────────────────────────────────────────────────
    let stopped = tokio::task::spawn_blocking(move || reader.shutdown(SHUTDOWN_GRACE))
        .await
        .unwrap_or(false);
    if !stopped {
        warn!("serial reader abandoned during shutdown");
    }

    if exit == ExitReason::Restart {
        info!("restarting KeyBridge");
        if let Err(e) = relaunch() {
            error!("restart failed: {e}");
            return Err(e).context("failed to restart");
        }
    }

    info!("KeyBridge stopped");
    Ok(())
}
