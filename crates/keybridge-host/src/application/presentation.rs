//! The presentation context: the single owner of all overlay state.
//!
//! # What runs here?
//!
//! Everything except serial reading:
//!
//! - draining the [`EventReceiver`] and gating each event through the
//!   [`ActivityController`] (wake or dispatch),
//! - the periodic tick that puts the overlay to sleep, flips the status line
//!   from `Awake` to `Ready`, and presents connection prompts,
//! - commands coming from the overlay itself ([`UiCommand`]).
//!
//! All three are served by one `tokio::select!` loop in
//! [`OverlayPresenter::run`], so they never race each other.  The only data
//! shared with the reader thread is the event channel and the read-only
//! [`ConnectionStatus`] watch.
//!
//! The synchronous `handle_*`/`on_tick` methods take the current [`Instant`]
//! explicitly; `run` feeds them from the Tokio clock, which makes the whole
//! loop testable with paused time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use keybridge_core::{ActivityController, Admission, ConnectionState, ConnectionStatus, Event, LiveTimeout};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::application::dispatch_input::{DisplaySink, InputDispatcher};
use crate::application::event_channel::EventReceiver;
use crate::application::settings::{Settings, SettingsStore};

/// How long after startup the initial connection check runs.
pub const INITIAL_CONNECTION_CHECK: Duration = Duration::from_millis(100);

/// How long the `Awake` status stays up before switching to `Ready`.
pub const READY_DELAY: Duration = Duration::from_millis(200);

/// Commands sent by the overlay (or any other control surface).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    /// The user touched the overlay (drag start, drag move, button press).
    Interaction,
    /// The settings dialog opened.  Sleep is suppressed while it is open.
    SettingsOpened,
    /// The settings dialog closed without saving.
    SettingsClosed,
    /// The settings dialog saved new values.
    SettingsSaved(Settings),
    /// The user asked to reconnect (restarts the process).
    Restart,
    /// The user closed the overlay.
    Close,
}

/// Why the presentation loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Close,
    Restart,
}

/// Owns the activity controller, the dispatcher, and the display.
pub struct OverlayPresenter {
    activity: ActivityController,
    dispatcher: InputDispatcher,
    display: Arc<dyn DisplaySink>,
    settings: Settings,
    store: Box<dyn SettingsStore>,
    connection: watch::Receiver<ConnectionStatus>,
    last_connection: ConnectionState,
    ever_connected: bool,
    disconnect_reported: bool,
    started_at: Instant,
    initial_check_done: bool,
    prompt_open: bool,
    modal_open: bool,
    ready_at: Option<Instant>,
}

impl OverlayPresenter {
    /// Creates an awake presenter.
    ///
    /// `timeout` must be the same handle given to the settings surface so
    /// that saved timeouts take effect immediately.
    pub fn new(
        now: Instant,
        settings: Settings,
        timeout: LiveTimeout,
        dispatcher: InputDispatcher,
        display: Arc<dyn DisplaySink>,
        store: Box<dyn SettingsStore>,
        connection: watch::Receiver<ConnectionStatus>,
    ) -> Self {
        let last_connection = connection.borrow().state;
        Self {
            activity: ActivityController::new(now, timeout),
            dispatcher,
            display,
            settings,
            store,
            connection,
            last_connection,
            ever_connected: false,
            disconnect_reported: false,
            started_at: now,
            initial_check_done: false,
            prompt_open: false,
            modal_open: false,
            ready_at: None,
        }
    }

    pub fn activity(&self) -> &ActivityController {
        &self.activity
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal_open
    }

    /// Runs the presentation loop until the overlay asks to close or restart.
    ///
    /// Returns [`ExitReason::Close`] if the command channel closes.
    pub async fn run(
        mut self,
        mut events: EventReceiver,
        mut commands: mpsc::UnboundedReceiver<UiCommand>,
        tick_every: Duration,
    ) -> ExitReason {
        let mut ticker = tokio::time::interval(tick_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events_open = true;

        loop {
            tokio::select! {
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event, now()),
                    None => {
                        debug!("event channel closed; reader has stopped");
                        events_open = false;
                    }
                },
                command = commands.recv() => match command {
                    Some(command) => {
                        if let Some(exit) = self.handle_command(command, now()) {
                            return exit;
                        }
                    }
                    None => return ExitReason::Close,
                },
                _ = ticker.tick() => self.on_tick(now()),
            }
        }
    }

    /// Gates and dispatches one event from the channel.
    ///
    /// While asleep the event only wakes the overlay and is dropped.
    pub fn handle_event(&mut self, event: Event, now: Instant) {
        match self.activity.admit(now) {
            Admission::ConsumedByWake => {
                debug!("{} event consumed by wake", event.kind());
                self.display.set_awake(true);
                self.display.set_status("Awake");
                self.ready_at = Some(now + READY_DELAY);
            }
            Admission::Forward => self.dispatcher.dispatch(&event),
        }
    }

    /// Applies one overlay command.  Returns `Some` when the loop must end.
    pub fn handle_command(&mut self, command: UiCommand, now: Instant) -> Option<ExitReason> {
        match command {
            UiCommand::Interaction => self.activity.record_activity(now),
            UiCommand::SettingsOpened => {
                self.modal_open = true;
                self.activity.record_activity(now);
            }
            UiCommand::SettingsClosed => {
                self.modal_open = false;
                self.activity.record_activity(now);
            }
            UiCommand::SettingsSaved(settings) => self.apply_settings(settings, now),
            UiCommand::Restart => {
                info!("restart requested");
                return Some(ExitReason::Restart);
            }
            UiCommand::Close => {
                info!("close requested");
                return Some(ExitReason::Close);
            }
        }
        None
    }

    /// Periodic housekeeping: connection prompts, `Ready` status, sleep.
    pub fn on_tick(&mut self, now: Instant) {
        self.observe_connection(now);

        if let Some(ready_at) = self.ready_at {
            if now >= ready_at {
                self.ready_at = None;
                self.display.set_status("Ready");
            }
        }

        if self.activity.tick(now, self.modal_open) {
            self.ready_at = None;
            self.display.set_awake(false);
            self.display.set_status("Sleeping...");
        }
    }

    fn apply_settings(&mut self, settings: Settings, now: Instant) {
        self.activity.record_activity(now);

        if let Err(e) = settings.validate() {
            self.display.set_status(&format!("Invalid setting: {e}"));
            return;
        }
        if let Err(e) = self.store.save(&settings) {
            warn!("{e}");
            self.display.set_status(&e.to_string());
            return;
        }

        self.activity.timeout().set_secs(settings.inactivity_timeout_secs);
        let serial_changed = self.settings.serial_differs(&settings);
        self.settings = settings;
        self.modal_open = false;

        if serial_changed {
            self.display.set_status("Restart required to apply serial settings");
        } else {
            self.display.set_status("Settings saved");
        }
    }

    fn observe_connection(&mut self, now: Instant) {
        let status = *self.connection.borrow();
        self.ever_connected |= status.ever_connected;

        if status.state != self.last_connection {
            let previous = std::mem::replace(&mut self.last_connection, status.state);
            debug!("serial connection {previous} -> {}", status.state);
            if status.state == ConnectionState::Connected {
                self.display.set_status(&format!("Connected to {}", self.settings.port));
                if self.prompt_open {
                    self.prompt_open = false;
                    self.display.dismiss_connection_prompt();
                }
            }
        }

        // The watch only keeps the latest value, so a session that opened and
        // dropped between two ticks is detected through the latch instead of
        // the transition.
        if status.is_lost() && !self.disconnect_reported {
            self.disconnect_reported = true;
            self.show_prompt(&format!(
                "Disconnected from {}. Please check your connection and click Restart.",
                self.settings.port
            ));
        }

        if !self.initial_check_done && now.saturating_duration_since(self.started_at) >= INITIAL_CONNECTION_CHECK {
            self.initial_check_done = true;
            if !self.ever_connected {
                self.show_prompt(
                    "Initial connection failed. Please check your device and port settings, then click Restart.",
                );
            }
        }
    }

    fn show_prompt(&mut self, message: &str) {
        if self.prompt_open {
            return;
        }
        self.prompt_open = true;
        self.display.show_connection_prompt(message);
    }
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatch_input::{InjectionError, KeystrokeInjector};
    use crate::application::event_channel::event_channel;
    use crate::application::settings::SettingsError;
    use keybridge_core::{NamedKey, OverlayState};
    use std::sync::Mutex;

    // ── Test doubles ──────────────────────────────────────────────────────────

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.calls.lock().unwrap())
        }
    }

    impl KeystrokeInjector for Recorder {
        fn type_text(&self, text: &str) -> Result<(), InjectionError> {
            self.push(format!("type {text}"));
            Ok(())
        }
        fn press_key(&self, key: NamedKey) -> Result<(), InjectionError> {
            self.push(format!("press {key}"));
            Ok(())
        }
    }

    impl DisplaySink for Recorder {
        fn set_selected(&self, ch: char, mode: &str) {
            self.push(format!("selected {ch} {mode}"));
        }
        fn set_mode(&self, mode: &str) {
            self.push(format!("mode {mode}"));
        }
        fn set_last_sent(&self, text: &str) {
            self.push(format!("last_sent {text}"));
        }
        fn set_status(&self, text: &str) {
            self.push(format!("status {text}"));
        }
        fn set_awake(&self, awake: bool) {
            self.push(format!("awake {awake}"));
        }
        fn show_connection_prompt(&self, message: &str) {
            self.push(format!("prompt {message}"));
        }
        fn dismiss_connection_prompt(&self) {
            self.push("prompt dismissed".to_string());
        }
    }

    #[derive(Clone, Default)]
    struct MemoryStore {
        saved: Arc<Mutex<Vec<Settings>>>,
        fail: bool,
    }

    impl SettingsStore for MemoryStore {
        fn save(&mut self, settings: &Settings) -> Result<(), SettingsError> {
            if self.fail {
                return Err(SettingsError::Persist("disk full".into()));
            }
            self.saved.lock().unwrap().push(settings.clone());
            Ok(())
        }
    }

    fn settings() -> Settings {
        Settings {
            port: "COM7".to_string(),
            baud_rate: 9600,
            inactivity_timeout_secs: 5,
        }
    }

    struct Fixture {
        presenter: OverlayPresenter,
        recorder: Arc<Recorder>,
        store: MemoryStore,
        connection: watch::Sender<ConnectionStatus>,
        t0: Instant,
    }

    impl Fixture {
        fn set_connection(&self, state: ConnectionState) {
            self.connection.send_modify(|status| *status = status.with_state(state));
        }
    }

    fn fixture_with_store(store: MemoryStore) -> Fixture {
        let recorder = Arc::new(Recorder::default());
        let display = Arc::clone(&recorder) as Arc<dyn DisplaySink>;
        let dispatcher = InputDispatcher::new(
            Arc::clone(&recorder) as Arc<dyn KeystrokeInjector>,
            Arc::clone(&display),
        );
        let (connection, connection_rx) = watch::channel(ConnectionStatus::new(ConnectionState::Connecting));
        let t0 = Instant::now();
        let presenter = OverlayPresenter::new(
            t0,
            settings(),
            LiveTimeout::from_secs(5),
            dispatcher,
            display,
            Box::new(store.clone()),
            connection_rx,
        );
        Fixture { presenter, recorder, store, connection, t0 }
    }

    fn fixture() -> Fixture {
        fixture_with_store(MemoryStore::default())
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    // ── Event gating ──────────────────────────────────────────────────────────

    #[test]
    fn test_event_while_awake_is_dispatched() {
        let mut f = fixture();

        f.presenter.handle_event(Event::Confirmed { char: "Q".into() }, f.t0);

        assert_eq!(f.recorder.take(), vec!["type Q", "last_sent Q"]);
    }

    #[test]
    fn test_inactivity_puts_overlay_to_sleep_within_one_tick() {
        // Arrange
        let mut f = fixture();
        f.set_connection(ConnectionState::Connected);
        f.presenter.on_tick(f.t0);
        f.recorder.take();

        // Act: 5.0 s is not yet "longer than" the timeout; one tick later is
        f.presenter.on_tick(f.t0 + secs(5));
        assert_eq!(f.presenter.activity().state(), OverlayState::Awake);
        f.presenter.on_tick(f.t0 + secs(5) + Duration::from_millis(100));

        // Assert
        assert_eq!(f.presenter.activity().state(), OverlayState::Asleep);
        assert_eq!(f.recorder.take(), vec!["awake false", "status Sleeping..."]);
    }

    #[test]
    fn test_event_while_asleep_wakes_and_is_not_dispatched() {
        // Arrange
        let mut f = fixture();
        f.set_connection(ConnectionState::Connected);
        f.presenter.on_tick(f.t0 + secs(6));
        f.recorder.take();

        // Act
        f.presenter.handle_event(Event::Confirmed { char: "Q".into() }, f.t0 + secs(7));

        // Assert
        assert_eq!(f.presenter.activity().state(), OverlayState::Awake);
        assert_eq!(f.recorder.take(), vec!["awake true", "status Awake"]);
    }

    #[test]
    fn test_wake_shows_ready_after_delay() {
        let mut f = fixture();
        f.set_connection(ConnectionState::Connected);
        f.presenter.on_tick(f.t0 + secs(6));
        let wake_at = f.t0 + secs(7);
        f.presenter.handle_event(Event::Enter, wake_at);
        f.recorder.take();

        f.presenter.on_tick(wake_at + Duration::from_millis(100));
        assert!(f.recorder.take().is_empty());

        f.presenter.on_tick(wake_at + READY_DELAY);
        assert_eq!(f.recorder.take(), vec!["status Ready"]);
    }

    #[test]
    fn test_interaction_postpones_sleep_without_waking() {
        let mut f = fixture();
        f.set_connection(ConnectionState::Connected);

        f.presenter.handle_command(UiCommand::Interaction, f.t0 + secs(4));
        f.presenter.on_tick(f.t0 + secs(8));

        assert_eq!(f.presenter.activity().state(), OverlayState::Awake);
    }

    #[test]
    fn test_open_settings_suppresses_sleep() {
        let mut f = fixture();
        f.set_connection(ConnectionState::Connected);

        f.presenter.handle_command(UiCommand::SettingsOpened, f.t0);
        f.presenter.on_tick(f.t0 + secs(60));
        assert_eq!(f.presenter.activity().state(), OverlayState::Awake);

        f.presenter.handle_command(UiCommand::SettingsClosed, f.t0 + secs(60));
        f.presenter.on_tick(f.t0 + secs(66));
        assert_eq!(f.presenter.activity().state(), OverlayState::Asleep);
    }

    // ── Connection prompts ────────────────────────────────────────────────────

    #[test]
    fn test_initial_connection_failure_prompts_once() {
        let mut f = fixture();

        f.presenter.on_tick(f.t0 + Duration::from_millis(50));
        assert!(f.recorder.take().is_empty());

        f.presenter.on_tick(f.t0 + INITIAL_CONNECTION_CHECK);
        f.presenter.on_tick(f.t0 + Duration::from_millis(300));
        assert_eq!(
            f.recorder.take(),
            vec!["prompt Initial connection failed. Please check your device and port settings, then click Restart."]
        );
    }

    #[test]
    fn test_connected_shows_status_and_skips_initial_prompt() {
        let mut f = fixture();
        f.set_connection(ConnectionState::Connected);

        f.presenter.on_tick(f.t0 + INITIAL_CONNECTION_CHECK);

        assert_eq!(f.recorder.take(), vec!["status Connected to COM7"]);
    }

    #[test]
    fn test_disconnect_after_connect_prompts_restart() {
        let mut f = fixture();
        f.set_connection(ConnectionState::Connected);
        f.presenter.on_tick(f.t0 + INITIAL_CONNECTION_CHECK);
        f.recorder.take();

        f.set_connection(ConnectionState::Disconnected);
        f.presenter.on_tick(f.t0 + secs(1));

        assert_eq!(
            f.recorder.take(),
            vec!["prompt Disconnected from COM7. Please check your connection and click Restart."]
        );
    }

    #[test]
    fn test_session_lost_between_ticks_still_prompts_restart() {
        // Arrange: the reader connects and drops before the first tick
        let mut f = fixture();
        f.set_connection(ConnectionState::Connected);
        f.set_connection(ConnectionState::Disconnected);

        // Act
        f.presenter.on_tick(f.t0 + INITIAL_CONNECTION_CHECK);
        f.presenter.on_tick(f.t0 + secs(1));

        // Assert
        assert_eq!(
            f.recorder.take(),
            vec!["prompt Disconnected from COM7. Please check your connection and click Restart."]
        );
    }

    #[test]
    fn test_late_connect_dismisses_initial_prompt() {
        let mut f = fixture();
        f.presenter.on_tick(f.t0 + INITIAL_CONNECTION_CHECK);
        f.recorder.take();

        f.set_connection(ConnectionState::Connected);
        f.presenter.on_tick(f.t0 + secs(1));

        assert_eq!(f.recorder.take(), vec!["status Connected to COM7", "prompt dismissed"]);
    }

    // ── Settings ──────────────────────────────────────────────────────────────

    #[test]
    fn test_saved_timeout_applies_live() {
        // Arrange
        let mut f = fixture();
        f.set_connection(ConnectionState::Connected);
        f.presenter.handle_command(UiCommand::SettingsOpened, f.t0);
        let new = Settings { inactivity_timeout_secs: 60, ..settings() };

        // Act
        f.presenter.handle_command(UiCommand::SettingsSaved(new.clone()), f.t0);
        f.presenter.on_tick(f.t0 + secs(30));

        // Assert
        assert_eq!(f.presenter.activity().state(), OverlayState::Awake);
        assert!(!f.presenter.is_modal_open());
        assert_eq!(f.presenter.settings(), &new);
        assert_eq!(f.store.saved.lock().unwrap().as_slice(), &[new]);
    }

    #[test]
    fn test_saving_serial_change_asks_for_restart() {
        let mut f = fixture();
        let new = Settings { port: "/dev/ttyACM0".into(), ..settings() };

        f.presenter.handle_command(UiCommand::SettingsSaved(new), f.t0);

        assert_eq!(f.recorder.take(), vec!["status Restart required to apply serial settings"]);
    }

    #[test]
    fn test_invalid_settings_are_rejected_and_not_saved() {
        let mut f = fixture();
        f.presenter.handle_command(UiCommand::SettingsOpened, f.t0);
        let bad = Settings { inactivity_timeout_secs: 0, ..settings() };

        f.presenter.handle_command(UiCommand::SettingsSaved(bad), f.t0);

        assert_eq!(
            f.recorder.take(),
            vec!["status Invalid setting: timeout must be at least 1 second"]
        );
        assert!(f.presenter.is_modal_open());
        assert!(f.store.saved.lock().unwrap().is_empty());
        assert_eq!(f.presenter.activity().timeout().secs(), 5);
    }

    #[test]
    fn test_store_failure_is_reported_and_timeout_unchanged() {
        let mut f = fixture_with_store(MemoryStore { fail: true, ..Default::default() });
        let new = Settings { inactivity_timeout_secs: 60, ..settings() };

        f.presenter.handle_command(UiCommand::SettingsSaved(new), f.t0);

        assert_eq!(f.recorder.take(), vec!["status failed to save settings: disk full"]);
        assert_eq!(f.presenter.activity().timeout().secs(), 5);
    }

    // ── Exit commands ─────────────────────────────────────────────────────────

    #[test]
    fn test_restart_and_close_end_the_loop() {
        let mut f = fixture();
        assert_eq!(f.presenter.handle_command(UiCommand::Restart, f.t0), Some(ExitReason::Restart));
        assert_eq!(f.presenter.handle_command(UiCommand::Close, f.t0), Some(ExitReason::Close));
        assert_eq!(f.presenter.handle_command(UiCommand::Interaction, f.t0), None);
    }

    // ── Async loop ────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_run_dispatches_queued_events_in_order_then_closes() {
        // Arrange
        let f = fixture();
        let (tx, rx) = event_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        tx.send(Event::Selection { char: 'Q', mode: "Letters".into() }).unwrap();
        tx.send(Event::Confirmed { char: "Q".into() }).unwrap();
        tx.send(Event::Backspace).unwrap();
        let recorder = Arc::clone(&f.recorder);

        // Act
        let handle = tokio::spawn(f.presenter.run(rx, cmd_rx, Duration::from_millis(100)));
        tokio::time::sleep(Duration::from_millis(10)).await;
        cmd_tx.send(UiCommand::Close).unwrap();
        let exit = handle.await.unwrap();

        // Assert
        assert_eq!(exit, ExitReason::Close);
        let calls: Vec<_> = recorder
            .take()
            .into_iter()
            .filter(|c| !c.starts_with("prompt") && !c.starts_with("status"))
            .collect();
        assert_eq!(
            calls,
            vec!["selected Q Letters", "type Q", "last_sent Q", "press backspace", "last_sent BACKSPACE"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_close_when_command_channel_drops() {
        let f = fixture();
        let (_tx, rx) = event_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
        drop(cmd_tx);

        let exit = f.presenter.run(rx, cmd_rx, Duration::from_millis(100)).await;

        assert_eq!(exit, ExitReason::Close);
    }
}
