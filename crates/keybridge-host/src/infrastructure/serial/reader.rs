//! The serial reader: one dedicated thread per process lifetime.
//!
//! ```text
//!  Connecting ──open ok──> Connected ──I/O error──> Disconnected
//!      │                                                 ^
//!      └───────────────open failed───────────────────────┘
//! ```
//!
//! The thread is the only writer of the [`ConnectionStatus`] watch.  On any
//! failure it emits exactly one `ConnectionError` event and exits; it never
//! reopens the port.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use keybridge_core::{decode, ConnectionState, ConnectionStatus, Event};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::line_buffer::LineBuffer;
use super::{ConnectError, DeviceOpener, ReadError, SerialDevice};
use crate::application::event_channel::EventSender;

/// Largest chunk read per poll.
const READ_CHUNK: usize = 1024;

/// How often [`ReaderHandle::shutdown`] checks whether the thread has exited.
const SHUTDOWN_POLL: Duration = Duration::from_millis(10);

/// An open device with line framing.
pub struct Connection {
    port: String,
    device: Box<dyn SerialDevice>,
    lines: LineBuffer,
}

impl Connection {
    /// Opens `port` at `baud_rate`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectError`] if the device cannot be opened.
    pub fn open(opener: &dyn DeviceOpener, port: &str, baud_rate: u32) -> Result<Self, ConnectError> {
        let device = opener.open(port, baud_rate)?;
        Ok(Self { port: port.to_string(), device, lines: LineBuffer::new() })
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// Returns the next complete, trimmed, non-empty line if one is
    /// available, without waiting for more data.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] on any I/O failure.  The connection is unusable
    /// afterwards.
    pub fn poll(&mut self) -> Result<Option<String>, ReadError> {
        if let Some(line) = self.lines.next_line() {
            return Ok(Some(line));
        }

        let waiting = match self.device.bytes_to_read() {
            Ok(n) => n,
            Err(e) if is_transient(&e) => 0,
            Err(e) => return Err(e.into()),
        };
        if waiting == 0 {
            return Ok(None);
        }

        let mut buf = [0u8; READ_CHUNK];
        let want = waiting.min(READ_CHUNK);
        match self.device.read(&mut buf[..want]) {
            Ok(n) => self.lines.push(&buf[..n]),
            Err(e) if is_transient(&e) => {}
            Err(e) => return Err(e.into()),
        }
        Ok(self.lines.next_line())
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Where and how the reader connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialReaderConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Sleep between polls that found no data.
    pub poll_interval: Duration,
}

/// Handle to the running reader thread.
#[derive(Debug)]
pub struct ReaderHandle {
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl ReaderHandle {
    /// Asks the thread to stop after its current poll.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Stops the thread and waits up to `grace` for it to exit.
    ///
    /// Returns `false` if the thread was still running at the deadline; it is
    /// then abandoned (detached) rather than blocking shutdown.
    pub fn shutdown(self, grace: Duration) -> bool {
        self.request_stop();
        let deadline = Instant::now() + grace;
        while !self.thread.is_finished() {
            if Instant::now() >= deadline {
                warn!("serial reader did not stop within {grace:?}; abandoning it");
                return false;
            }
            thread::sleep(SHUTDOWN_POLL);
        }
        if self.thread.join().is_err() {
            error!("serial reader thread panicked");
        }
        true
    }
}

/// Starts the reader thread.
///
/// The thread opens the port, then polls it until stopped or until the first
/// failure, decoding every line and appending the event to `events`.
///
/// # Errors
///
/// Returns an error only if the OS refuses to spawn the thread.
pub fn spawn_reader(
    config: SerialReaderConfig,
    opener: Arc<dyn DeviceOpener>,
    events: EventSender,
    state: watch::Sender<ConnectionStatus>,
) -> io::Result<ReaderHandle> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let thread = thread::Builder::new()
        .name("serial-reader".to_string())
        .spawn(move || run_reader(&config, opener.as_ref(), &events, &state, &flag))?;
    Ok(ReaderHandle { running, thread })
}

fn run_reader(
    config: &SerialReaderConfig,
    opener: &dyn DeviceOpener,
    events: &EventSender,
    state: &watch::Sender<ConnectionStatus>,
    running: &AtomicBool,
) {
    publish(state, ConnectionState::Connecting);
    info!("opening serial port {} at {} baud", config.port, config.baud_rate);

    let mut connection = match Connection::open(opener, &config.port, config.baud_rate) {
        Ok(connection) => connection,
        Err(e) => {
            error!("{e}");
            fail(events, state, &e.to_string());
            return;
        }
    };
    publish(state, ConnectionState::Connected);
    info!("connected to {}", connection.port());

    while running.load(Ordering::SeqCst) {
        match connection.poll() {
            Ok(Some(line)) => {
                let event = decode(&line);
                debug!("{} <- {line:?}", event.kind());
                if events.send(event).is_err() {
                    debug!("event channel closed; stopping serial reader");
                    break;
                }
            }
            Ok(None) => thread::sleep(config.poll_interval),
            Err(e) => {
                error!("serial port {}: {e}", connection.port());
                fail(events, state, &e.to_string());
                return;
            }
        }
    }

    info!("closing serial port {}", connection.port());
    publish(state, ConnectionState::Disconnected);
}

fn publish(state: &watch::Sender<ConnectionStatus>, next: ConnectionState) {
    state.send_modify(|status| *status = status.with_state(next));
}

fn fail(events: &EventSender, state: &watch::Sender<ConnectionStatus>, cause: &str) {
    publish(state, ConnectionState::Disconnected);
    let message = format!("Serial error: {cause}");
    if events.send(Event::ConnectionError { message }).is_err() {
        debug!("event channel closed; connection error not delivered");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::event_channel::event_channel;
    use crate::infrastructure::serial::mock::{DeviceStep, MockOpener, ScriptedDevice};
    use std::sync::{mpsc, Mutex};

    fn config() -> SerialReaderConfig {
        SerialReaderConfig {
            port: "COM7".to_string(),
            baud_rate: 9600,
            poll_interval: Duration::from_millis(1),
        }
    }

    fn open(steps: Vec<DeviceStep>) -> Connection {
        let opener = MockOpener::with_device(ScriptedDevice::new(steps));
        Connection::open(&opener, "COM7", 9600).unwrap()
    }

    // ── Connection::poll ──────────────────────────────────────────────────────

    #[test]
    fn test_poll_returns_lines_then_none() {
        // Arrange
        let mut conn = open(vec![DeviceStep::Data(b"Enter\r\nBackspace\n".to_vec())]);

        // Act / Assert
        assert_eq!(conn.poll().unwrap().as_deref(), Some("Enter"));
        assert_eq!(conn.poll().unwrap().as_deref(), Some("Backspace"));
        assert_eq!(conn.poll().unwrap(), None);
    }

    #[test]
    fn test_poll_without_data_returns_none() {
        let mut conn = open(vec![DeviceStep::Idle]);
        assert_eq!(conn.poll().unwrap(), None);
    }

    #[test]
    fn test_poll_timeout_is_not_an_error() {
        let mut conn = open(vec![DeviceStep::Fail(io::ErrorKind::TimedOut), DeviceStep::line("Enter")]);

        assert_eq!(conn.poll().unwrap(), None);
        assert_eq!(conn.poll().unwrap().as_deref(), Some("Enter"));
    }

    #[test]
    fn test_poll_fails_on_io_error() {
        let mut conn = open(vec![DeviceStep::Fail(io::ErrorKind::BrokenPipe)]);
        assert!(matches!(conn.poll(), Err(ReadError::Io(_))));
    }

    #[test]
    fn test_open_failure_is_returned() {
        let opener = MockOpener::failing(ConnectError::NotFound { port: "COM9".into() });

        let result = Connection::open(&opener, "COM9", 9600);

        assert!(matches!(result, Err(ConnectError::NotFound { .. })));
    }

    // ── Reader thread ─────────────────────────────────────────────────────────

    #[test]
    fn test_reader_decodes_lines_in_order() {
        // Arrange
        let opener = Arc::new(MockOpener::with_device(ScriptedDevice::new(vec![
            DeviceStep::line("Selected: [Q] | Mode: Letters"),
            DeviceStep::Idle,
            DeviceStep::line("Confirmed: Q"),
        ])));
        let (tx, mut rx) = event_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionStatus::default());

        // Act
        let handle = spawn_reader(config(), opener, tx, state_tx).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while events.len() < 2 && Instant::now() < deadline {
            events.extend(rx.drain());
            thread::sleep(Duration::from_millis(1));
        }

        // Assert
        assert_eq!(
            events,
            vec![
                Event::Selection { char: 'Q', mode: "Letters".into() },
                Event::Confirmed { char: "Q".into() },
            ]
        );
        assert_eq!(state_rx.borrow().state, ConnectionState::Connected);
        assert!(handle.shutdown(Duration::from_secs(1)));
        assert_eq!(state_rx.borrow().state, ConnectionState::Disconnected);
    }

    #[test]
    fn test_reader_reports_open_failure_once_and_exits() {
        // Arrange
        let opener = Arc::new(MockOpener::failing(ConnectError::NotFound { port: "COM7".into() }));
        let (tx, mut rx) = event_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionStatus::default());

        // Act
        let handle = spawn_reader(config(), Arc::clone(&opener) as Arc<dyn DeviceOpener>, tx, state_tx).unwrap();
        assert!(handle.shutdown(Duration::from_secs(5)));

        // Assert
        assert_eq!(
            rx.drain(),
            vec![Event::ConnectionError { message: "Serial error: serial port COM7 not found".into() }]
        );
        assert_eq!(state_rx.borrow().state, ConnectionState::Disconnected);
        assert!(!state_rx.borrow().ever_connected);
        assert_eq!(opener.open_count(), 1);
    }

    #[test]
    fn test_reader_stops_on_read_failure_without_retry() {
        // Arrange
        let opener = Arc::new(MockOpener::with_device(ScriptedDevice::new(vec![
            DeviceStep::line("Enter"),
            DeviceStep::Fail(io::ErrorKind::BrokenPipe),
            DeviceStep::line("Escape"),
        ])));
        let (tx, mut rx) = event_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionStatus::default());

        // Act
        let handle = spawn_reader(config(), Arc::clone(&opener) as Arc<dyn DeviceOpener>, tx, state_tx).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }

        // Assert
        assert!(handle.is_finished());
        let events = rx.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], Event::Enter);
        assert!(matches!(&events[1], Event::ConnectionError { message } if message.starts_with("Serial error: ")));
        assert!(state_rx.borrow().is_lost());
        assert_eq!(opener.open_count(), 1);
    }

    #[test]
    fn test_reader_stops_when_requested() {
        let opener = Arc::new(MockOpener::with_device(ScriptedDevice::default()));
        let (tx, _rx) = event_channel();
        let (state_tx, _state_rx) = watch::channel(ConnectionStatus::default());
        let handle = spawn_reader(config(), opener, tx, state_tx).unwrap();

        assert!(handle.shutdown(Duration::from_secs(1)));
    }

    /// Opener whose `open` blocks until the test releases it.
    struct BlockingOpener {
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl DeviceOpener for BlockingOpener {
        fn open(&self, port: &str, _baud_rate: u32) -> Result<Box<dyn SerialDevice>, ConnectError> {
            let _ = self.gate.lock().unwrap().recv();
            Err(ConnectError::NotFound { port: port.to_string() })
        }
    }

    #[test]
    fn test_shutdown_abandons_thread_stuck_past_grace() {
        // Arrange
        let (release, gate) = mpsc::channel();
        let opener = Arc::new(BlockingOpener { gate: Mutex::new(gate) });
        let (tx, _rx) = event_channel();
        let (state_tx, _state_rx) = watch::channel(ConnectionStatus::default());
        let handle = spawn_reader(config(), opener, tx, state_tx).unwrap();

        // Act
        let started = Instant::now();
        let stopped = handle.shutdown(Duration::from_millis(50));

        // Assert
        assert!(!stopped);
        assert!(started.elapsed() < Duration::from_secs(1));
        drop(release);
    }
}
