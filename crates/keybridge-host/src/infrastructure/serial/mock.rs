//! Scripted serial devices for tests.
//!
//! A [`ScriptedDevice`] plays back a list of [`DeviceStep`]s: data chunks,
//! idle polls, and I/O failures.  Once the script is exhausted the device
//! stays idle forever, like a connected but silent selector.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{ConnectError, DeviceOpener, SerialDevice};

/// One step of a device script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceStep {
    /// Bytes that become readable.
    Data(Vec<u8>),
    /// One poll that finds nothing waiting.
    Idle,
    /// The next access fails with this error kind.
    Fail(io::ErrorKind),
}

impl DeviceStep {
    /// A `Data` step holding `line` followed by `\r\n`.
    pub fn line(line: &str) -> Self {
        DeviceStep::Data(format!("{line}\r\n").into_bytes())
    }
}

#[derive(Debug, Default)]
pub struct ScriptedDevice {
    steps: VecDeque<DeviceStep>,
}

impl ScriptedDevice {
    pub fn new(steps: impl IntoIterator<Item = DeviceStep>) -> Self {
        Self { steps: steps.into_iter().collect() }
    }
}

impl SerialDevice for ScriptedDevice {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        match self.steps.front() {
            Some(DeviceStep::Data(data)) => Ok(data.len()),
            Some(DeviceStep::Idle) => {
                self.steps.pop_front();
                Ok(0)
            }
            Some(DeviceStep::Fail(kind)) => {
                let kind = *kind;
                self.steps.pop_front();
                Err(io::Error::new(kind, "scripted failure"))
            }
            None => Ok(0),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.steps.pop_front() {
            Some(DeviceStep::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    self.steps.push_front(DeviceStep::Data(data.split_off(n)));
                }
                Ok(n)
            }
            Some(DeviceStep::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
            Some(DeviceStep::Idle) | None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }
}

/// Hands out one pre-built device, or fails every open.
///
/// Counts open attempts so tests can check that nothing retries.
#[derive(Debug)]
pub struct MockOpener {
    device: Mutex<Option<ScriptedDevice>>,
    failure: Option<ConnectError>,
    opens: AtomicUsize,
}

impl MockOpener {
    /// An opener whose first `open` returns `device`.
    pub fn with_device(device: ScriptedDevice) -> Self {
        Self { device: Mutex::new(Some(device)), failure: None, opens: AtomicUsize::new(0) }
    }

    /// An opener whose every `open` fails with `error`.
    pub fn failing(error: ConnectError) -> Self {
        Self { device: Mutex::new(None), failure: Some(error), opens: AtomicUsize::new(0) }
    }

    /// Number of `open` calls so far.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl DeviceOpener for MockOpener {
    fn open(&self, port: &str, _baud_rate: u32) -> Result<Box<dyn SerialDevice>, ConnectError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let device = self
            .device
            .lock()
            .map_err(|_| ConnectError::Open { port: port.to_string(), reason: "lock poisoned".into() })?
            .take();
        match device {
            Some(device) => Ok(Box::new(device)),
            None => Err(ConnectError::Open {
                port: port.to_string(),
                reason: "device already taken".into(),
            }),
        }
    }
}
