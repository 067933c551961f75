//! Serial link to the selector device.
//!
//! # Layers
//!
//! - [`SerialDevice`] – the byte source.  Implemented for the real
//!   `serialport` handle and for [`mock::ScriptedDevice`].
//! - [`DeviceOpener`] – opens a device by port name and baud rate.
//! - [`reader::Connection`] – one open device plus line framing
//!   ([`line_buffer::LineBuffer`]); `poll()` yields at most one line.
//! - [`reader::spawn_reader`] – the dedicated reader thread that decodes lines
//!   into events and owns the [`ConnectionStatus`](keybridge_core::ConnectionStatus).
//!
//! Any I/O failure is fatal to the connection.  Nothing here retries:
//! reconnecting is an explicit restart of the whole process.

use std::io;
use std::time::Duration;

use thiserror::Error;

pub mod line_buffer;
pub mod mock;
pub mod reader;

/// Read timeout applied to real serial handles.
///
/// Reads only happen once bytes are waiting, so this bounds the rare case of
/// a driver reporting data it cannot deliver.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Error type for opening a serial port.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("serial port {port} not found")]
    NotFound { port: String },
    #[error("permission denied opening serial port {port}")]
    PermissionDenied { port: String },
    #[error("could not open serial port {port}: {reason}")]
    Open { port: String, reason: String },
}

/// Error type for reading from an open serial port.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
}

/// A readable byte source.
pub trait SerialDevice: Send {
    /// Number of bytes that can be read without blocking.
    fn bytes_to_read(&mut self) -> io::Result<usize>;

    /// Reads up to `buf.len()` bytes.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl SerialDevice for Box<dyn serialport::SerialPort> {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        let waiting = serialport::SerialPort::bytes_to_read(&**self)?;
        Ok(waiting as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut **self, buf)
    }
}

/// Opens serial devices by name.
pub trait DeviceOpener: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ConnectError`] describing why the port could not be opened.
    fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn SerialDevice>, ConnectError>;
}

/// Opens real serial ports through the `serialport` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSerialOpener;

impl DeviceOpener for SystemSerialOpener {
    fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn SerialDevice>, ConnectError> {
        let handle = serialport::new(port, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| classify_open_error(port, e))?;
        Ok(Box::new(handle))
    }
}

fn classify_open_error(port: &str, error: serialport::Error) -> ConnectError {
    let port = port.to_string();
    match error.kind {
        serialport::ErrorKind::NoDevice
        | serialport::ErrorKind::Io(io::ErrorKind::NotFound) => ConnectError::NotFound { port },
        serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied) => {
            ConnectError::PermissionDenied { port }
        }
        _ => ConnectError::Open { port, reason: error.description },
    }
}
