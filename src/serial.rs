//! [`Connector`] and [`Link`] implementations for real serial ports, via the `serialport` crate.
//!
//! The DPH5005 ships configured for 9600 baud, 8 data bits, no parity, 1 stop bit.

use std::time::Duration;

use serialport::SerialPort;

use crate::session::{Connector, Link};

pub const DEFAULT_BAUD_RATE: u32 = 9600;
/// The device can take a while to respond, a reasonably large time out is required.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Port settings used when opening a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    pub baud_rate: u32,
    /// How long a read waits for data before giving up.
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Opens system serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector {
    config: SerialConfig,
}

impl SerialConnector {
    pub fn new(config: SerialConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl Connector for SerialConnector {
    type Link = SerialLink;
    type Error = serialport::Error;

    fn open(&self, port_name: &str) -> Result<SerialLink, serialport::Error> {
        serialport::new(port_name, self.config.baud_rate)
            .timeout(self.config.timeout)
            .open()
            .map(SerialLink)
    }
}

/// Names of the serial ports currently present on the system.
///
/// Enumeration failures are logged and reported as no ports.
pub fn available_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            log::warn!("Failed to enumerate serial ports: {e}");
            Vec::new()
        }
    }
}

/// An open serial port.
pub struct SerialLink(Box<dyn SerialPort>);

impl SerialLink {
    pub fn name(&self) -> Option<String> {
        self.0.name()
    }
}

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<serialport::Error> for IoError {
    fn from(err: serialport::Error) -> Self {
        IoError(err.into())
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::NotConnected => embedded_io::ErrorKind::NotConnected,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            // A blocking port only reports this when the read timeout expired with nothing received.
            std::io::ErrorKind::WouldBlock => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            std::io::ErrorKind::OutOfMemory => embedded_io::ErrorKind::OutOfMemory,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for SerialLink {
    type Error = IoError;
}

impl embedded_io::Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

impl Link for SerialLink {
    /// Asks the driver how many bytes are waiting, which fails once the device is unplugged.
    fn probe(&mut self) -> Result<(), Self::Error> {
        self.0.bytes_to_read().map(|_| ()).map_err(IoError::from)
    }
}
