//! Owning the serial connection and pushing commands through it one at a time.
//!
//! The protocol has no transaction IDs, so two requests in flight on the same wire could never be told
//! apart. [`Session`] keeps its link behind a mutex and holds the lock for a complete write + read round
//! trip; concurrent callers simply queue on the lock. Connecting and disconnecting take the same lock, so
//! a port is never swapped out from under an in-flight command.

use std::sync::{Mutex, MutexGuard, PoisonError};

use embedded_io::{Error as _, ErrorKind, Read as _, Write as _};

use crate::{
    codec::{Command, Frame, Mode, Request, Target},
    error::Result,
    parser::{self, Outcome},
};

/// Returned by [`Session::execute`] when there is no live connection.
pub const NO_DATA: [u8; 1] = [0x00];

/// A connected serial link.
///
/// Reads are expected to block until at least one byte arrives or the link's read timeout expires, at
/// which point they report [`ErrorKind::TimedOut`] (or return `Ok(0)`).
pub trait Link: embedded_io::Read + embedded_io::Write {
    /// Check that the link is still usable without consuming any protocol bytes.
    fn probe(&mut self) -> core::result::Result<(), Self::Error>;
}

/// Opens [`Link`]s by port name, e.g. `/dev/ttyUSB0` or `COM3`.
pub trait Connector {
    type Link: Link;
    type Error: core::fmt::Display;

    fn open(&self, port_name: &str) -> core::result::Result<Self::Link, Self::Error>;
}

/// A single connection to a single device bus.
///
/// All methods take `&self`; share a session between threads with an `Arc`.
pub struct Session<C: Connector> {
    connector: C,
    link: Mutex<Option<C::Link>>,
}

impl<C: Connector> Session<C> {
    /// Create a disconnected session.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            link: Mutex::new(None),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    fn lock(&self) -> MutexGuard<'_, Option<C::Link>> {
        // A panic while holding the lock can't leave the link half-updated, so keep going.
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open `port_name`, closing any previous connection first.
    ///
    /// Returns `false` if the port could not be opened; the session is then disconnected.
    pub fn connect(&self, port_name: &str) -> bool {
        let mut link = self.lock();
        close(&mut link);
        match self.connector.open(port_name) {
            Ok(opened) => {
                log::info!("Connected to {port_name}");
                *link = Some(opened);
                true
            }
            Err(e) => {
                log::warn!("Failed to open {port_name}: {e}");
                false
            }
        }
    }

    /// Close the connection, if there is one.
    pub fn disconnect(&self) {
        close(&mut self.lock());
    }

    /// Whether the connection is open and still responding to probes.
    ///
    /// A failed probe closes the connection.
    pub fn is_alive(&self) -> bool {
        probe(&mut self.lock())
    }

    /// Write `frame` and read back up to `expected_len` bytes.
    ///
    /// Blocks for at most the link's read timeout once the frame is written. A short (possibly empty)
    /// buffer means the device didn't answer in time. Without a live connection nothing is sent and
    /// [`NO_DATA`] is returned.
    pub fn execute(&self, frame: &[u8], expected_len: usize) -> Frame {
        let mut slot = self.lock();
        if !probe(&mut slot) {
            return sentinel();
        }
        let Some(link) = slot.as_mut() else {
            return sentinel();
        };

        log::debug!("Sending request: {frame:02X?}");
        if let Err(e) = link.write_all(frame).and_then(|()| link.flush()) {
            log::warn!("Write failed, closing connection: {e:?}");
            close(&mut slot);
            return sentinel();
        }

        let mut response = Frame::new();
        let mut chunk = [0u8; 32];
        while response.len() < expected_len {
            let wanted = chunk.len().min(expected_len - response.len());
            match link.read(&mut chunk[..wanted]) {
                Ok(0) => break,
                Ok(bytes_read) => {
                    if response.extend_from_slice(&chunk[..bytes_read]).is_err() {
                        break;
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut) => break,
                Err(e) => {
                    log::warn!("Read failed, closing connection: {e:?}");
                    close(&mut slot);
                    break;
                }
            }
        }
        if response.len() < expected_len {
            log::debug!("Read timed out after {} of {expected_len} bytes", response.len());
        }
        log::debug!("Received response: {response:02X?}");
        response
    }

    /// Send a pre-built command and decode the reply.
    pub fn run_command(&self, command: &Command) -> Result<Outcome> {
        let encoded = command.encode()?;
        let response = self.execute(&encoded.frame, encoded.expected.len());
        Ok(parser::decode(command, &response))
    }

    /// Build, send and decode one command.
    ///
    /// Misuse (unknown register, bad span, wrong number of values, device address 0) is an error and
    /// nothing is sent. Everything that can go wrong on the wire is an [`Outcome::Invalid`].
    pub fn run(
        &self,
        address: u8,
        mode: Mode,
        target: impl Into<Target>,
        data: &[u16],
    ) -> Result<Outcome> {
        let command = Command::new(address, Request::new(mode, target, data)?)?;
        self.run_command(&command)
    }
}

fn sentinel() -> Frame {
    // Cannot fail, the frame buffer is far larger than one byte.
    Frame::from_slice(&NO_DATA).unwrap_or_default()
}

fn close<L>(link: &mut Option<L>) {
    if link.take().is_some() {
        log::info!("Disconnected");
    }
}

fn probe<L: Link>(link: &mut Option<L>) -> bool {
    let Some(open) = link.as_mut() else {
        return false;
    };
    match open.probe() {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Connection lost: {e:?}");
            close(link);
            false
        }
    }
}
