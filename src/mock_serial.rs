//! We use this mocking module in unit tests to emulate a serial port and the DPH5005 behind it.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
    thread,
    time::Duration,
};

use crate::{
    crc::{crc16_bytes, verify},
    register::{REGISTER_COUNT, Register},
    session::{Connector, Link},
};

/// Something that happened on the mock wire, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Bytes passed to one `write` call.
    Write(Vec<u8>),
    /// Number of bytes returned by one `read` call.
    Read(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum MockSerialError {
    /// Simulated timeout error, returned when no data is waiting.
    #[error("simulated timeout")]
    Timeout,
    /// Generic simulated error for testing
    #[error("simulated error")]
    SimulatedError,
}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
        }
    }
}

#[derive(Default)]
struct MockState {
    /// Everything written to the mock serial port
    write_buffer: Vec<u8>,
    /// Data waiting to be read
    read_buffer: VecDeque<u8>,
    events: Vec<Event>,
    /// Answers every write, if set
    device: Option<MockDevice>,
    should_error_on_write: bool,
    should_error_on_read: bool,
    should_error_on_probe: bool,
    read_delay: Option<Duration>,
}

/// Our mock type used to emulate a serial port.
///
/// Clones share the same port, so a test can keep a handle after the session takes ownership.
#[derive(Clone, Default)]
pub struct MockSerial {
    state: Arc<Mutex<MockState>>,
}

impl MockSerial {
    /// Create a new MockSerial instance with empty buffers
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a port with a device at `address` behind it.
    pub fn with_device(address: u8) -> Self {
        let serial = Self::new();
        serial.state().device = Some(MockDevice::new(address));
        serial
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Queue data that will be returned when read() is called
    pub fn set_read_data(&self, data: &[u8]) {
        let mut state = self.state();
        state.read_buffer.clear();
        state.read_buffer.extend(data);
    }

    /// Copy of the data that was written to this mock serial port
    pub fn written_data(&self) -> Vec<u8> {
        self.state().write_buffer.clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&self, should_error: bool) {
        self.state().should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&self, should_error: bool) {
        self.state().should_error_on_read = should_error;
    }

    /// Configure whether liveness probes should fail with an error
    pub fn set_probe_error(&self, should_error: bool) {
        self.state().should_error_on_probe = should_error;
    }

    /// Stall every read, to widen any window for interleaving.
    pub fn set_read_delay(&self, delay: Duration) {
        self.state().read_delay = Some(delay);
    }

    /// Current value of a register on the attached device.
    pub fn device_register(&self, register: Register) -> Option<u16> {
        self.state()
            .device
            .as_ref()
            .map(|device| device.registers[register.ordinal()])
    }

    /// Overwrite a register on the attached device.
    pub fn set_device_register(&self, register: Register, value: u16) {
        if let Some(device) = self.state().device.as_mut() {
            device.registers[register.ordinal()] = value;
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut state = self.state();
        if state.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }

        state.write_buffer.extend_from_slice(buf);
        state.events.push(Event::Write(buf.to_vec()));
        if let Some(reply) = state.device.as_mut().map(|device| device.respond(buf)) {
            state.read_buffer.extend(reply);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.state().should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let delay = self.state().read_delay;
        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        let mut state = self.state();
        if state.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }
        if state.read_buffer.is_empty() {
            return Err(MockSerialError::Timeout);
        }

        let bytes_to_read = buf.len().min(state.read_buffer.len());
        for (slot, byte) in buf.iter_mut().zip(state.read_buffer.drain(..bytes_to_read)) {
            *slot = byte;
        }
        state.events.push(Event::Read(bytes_to_read));
        Ok(bytes_to_read)
    }
}

impl Link for MockSerial {
    fn probe(&mut self) -> Result<(), Self::Error> {
        if self.state().should_error_on_probe {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(())
    }
}

#[derive(Default)]
struct ConnectorState {
    opened: Vec<String>,
    refused: Vec<String>,
    device_address: Option<u8>,
    last: Option<MockSerial>,
}

/// Hands out [`MockSerial`] ports and remembers the last one.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every port opened by this connector gets a device at `address`.
    pub fn with_device(address: u8) -> Self {
        let connector = Self::new();
        connector.state.lock().unwrap().device_address = Some(address);
        connector
    }

    /// Make opening `port_name` fail.
    pub fn refuse(&self, port_name: &str) {
        self.state.lock().unwrap().refused.push(port_name.to_owned());
    }

    pub fn opened(&self) -> Vec<String> {
        self.state.lock().unwrap().opened.clone()
    }

    /// Handle to the most recently opened port.
    pub fn serial(&self) -> MockSerial {
        self.state
            .lock()
            .unwrap()
            .last
            .clone()
            .expect("no port has been opened")
    }
}

impl Connector for MockConnector {
    type Link = MockSerial;
    type Error = String;

    fn open(&self, port_name: &str) -> Result<MockSerial, String> {
        let mut state = self.state.lock().unwrap();
        if state.refused.iter().any(|refused| refused == port_name) {
            return Err(format!("{port_name}: no such device"));
        }
        let serial = match state.device_address {
            Some(address) => MockSerial::with_device(address),
            None => MockSerial::new(),
        };
        state.opened.push(port_name.to_owned());
        state.last = Some(serial.clone());
        Ok(serial)
    }
}

/// A register file answering like a DPH5005 does.
pub struct MockDevice {
    address: u8,
    registers: [u16; REGISTER_COUNT],
}

impl MockDevice {
    pub fn new(address: u8) -> Self {
        let mut registers = [0; REGISTER_COUNT];
        registers[Register::VIn.ordinal()] = 2400;
        registers[Register::BLed.ordinal()] = 4;
        registers[Register::Model.ordinal()] = 5205;
        registers[Register::Version.ordinal()] = 16;
        Self { address, registers }
    }

    /// The reply to one request frame. Requests for other devices and corrupted frames get no reply.
    pub fn respond(&mut self, request: &[u8]) -> Vec<u8> {
        if request.len() < 8 || !verify(request) || request[0] != self.address {
            return Vec::new();
        }
        let function = request[1];
        let word = |at: usize| u16::from_be_bytes([request[at], request[at + 1]]) as usize;

        let mut reply = vec![self.address, function];
        match function {
            0x03 => {
                let (start, count) = (word(2), word(4));
                if count == 0 || start + count > REGISTER_COUNT {
                    return self.exception(function, 0x02);
                }
                reply.push((count * 2) as u8);
                for value in &self.registers[start..start + count] {
                    reply.extend_from_slice(&value.to_be_bytes());
                }
            }
            0x06 => {
                let register = word(2);
                if register >= REGISTER_COUNT {
                    return self.exception(function, 0x02);
                }
                self.registers[register] = word(4) as u16;
                reply.extend_from_slice(&request[2..6]);
            }
            0x10 => {
                let (start, count) = (word(2), word(4));
                if count == 0 || start + count > REGISTER_COUNT || request.len() != 9 + count * 2 {
                    return self.exception(function, 0x02);
                }
                for i in 0..count {
                    self.registers[start + i] = word(7 + i * 2) as u16;
                }
                reply.extend_from_slice(&request[2..6]);
            }
            _ => return self.exception(function, 0x01),
        }
        let crc = crc16_bytes(&reply);
        reply.extend_from_slice(&crc);
        reply
    }

    fn exception(&self, function: u8, code: u8) -> Vec<u8> {
        let mut reply = vec![self.address, function | 0x80, code];
        let crc = crc16_bytes(&reply);
        reply.extend_from_slice(&crc);
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, Write};

    #[test]
    fn test_write_data() {
        let mut mock = MockSerial::new();
        let test_data = b"Hello, World!";

        let result = mock.write(test_data);
        assert_eq!(result.unwrap(), test_data.len());
        assert_eq!(mock.written_data(), test_data.to_vec());
    }

    #[test]
    fn test_read_partial_data() {
        let mut mock = MockSerial::new();
        mock.set_read_data(b"Long response data");

        let mut buffer = [0u8; 5];
        assert_eq!(mock.read(&mut buffer).unwrap(), 5);
        assert_eq!(&buffer, b"Long ");
        assert_eq!(mock.events(), vec![Event::Read(5)]);
    }

    #[test]
    fn test_read_timeout_when_no_data() {
        let mut mock = MockSerial::new();
        let mut buffer = [0u8; 10];

        let result = mock.read(&mut buffer);
        assert!(matches!(result, Err(MockSerialError::Timeout)));
    }

    #[test]
    fn test_error_simulation() {
        let mut mock = MockSerial::new();
        mock.set_write_error(true);
        assert!(matches!(mock.write(b"test"), Err(MockSerialError::SimulatedError)));
        assert!(mock.flush().is_err());
        assert!(mock.written_data().is_empty()); // Nothing should be written

        mock.set_read_data(b"test data");
        mock.set_read_error(true);
        let mut buffer = [0u8; 10];
        assert!(mock.read(&mut buffer).is_err());

        mock.set_probe_error(true);
        assert!(mock.probe().is_err());
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(MockSerialError::Timeout.kind(), embedded_io::ErrorKind::TimedOut));
        assert!(matches!(MockSerialError::SimulatedError.kind(), embedded_io::ErrorKind::Other));
    }

    #[test]
    fn test_device_answers_reads() {
        let mut device = MockDevice::new(0x01);
        let reply = device.respond(&[0x01, 0x03, 0x00, 0x0B, 0x00, 0x01, 0xF5, 0xC8]);
        let mut expected = vec![0x01, 0x03, 0x02, 0x14, 0x55];
        expected.extend_from_slice(&crc16_bytes(&expected.clone()));
        assert_eq!(reply, expected);
    }

    #[test]
    fn test_device_ignores_other_addresses() {
        let mut device = MockDevice::new(0x02);
        assert!(device.respond(&[0x01, 0x03, 0x00, 0x0B, 0x00, 0x01, 0xF5, 0xC8]).is_empty());
    }

    #[test]
    fn test_device_raises_exceptions() {
        let mut device = MockDevice::new(0x01);
        let mut request = vec![0x01, 0x03, 0x00, 0x0C, 0x00, 0x02];
        request.extend_from_slice(&crc16_bytes(&request.clone()));
        let reply = device.respond(&request);
        assert_eq!(&reply[..3], &[0x01, 0x83, 0x02]);
        assert!(verify(&reply));
    }
}
