//! Turning raw replies back into register values.

use crate::{
    codec::{Command, Mode, Request, Values},
    crc,
    register::{self, REGISTER_COUNT, Register},
};

/// A decoded, CRC-checked reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub address: u8,
    pub mode: Mode,
    /// Registers covered by the reply, in protocol order.
    pub registers: heapless::Vec<Register, REGISTER_COUNT>,
    /// One value per entry of `registers`.
    pub data: Values,
}

impl Response {
    /// Value of one register, if the reply covers it.
    pub fn get(&self, register: Register) -> Option<u16> {
        self.registers
            .iter()
            .position(|r| *r == register)
            .and_then(|i| self.data.get(i).copied())
    }

    /// `(register, value)` pairs in protocol order.
    pub fn iter(&self) -> impl Iterator<Item = (Register, u16)> + '_ {
        self.registers.iter().copied().zip(self.data.iter().copied())
    }
}

/// Result of one round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Valid(Response),
    /// The reply was missing, short, corrupted or didn't match the request.
    Invalid { mode: Mode },
}

impl Outcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub const fn mode(&self) -> Mode {
        match self {
            Self::Valid(response) => response.mode,
            Self::Invalid { mode } => *mode,
        }
    }

    pub fn valid(self) -> Option<Response> {
        match self {
            Self::Valid(response) => Some(response),
            Self::Invalid { .. } => None,
        }
    }
}

/// Decode the reply to `command`.
///
/// Never panics: anything that isn't exactly the reply a correct device would send comes back as
/// [`Outcome::Invalid`].
pub fn decode(command: &Command, response: &[u8]) -> Outcome {
    let mode = command.mode();
    let invalid = Outcome::Invalid { mode };

    if !crc::verify(response) {
        log::warn!("Rejected {mode} response with bad CRC: {response:02X?}");
        return invalid;
    }

    if let [_, function, code, ..] = *response {
        if function == mode.function_code() | 0x80 {
            log::warn!("Device rejected {mode} request with exception code {code:#04X}");
            return invalid;
        }
    }

    let expected = match command.encode() {
        Ok(encoded) => encoded.expected,
        Err(_) => return invalid,
    };
    if !expected.accepts(response) {
        log::warn!(
            "Rejected {mode} response of unexpected shape: {response:02X?}, expected {:02X?}",
            expected.fixed_fields()
        );
        return invalid;
    }

    // Address and function code are known to match the command from here on.
    let payload = &response[2..response.len() - 2];
    match decode_payload(command.request(), payload) {
        Some((registers, data)) => {
            for (register, value) in registers.iter().zip(data.iter()) {
                log::trace!("{register} = {value}");
            }
            Outcome::Valid(Response {
                address: command.address(),
                mode,
                registers,
                data,
            })
        }
        None => {
            log::warn!("Could not decode {mode} response: {response:02X?}");
            invalid
        }
    }
}

fn decode_payload(
    request: &Request,
    payload: &[u8],
) -> Option<(heapless::Vec<Register, REGISTER_COUNT>, Values)> {
    match request {
        Request::Read { start, .. } => {
            let (&byte_count, words) = payload.split_first()?;
            let count = u16::from(byte_count / 2);
            let registers = register::window(*start, count).ok()?;
            let mut data = Values::new();
            for word in words.chunks_exact(2).take(registers.len()) {
                data.push(u16::from_be_bytes([word[0], word[1]])).ok()?;
            }
            if data.len() != registers.len() {
                return None;
            }
            Some((heapless::Vec::from_slice(registers).ok()?, data))
        }
        Request::SingleWrite { .. } => {
            let [a0, a1, v0, v1] = *payload else {
                return None;
            };
            let register = Register::from_address_bytes([a0, a1]).ok()?;
            let mut registers = heapless::Vec::new();
            registers.push(register).ok()?;
            let mut data = Values::new();
            data.push(u16::from_be_bytes([v0, v1])).ok()?;
            Some((registers, data))
        }
        Request::MultipleWrite { values, .. } => {
            let [a0, a1, c0, c1] = *payload else {
                return None;
            };
            let start = Register::from_address_bytes([a0, a1]).ok()?;
            let count = u16::from_be_bytes([c0, c1]);
            let registers = register::window(start, count).ok()?;
            // The device only confirms where it wrote; what it wrote comes from the request.
            let data = Values::from_slice(values.get(..registers.len())?).ok()?;
            Some((heapless::Vec::from_slice(registers).ok()?, data))
        }
    }
}
