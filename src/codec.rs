//! Building request frames, and the frames a well-behaved device must answer them with.
//!
//! The protocol carries no transaction ID, so the only way to pair a reply with its request is by shape:
//! a reply is accepted if it has exactly the expected length, repeats the fixed fields of the request and
//! carries a valid CRC. [`Command::encode`] therefore produces the outgoing [`Frame`] and its
//! [`ExpectedResponse`] together, both from the same [`Request`] variant.

use core::str::FromStr;

use strum_macros::{Display, EnumIter, FromRepr, IntoStaticStr};

use crate::{
    crc::crc16_bytes,
    error::{Error, Result},
    register::{self, REGISTER_COUNT, Register},
};

/// Largest Modbus RTU frame (ADU).
pub const MAX_FRAME_LEN: usize = 256;

/// Raw bytes of a frame, CRC included.
pub type Frame = heapless::Vec<u8, MAX_FRAME_LEN>;

/// Register values carried by a multi-register request or a decoded reply.
pub type Values = heapless::Vec<u16, REGISTER_COUNT>;

/// Modbus function code used for each supported operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, EnumIter, FromRepr, IntoStaticStr)]
#[repr(u8)]
pub enum Mode {
    /// Read holding registers.
    #[strum(to_string = "read")]
    Read = 0x03,
    /// Write single register.
    #[strum(to_string = "single_write")]
    SingleWrite = 0x06,
    /// Write multiple registers.
    #[strum(to_string = "multiple_write")]
    MultipleWrite = 0x10,
}

impl Mode {
    pub const fn function_code(self) -> u8 {
        self as u8
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "read" => Ok(Self::Read),
            "single_write" => Ok(Self::SingleWrite),
            "multiple_write" => Ok(Self::MultipleWrite),
            other => Err(Error::UnsupportedMode(other.to_owned())),
        }
    }
}

impl TryFrom<u8> for Mode {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        Self::from_repr(code).ok_or_else(|| Error::UnsupportedMode(format!("{code:#04X}")))
    }
}

/// Which registers a request addresses.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Target {
    /// One register.
    Single(Register),
    /// `count` consecutive registers starting at the given one.
    Span(Register, u16),
}

impl Target {
    /// Resolve names, e.g. `Target::named("V-SET", Some(2))`.
    pub fn named(name: &str, count: Option<u16>) -> Result<Self> {
        let register = register::lookup(name)?.register;
        Ok(match count {
            Some(count) => Self::Span(register, count),
            None => Self::Single(register),
        })
    }

    pub const fn start(&self) -> Register {
        match *self {
            Self::Single(register) | Self::Span(register, _) => register,
        }
    }

    pub const fn count(&self) -> u16 {
        match *self {
            Self::Single(_) => 1,
            Self::Span(_, count) => count,
        }
    }
}

impl From<Register> for Target {
    fn from(register: Register) -> Self {
        Self::Single(register)
    }
}

impl From<(Register, u16)> for Target {
    fn from((start, count): (Register, u16)) -> Self {
        Self::Span(start, count)
    }
}

/// One operation against the register table, validated so that it can always be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Read { start: Register, count: u16 },
    SingleWrite { register: Register, value: u16 },
    MultipleWrite { start: Register, values: Values },
}

impl Request {
    /// Build a request from loosely typed caller input.
    ///
    /// `data` is ignored for reads, must hold exactly one value for a single write and one value per
    /// register for a multiple write.
    pub fn new(mode: Mode, target: impl Into<Target>, data: &[u16]) -> Result<Self> {
        let target = target.into();
        match mode {
            Mode::Read => Self::read(target.start(), target.count()),
            Mode::SingleWrite => {
                if target.count() != 1 {
                    return Err(Error::DataLength {
                        expected: 1,
                        actual: target.count() as usize,
                    });
                }
                match data {
                    [value] => Ok(Self::single_write(target.start(), *value)),
                    _ => Err(Error::DataLength {
                        expected: 1,
                        actual: data.len(),
                    }),
                }
            }
            Mode::MultipleWrite => {
                if data.len() != target.count() as usize {
                    return Err(Error::DataLength {
                        expected: target.count() as usize,
                        actual: data.len(),
                    });
                }
                Self::multiple_write(target.start(), data)
            }
        }
    }

    pub fn read(start: Register, count: u16) -> Result<Self> {
        register::window(start, count)?;
        Ok(Self::Read { start, count })
    }

    pub fn single_write(register: Register, value: u16) -> Self {
        Self::SingleWrite { register, value }
    }

    pub fn multiple_write(start: Register, values: &[u16]) -> Result<Self> {
        let count = u16::try_from(values.len()).map_err(|_| Error::SpanOutOfRange {
            start,
            count: u16::MAX,
        })?;
        register::window(start, count)?;
        let values = Values::from_slice(values).map_err(|_| Error::SpanOutOfRange { start, count })?;
        Ok(Self::MultipleWrite { start, values })
    }

    pub const fn mode(&self) -> Mode {
        match self {
            Self::Read { .. } => Mode::Read,
            Self::SingleWrite { .. } => Mode::SingleWrite,
            Self::MultipleWrite { .. } => Mode::MultipleWrite,
        }
    }

    /// First register addressed by this request.
    pub const fn start(&self) -> Register {
        match *self {
            Self::Read { start, .. } => start,
            Self::SingleWrite { register, .. } => register,
            Self::MultipleWrite { start, .. } => start,
        }
    }

    /// Number of registers addressed by this request.
    pub fn count(&self) -> u16 {
        match self {
            Self::Read { count, .. } => *count,
            Self::SingleWrite { .. } => 1,
            // Bounded by REGISTER_COUNT on construction.
            Self::MultipleWrite { values, .. } => values.len() as u16,
        }
    }

    /// Registers addressed by this request, in order.
    pub fn registers(&self) -> Result<&'static [Register]> {
        register::window(self.start(), self.count())
    }
}

/// The shape of the reply a correct device sends for a request.
///
/// Bytes that aren't known before the reply arrives (the register values of a read) are zero
/// placeholders and are skipped by [`ExpectedResponse::accepts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedResponse {
    bytes: Frame,
    /// Length of the leading part of `bytes` that a reply must reproduce exactly.
    fixed_len: usize,
}

impl ExpectedResponse {
    /// Total length of the reply, CRC included.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The template itself: fixed fields, placeholders and a CRC over both.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Fields every accepted reply starts with.
    pub fn fixed_fields(&self) -> &[u8] {
        &self.bytes[..self.fixed_len]
    }

    /// Whether `response` has the expected length and fixed fields. The CRC isn't checked here.
    pub fn accepts(&self, response: &[u8]) -> bool {
        response.len() == self.len() && response.starts_with(self.fixed_fields())
    }
}

/// An encoded command ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub frame: Frame,
    pub expected: ExpectedResponse,
}

/// A [`Request`] addressed to one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    address: u8,
    request: Request,
}

impl Command {
    pub fn new(address: u8, request: Request) -> Result<Self> {
        if !register::DEVICE_ADDRESSES.contains(&address) {
            return Err(Error::InvalidDeviceAddress(address));
        }
        Ok(Self { address, request })
    }

    pub const fn address(&self) -> u8 {
        self.address
    }

    pub const fn request(&self) -> &Request {
        &self.request
    }

    pub const fn mode(&self) -> Mode {
        self.request.mode()
    }

    /// Build the request frame and the expected reply.
    pub fn encode(&self) -> Result<Encoded> {
        let header = [self.address, self.mode().function_code()];
        let mut frame = Frame::new();
        let mut expected = Frame::new();
        push(&mut frame, &header)?;
        push(&mut expected, &header)?;

        match &self.request {
            Request::Read { start, count } => {
                push(&mut frame, &start.address_bytes())?;
                push(&mut frame, &count.to_be_bytes())?;

                // Byte count field, then one placeholder word per register.
                let byte_count = byte_count(*count)?;
                push(&mut expected, &[byte_count])?;
                for _ in 0..byte_count {
                    push(&mut expected, &[0x00])?;
                }
            }
            Request::SingleWrite { register, value } => {
                // The device echoes a single write verbatim.
                for out in [&mut frame, &mut expected] {
                    push(out, &register.address_bytes())?;
                    push(out, &value.to_be_bytes())?;
                }
            }
            Request::MultipleWrite { start, values } => {
                let count = self.request.count();
                for out in [&mut frame, &mut expected] {
                    push(out, &start.address_bytes())?;
                    push(out, &count.to_be_bytes())?;
                }
                push(&mut frame, &[byte_count(count)?])?;
                for value in values {
                    push(&mut frame, &value.to_be_bytes())?;
                }
            }
        }

        let fixed_len = match self.request {
            // Header and byte count.
            Request::Read { .. } => 3,
            _ => expected.len(),
        };

        let crc = crc16_bytes(&frame);
        push(&mut frame, &crc)?;
        let crc = crc16_bytes(&expected);
        push(&mut expected, &crc)?;

        Ok(Encoded {
            frame,
            expected: ExpectedResponse {
                bytes: expected,
                fixed_len,
            },
        })
    }
}

/// Build the frame and expected reply for one operation.
pub fn encode(address: u8, mode: Mode, target: impl Into<Target>, data: &[u16]) -> Result<Encoded> {
    Command::new(address, Request::new(mode, target, data)?)?.encode()
}

fn byte_count(count: u16) -> Result<u8> {
    count
        .checked_mul(2)
        .and_then(|bytes| u8::try_from(bytes).ok())
        .ok_or(Error::FrameOverflow)
}

fn push(frame: &mut Frame, bytes: &[u8]) -> Result<()> {
    frame
        .extend_from_slice(bytes)
        .map_err(|_| Error::FrameOverflow)
}
