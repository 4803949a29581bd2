//! Our error types for the DPH5005.
//!
//! Only caller misuse is reported through [`Error`]. Transient conditions on the serial link (a port
//! that won't open, an unplugged cable, a corrupted or missing reply) never surface here, they degrade
//! to `false` or to an [`Outcome::Invalid`](crate::parser::Outcome::Invalid) instead.

use thiserror::Error;

use crate::{codec::Mode, register::Register};

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error type for DPH5005 communications.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown register name: {0:?}")]
    UnknownRegister(String),
    #[error("Unknown register address: {0:#06X}")]
    UnknownAddress(u16),
    #[error("Unsupported mode: {0:?}")]
    UnsupportedMode(String),
    #[error("Register span must cover at least one register")]
    EmptySpan,
    #[error("Span of {count} registers starting at {start} runs past the end of the register table")]
    SpanOutOfRange { start: Register, count: u16 },
    #[error("Expected {expected} data value(s), got {actual}")]
    DataLength { expected: usize, actual: usize },
    #[error("Invalid device address {0}, must be 1-255")]
    InvalidDeviceAddress(u8),
    #[error("Value {value} is outside the valid range of {register}")]
    OutOfRange { register: Register, value: u32 },
    #[error("Value {value} is not a valid {register} setting")]
    InvalidValue { register: Register, value: u16 },
    #[error("Frame does not fit in the transmit buffer")]
    FrameOverflow,
    #[error("No valid response received for {0} request")]
    InvalidResponse(Mode),
}
