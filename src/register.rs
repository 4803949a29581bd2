//! This module is used to define the registers on the DPH5005.
//!
//! Registers are identified by name on the caller side and by a 2-byte address on the wire. Their
//! declaration order is also significant: a multi-register read or write always covers a contiguous
//! run of registers in [`ORDER`], starting from some register and walking forward.

use core::ops::RangeInclusive;

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumCount as EnumCountMacro, EnumIter, EnumString, FromRepr, IntoStaticStr};

use crate::error::{Error, Result};

/// Number of registers exposed by the device.
pub const REGISTER_COUNT: usize = <Register as strum::EnumCount>::COUNT;

/// Valid Modbus unit IDs for the device. `0` is the broadcast address and never answers.
pub const DEVICE_ADDRESSES: RangeInclusive<u8> = 1..=255;

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumCountMacro,
    EnumIter,
    EnumString,
    FromRepr,
    IntoStaticStr,
)]
#[repr(u16)]
pub enum Register {
    /// __R/W__ - Voltage setting.
    ///
    /// Value is u16 in centi-volts. E.g. 5.0V => `500`.
    #[strum(to_string = "V-SET")]
    VSet = 0x0000,
    /// __R/W__ - Current setting.
    ///
    /// Value is u16 in milli-amps. E.g. 1.5A => `1500`.
    #[strum(to_string = "I-SET")]
    ISet = 0x0001,
    /// __R__ - Output voltage display value.
    #[strum(to_string = "V-OUT")]
    VOut = 0x0002,
    /// __R__ - Output current display value.
    #[strum(to_string = "I-OUT")]
    IOut = 0x0003,
    /// __R__ - Output power display value.
    #[strum(to_string = "POWER")]
    Power = 0x0004,
    /// __R__ - Input voltage display value.
    #[strum(to_string = "V-IN")]
    VIn = 0x0005,
    /// __R/W__ - Key lock.
    /// * `0` - Unlocked.
    /// * `1` - Locked.
    #[strum(to_string = "LOCK")]
    Lock = 0x0006,
    /// __R/W__ - Protect status.
    ///
    /// See [`Protection`](crate::types::Protection) for possible protection statuses.
    #[strum(to_string = "PROTECT")]
    Protect = 0x0007,
    /// __R__ - Constant voltage constant current state.
    ///
    /// See [`ControlMode`](crate::types::ControlMode).
    #[strum(to_string = "CV/CC")]
    CvCc = 0x0008,
    /// __R/W__ - Switched output.
    /// * `0` - Output off.
    /// * `1` - Output on.
    #[strum(to_string = "ON/OFF")]
    OnOff = 0x0009,
    /// __R/W__ - Backlight brightness level.
    ///
    /// Range = 0-5.
    #[strum(to_string = "B-LED")]
    BLed = 0x000A,
    /// __R__ - Product model. The DPH5005 reports `5205`.
    #[strum(to_string = "MODEL")]
    Model = 0x000B,
    /// __R__ - Firmware version number.
    #[strum(to_string = "VERSION")]
    Version = 0x000C,
}

/// Whether the host may write a register.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// Static description of one register, as returned by [`lookup`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RegisterInfo {
    pub register: Register,
    pub address: u16,
    /// Digits after the decimal point of the displayed value.
    pub precision: u8,
    /// Inclusive range in display units, if the register has one.
    pub range: Option<(u16, u16)>,
    pub access: Access,
}

/// Every register in protocol order.
pub const ORDER: [Register; REGISTER_COUNT] = [
    Register::VSet,
    Register::ISet,
    Register::VOut,
    Register::IOut,
    Register::Power,
    Register::VIn,
    Register::Lock,
    Register::Protect,
    Register::CvCc,
    Register::OnOff,
    Register::BLed,
    Register::Model,
    Register::Version,
];

impl Register {
    /// Name used on the caller side, e.g. `"V-SET"`.
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub const fn address(self) -> u16 {
        self as u16
    }

    pub const fn address_bytes(self) -> [u8; 2] {
        self.address().to_be_bytes()
    }

    /// Position of this register in [`ORDER`].
    pub const fn ordinal(self) -> usize {
        match self {
            Self::VSet => 0,
            Self::ISet => 1,
            Self::VOut => 2,
            Self::IOut => 3,
            Self::Power => 4,
            Self::VIn => 5,
            Self::Lock => 6,
            Self::Protect => 7,
            Self::CvCc => 8,
            Self::OnOff => 9,
            Self::BLed => 10,
            Self::Model => 11,
            Self::Version => 12,
        }
    }

    pub const fn precision(self) -> u8 {
        match self {
            Self::VSet | Self::VOut | Self::Power | Self::VIn => 2,
            Self::ISet | Self::IOut => 3,
            _ => 0,
        }
    }

    /// Inclusive range of valid values in display units (volts, amps, ...).
    ///
    /// This is advisory: the frame codec sends whatever it is given.
    pub const fn range(self) -> Option<(u16, u16)> {
        match self {
            Self::VSet => Some((0, 50)),
            Self::ISet => Some((0, 5)),
            Self::Lock | Self::OnOff => Some((0, 1)),
            Self::BLed => Some((0, 5)),
            _ => None,
        }
    }

    pub const fn access(self) -> Access {
        match self {
            Self::VSet | Self::ISet | Self::Lock | Self::Protect | Self::OnOff | Self::BLed => {
                Access::ReadWrite
            }
            _ => Access::ReadOnly,
        }
    }

    pub const fn is_writable(self) -> bool {
        matches!(self.access(), Access::ReadWrite)
    }

    pub fn info(self) -> RegisterInfo {
        RegisterInfo {
            register: self,
            address: self.address(),
            precision: self.precision(),
            range: self.range(),
            access: self.access(),
        }
    }

    /// Look a register up by the raw big-endian address echoed in a response.
    pub fn from_address_bytes(bytes: [u8; 2]) -> Result<Self> {
        lookup_by_address(u16::from_be_bytes(bytes))
    }

    /// Check a raw (scaled) value against the declared range of this register.
    ///
    /// `V-SET` has precision 2 and a range of 0-50, so raw values 0-5000 pass.
    pub fn check_raw(self, raw: u16) -> Result<u16> {
        match self.range() {
            Some((min, max)) => {
                let scale = 10u32.pow(self.precision() as u32);
                let raw_wide = raw as u32;
                if raw_wide < min as u32 * scale || raw_wide > max as u32 * scale {
                    Err(Error::OutOfRange {
                        register: self,
                        value: raw_wide,
                    })
                } else {
                    Ok(raw)
                }
            }
            None => Ok(raw),
        }
    }
}

impl From<Register> for u16 {
    fn from(value: Register) -> Self {
        value.address()
    }
}

/// Resolve a register name to its description.
pub fn lookup(name: &str) -> Result<RegisterInfo> {
    name.parse::<Register>()
        .map(Register::info)
        .map_err(|_| Error::UnknownRegister(name.to_owned()))
}

/// Resolve a protocol address back to its register.
pub fn lookup_by_address(address: u16) -> Result<Register> {
    Register::from_repr(address).ok_or(Error::UnknownAddress(address))
}

/// Ordinal of a named register.
pub fn order_index(name: &str) -> Result<usize> {
    lookup(name).map(|info| info.register.ordinal())
}

/// The `count` registers that follow `start` (inclusive) in protocol order.
pub fn window(start: Register, count: u16) -> Result<&'static [Register]> {
    if count == 0 {
        return Err(Error::EmptySpan);
    }
    let from = start.ordinal();
    let to = from + count as usize;
    ORDER
        .get(from..to)
        .ok_or(Error::SpanOutOfRange { start, count })
}

/// Iterate every register in protocol order.
pub fn all() -> impl Iterator<Item = Register> {
    Register::iter()
}
