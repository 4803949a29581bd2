//! Conversions between raw register values and physical units.
//!
//! The DPH5005 stores every quantity as a scaled integer. The number of implied decimal places is the
//! register's [precision](crate::register::Register::precision), e.g. `V-SET` = `1234` means 12.34V.

use crate::{
    error::{Error, Result},
    register::Register,
};

/// Convert a raw register value to the value the device shows on its display.
pub fn to_display(register: Register, raw: u16) -> f64 {
    raw as f64 / 10f64.powi(register.precision() as i32)
}

/// Convert a raw register value into thousandths of its unit (mV, mA, mW).
///
/// Registers with more than three decimal places don't exist on this device; their raw value is returned as is.
#[inline]
pub const fn to_milli(register: Register, raw: u16) -> u32 {
    (raw as u32) * milli_factor(register)
}

/// Convert thousandths of a unit (mV, mA, mW) into a raw register value.
///
/// Sub-resolution remainders are truncated, like the front panel does.
pub fn from_milli(register: Register, milli: u32) -> Result<u16> {
    u16::try_from(milli / milli_factor(register)).map_err(|_| Error::OutOfRange {
        register,
        value: milli,
    })
}

const fn milli_factor(register: Register) -> u32 {
    match register.precision() {
        0 => 1000,
        1 => 100,
        2 => 10,
        _ => 1,
    }
}
