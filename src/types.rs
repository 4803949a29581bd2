//! This module contains types for the values held by some of the DPH5005 registers.

use strum_macros::EnumIter;

use crate::{
    error::{Error, Result},
    register::Register,
};

/// Used to be less ambiguous about whether something is on or off.
#[repr(u16)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter)]
pub enum State {
    /// Disabled.
    #[default]
    Off = 0x00,
    /// Enabled.
    On = 0x01,
}

impl From<State> for bool {
    fn from(value: State) -> Self {
        match value {
            State::Off => false,
            State::On => true,
        }
    }
}

impl From<bool> for State {
    fn from(value: bool) -> Self {
        match value {
            true => State::On,
            false => State::Off,
        }
    }
}

impl From<State> for u16 {
    fn from(value: State) -> Self {
        value as u16
    }
}

impl State {
    /// Interpret the raw value of an on/off register such as `LOCK` or `ON/OFF`.
    pub fn from_register(register: Register, value: u16) -> Result<Self> {
        match value {
            0x00 => Ok(State::Off),
            0x01 => Ok(State::On),
            _ => Err(Error::InvalidValue { register, value }),
        }
    }
}

/// Represents the two possible power supply control modes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum ControlMode {
    /// Constant voltage regulation mode.
    Cv = 0x00,
    /// Constant current regulation mode.
    Cc = 0x01,
}

impl TryFrom<u16> for ControlMode {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0x00 => Ok(ControlMode::Cv),
            0x01 => Ok(ControlMode::Cc),
            _ => Err(Error::InvalidValue {
                register: Register::CvCc,
                value,
            }),
        }
    }
}

/// "Protection status register".
#[repr(u16)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter)]
pub enum Protection {
    /// 0: No protection tripped.
    #[default]
    None = 0x00,
    /// 1: OVP overvoltage protection.
    OverVoltage = 0x01,
    /// 2: OCP overcurrent protection.
    OverCurrent = 0x02,
    /// 3: OPP over-power protection.
    OverPower = 0x03,
}

impl TryFrom<u16> for Protection {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        use Protection as P;
        match value {
            0x00 => Ok(P::None),
            0x01 => Ok(P::OverVoltage),
            0x02 => Ok(P::OverCurrent),
            0x03 => Ok(P::OverPower),
            _ => Err(Error::InvalidValue {
                register: Register::Protect,
                value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn protection_conversions() {
        // Converting between u16 and Protection is the same in both directions.
        for status in Protection::iter() {
            assert_eq!(Protection::try_from(status as u16), Ok(status));
        }
        assert!(Protection::try_from(4_u16).is_err());
    }

    #[test]
    fn control_mode_conversions() {
        for mode in ControlMode::iter() {
            assert_eq!(ControlMode::try_from(mode as u16), Ok(mode));
        }
        assert_eq!(
            ControlMode::try_from(7_u16),
            Err(Error::InvalidValue {
                register: Register::CvCc,
                value: 7
            })
        );
    }

    #[test]
    fn state_conversions() {
        for state in State::iter() {
            assert_eq!(State::from_register(Register::Lock, state.into()), Ok(state));
            assert_eq!(State::from(bool::from(state)), state);
        }
        assert!(State::from_register(Register::OnOff, 2).is_err());
    }
}
