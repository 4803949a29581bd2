use crate::{
    codec::{Command, Mode, Request},
    error::{Error, Result},
    parser::{Outcome, Response},
    register::{DEVICE_ADDRESSES, REGISTER_COUNT, Register},
    scaling,
    session::{Connector, Session},
    types::{ControlMode, Protection, State},
};

/// Factory default Modbus unit ID.
pub const DEFAULT_DEVICE_ADDRESS: u8 = 0x01;

/// Model number reported by the `MODEL` register of a DPH5005.
pub const DPH5005_MODEL: u16 = 5205;

/// Every register, as returned by [`Dph5005::read_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub voltage_setpoint_mv: u32,
    pub current_limit_ma: u32,
    pub output_voltage_mv: u32,
    pub output_current_ma: u32,
    pub output_power_mw: u32,
    pub input_voltage_mv: u32,
    pub lock: State,
    pub protection: Protection,
    pub control_mode: ControlMode,
    pub output: State,
    pub backlight: u8,
    pub model: u16,
    pub firmware_version: u16,
}

/// You can create a Dph5005 using any [`Connector`], e.g. a
/// [`SerialConnector`](crate::serial::SerialConnector).
///
/// For its methods, we generally use the nomenclature that "set" means to write a configuration and "get" means to read
/// back a configuration value. Whereas "read" means to get a measured value.
///
/// Setters check values against the register's declared range before anything is sent.
pub struct Dph5005<C: Connector> {
    session: Session<C>,
    /// Default for the device is 0x01.
    address: u8,
}

impl<C: Connector> Dph5005<C> {
    /// Create a new Dph5005 talking to unit `address` through a disconnected session.
    pub fn new(connector: C, address: u8) -> Result<Self> {
        Ok(Self {
            session: Session::new(connector),
            address: Self::check_address(address)?,
        })
    }

    fn check_address(address: u8) -> Result<u8> {
        if DEVICE_ADDRESSES.contains(&address) {
            Ok(address)
        } else {
            Err(Error::InvalidDeviceAddress(address))
        }
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Talk to a different unit on the same bus.
    pub fn set_address(&mut self, address: u8) -> Result<()> {
        self.address = Self::check_address(address)?;
        Ok(())
    }

    pub fn connect(&self, port_name: &str) -> bool {
        self.session.connect(port_name)
    }

    pub fn disconnect(&self) {
        self.session.disconnect()
    }

    pub fn is_alive(&self) -> bool {
        self.session.is_alive()
    }

    /// Return the measured output voltage in millivolts.
    pub fn read_output_voltage_mv(&self) -> Result<u32> {
        self.read_milli(Register::VOut)
    }

    /// Return the measured output current in milliamps.
    pub fn read_output_current_ma(&self) -> Result<u32> {
        self.read_milli(Register::IOut)
    }

    /// Return the measured output power in milliwatts.
    pub fn read_power_mw(&self) -> Result<u32> {
        self.read_milli(Register::Power)
    }

    /// Return the measured supply input voltage in millivolts.
    pub fn read_input_voltage_mv(&self) -> Result<u32> {
        self.read_milli(Register::VIn)
    }

    /// Set the output target voltage. Value supplied in millivolts, 0-50V.
    pub fn set_voltage_setpoint_mv(&self, voltage_mv: u32) -> Result<()> {
        self.write_milli(Register::VSet, voltage_mv)
    }

    /// Get the current output target voltage. Value returned in millivolts.
    pub fn get_voltage_setpoint_mv(&self) -> Result<u32> {
        self.read_milli(Register::VSet)
    }

    /// Set the output current limit. Value supplied in milliamps, 0-5A.
    pub fn set_current_limit_ma(&self, current_ma: u32) -> Result<()> {
        self.write_milli(Register::ISet, current_ma)
    }

    /// Get the current output current limit. Value returned in milliamps.
    pub fn get_current_limit_ma(&self) -> Result<u32> {
        self.read_milli(Register::ISet)
    }

    /// Set voltage and current limit together, in a single write.
    pub fn set_output_limits(&self, voltage_mv: u32, current_ma: u32) -> Result<()> {
        let voltage = Register::VSet.check_raw(scaling::from_milli(Register::VSet, voltage_mv)?)?;
        let current = Register::ISet.check_raw(scaling::from_milli(Register::ISet, current_ma)?)?;
        self.write_bulk(Register::VSet, &[voltage, current])
    }

    /// Enable/disable the key lock.
    pub fn set_lock_state(&self, state: impl Into<State>) -> Result<()> {
        let state: State = state.into();
        self.write_single(Register::Lock, state.into())
    }

    /// Get the current state of the key lock.
    pub fn get_lock_state(&self) -> Result<State> {
        State::from_register(Register::Lock, self.read_single(Register::Lock)?)
    }

    /// Enable/disable the output.
    pub fn set_output_state(&self, state: impl Into<State>) -> Result<()> {
        let state: State = state.into();
        self.write_single(Register::OnOff, state.into())
    }

    /// Read whether the output is enabled or disabled.
    pub fn get_output_state(&self) -> Result<State> {
        State::from_register(Register::OnOff, self.read_single(Register::OnOff)?)
    }

    /// Get the currently active control mode. (CV or CC.)
    pub fn get_control_mode(&self) -> Result<ControlMode> {
        ControlMode::try_from(self.read_single(Register::CvCc)?)
    }

    /// Return which protection has been triggered, if any.
    pub fn get_protection_status(&self) -> Result<Protection> {
        Protection::try_from(self.read_single(Register::Protect)?)
    }

    /// Clear a tripped protection.
    pub fn clear_protection(&self) -> Result<()> {
        self.write_single(Register::Protect, Protection::None as u16)
    }

    /// Set the backlight brightness level.
    ///
    /// 0 is darkest, and 5 is the brightest.
    pub fn set_backlight(&self, level: u8) -> Result<()> {
        let level = Register::BLed.check_raw(level as u16)?;
        self.write_single(Register::BLed, level)
    }

    /// Get the current backlight brightness level.
    pub fn get_backlight(&self) -> Result<u8> {
        let value = self.read_single(Register::BLed)?;
        Register::BLed
            .check_raw(value)
            .map(|level| level as u8)
            .map_err(|_| Error::InvalidValue {
                register: Register::BLed,
                value,
            })
    }

    /// Returns the raw "MODEL" register. A DPH5005 reports [`DPH5005_MODEL`].
    pub fn get_model(&self) -> Result<u16> {
        self.read_single(Register::Model)
    }

    /// Read the current firmware version.
    ///
    /// Decimal value of `16` -> `v1.6`.
    pub fn get_firmware_version(&self) -> Result<u16> {
        self.read_single(Register::Version)
    }

    /// Read every register in one request.
    pub fn read_status(&self) -> Result<Status> {
        let response = self.read_registers(Register::VSet, REGISTER_COUNT as u16)?;
        let value = |register: Register| {
            response
                .get(register)
                .ok_or(Error::InvalidResponse(Mode::Read))
        };
        let milli = |register: Register| value(register).map(|raw| scaling::to_milli(register, raw));

        Ok(Status {
            voltage_setpoint_mv: milli(Register::VSet)?,
            current_limit_ma: milli(Register::ISet)?,
            output_voltage_mv: milli(Register::VOut)?,
            output_current_ma: milli(Register::IOut)?,
            output_power_mw: milli(Register::Power)?,
            input_voltage_mv: milli(Register::VIn)?,
            lock: State::from_register(Register::Lock, value(Register::Lock)?)?,
            protection: Protection::try_from(value(Register::Protect)?)?,
            control_mode: ControlMode::try_from(value(Register::CvCc)?)?,
            output: State::from_register(Register::OnOff, value(Register::OnOff)?)?,
            backlight: value(Register::BLed)? as u8,
            model: value(Register::Model)?,
            firmware_version: value(Register::Version)?,
        })
    }

    /// Read `count` consecutive registers starting at `start`.
    pub fn read_registers(&self, start: Register, count: u16) -> Result<Response> {
        self.run(Request::read(start, count)?)
    }

    /// Read a single register of the device.
    pub fn read_single(&self, register: Register) -> Result<u16> {
        self.read_registers(register, 1)?
            .get(register)
            .ok_or(Error::InvalidResponse(Mode::Read))
    }

    /// Write to a single register of the device.
    pub fn write_single(&self, register: Register, value: u16) -> Result<()> {
        self.run(Request::single_write(register, value)).map(|_| ())
    }

    /// Write to multiple, sequential device registers.
    pub fn write_bulk(&self, start: Register, values: &[u16]) -> Result<()> {
        self.run(Request::multiple_write(start, values)?).map(|_| ())
    }

    /// Read back `expected.len()` registers from `start` and compare.
    ///
    /// A multiple write is only acknowledged with its start and count, so this is the way to confirm the
    /// values landed.
    pub fn verify_bulk(&self, start: Register, expected: &[u16]) -> Result<bool> {
        let response = self.read_registers(start, expected.len() as u16)?;
        Ok(response.data.as_slice() == expected)
    }

    fn run(&self, request: Request) -> Result<Response> {
        let command = Command::new(self.address, request)?;
        match self.session.run_command(&command)? {
            Outcome::Valid(response) => Ok(response),
            Outcome::Invalid { mode } => Err(Error::InvalidResponse(mode)),
        }
    }

    fn read_milli(&self, register: Register) -> Result<u32> {
        Ok(scaling::to_milli(register, self.read_single(register)?))
    }

    fn write_milli(&self, register: Register, milli: u32) -> Result<()> {
        let raw = register.check_raw(scaling::from_milli(register, milli)?)?;
        self.write_single(register, raw)
    }
}
