//! This crate provides an interface for communicating with and controlling the DPH5005 programmable buck power supply.
//!
//! It speaks the Modbus RTU subset the DPH5005 understands: function 0x03 (read holding registers), 0x06 (write single
//! register) and 0x10 (write multiple registers), over the 13 holding registers at addresses 0x00-0x0C.
//!
//! The crate is split in layers:
//! * [`register`] is the register catalog, and [`scaling`] converts raw values to physical units.
//! * [`codec`] builds request frames together with the reply each one should get, checksummed by [`crc`].
//! * [`session`] owns the serial connection and serializes round trips, and [`parser`] decodes replies.
//! * [`psu`] puts a typed driver, [`Dph5005`](psu::Dph5005), on top.
//!
//! The serial port used for PSU comms should be configured like so:
//! * Default baud rate: 9600
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None
//!
//! ```no_run
//! use dph5005::{psu::{DEFAULT_DEVICE_ADDRESS, Dph5005}, serial::SerialConnector};
//!
//! let psu = Dph5005::new(SerialConnector::default(), DEFAULT_DEVICE_ADDRESS)?;
//! if psu.connect("/dev/ttyUSB0") {
//!     psu.set_output_limits(12_000, 500)?;
//!     psu.set_output_state(true)?;
//!     println!("{}mV", psu.read_output_voltage_mv()?);
//! }
//! # Ok::<(), dph5005::error::Error>(())
//! ```

pub mod codec;
pub mod crc;
pub mod error;
pub mod parser;
pub mod psu;
pub mod register;
pub mod scaling;
#[cfg(feature = "serial")]
pub mod serial;
pub mod session;
pub mod types;

#[cfg(test)]
mod mock_serial;
