//! Ms5805 pressure and temperature sensor driver
//!
//! Generic over an [`embedded-hal`] I2C connector and a millisecond delay.
//! Factory calibration is read from the device PROM and checked on first use,
//! then cached for the lifetime of the driver.
//!
//! ```ignore
//! let mut sensor = Ms5805::new(i2c, delay);
//!
//! sensor.reset()?;
//! sensor.set_resolution(Resolution::Osr4096);
//!
//! let m = sensor.read_temperature_and_pressure()?;
//! println!("{:.2} C {:.2} mbar", m.temp, m.pressure);
//! ```
//!
//! Connector errors must implement [`BusError`] so the driver can tell a
//! missing device from any other transfer failure.
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal
//!
//! Copyright 2019 Ryan Kurte

use core::fmt::Debug;
use core::marker::PhantomData;

extern crate embedded_hal;
use embedded_hal::blocking::{delay::DelayMs, i2c};

#[macro_use]
extern crate log;

pub mod device;
use device::*;

pub mod base;
use base::*;

pub mod calibration;
use calibration::*;

pub mod compensation;

#[cfg(test)]
mod testing;

pub use device::Resolution;
pub use base::BusError;
pub use calibration::Coefficients;


/// Ms5805 sensor object
/// This is generic over an I2C connector, a delay and the associated error type
pub struct Ms5805<Conn, Delay, Err> {
    conn: Conn,
    delay: Delay,
    resolution: Resolution,
    prom: Prom,
    _err: PhantomData<Err>,
}

/// Ms5805 error object
#[derive(Debug, PartialEq)]
pub enum Error<ConnErr> {
    /// Device did not acknowledge its address
    NoAcknowledge(ConnErr),
    /// Any other connector failure
    Conn(ConnErr),
    /// Conversion returned a zero reading
    NoConversion,
    /// PROM CRC mismatch (computed, stored)
    Crc(u8, u8),
}

/// Error classes reported by the driver
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ErrorKind {
    NoAcknowledge,
    Transfer,
    Crc,
}

impl <ConnErr> Error<ConnErr> {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoAcknowledge(_) => ErrorKind::NoAcknowledge,
            Error::Conn(_) | Error::NoConversion => ErrorKind::Transfer,
            Error::Crc(..) => ErrorKind::Crc,
        }
    }
}

impl <ConnErr: BusError> From<ConnErr> for Error<ConnErr> {
    fn from(conn_err: ConnErr) -> Self {
        if conn_err.is_no_acknowledge() {
            Error::NoAcknowledge(conn_err)
        } else {
            Error::Conn(conn_err)
        }
    }
}

/// Ms5805 measurement object
#[derive(PartialEq, Clone, Debug)]
pub struct Measurement {
    /// Temperature in degrees celsius
    /// Range: -40 - 85 C
    pub temp: f32,
    /// Pressure in millibar
    /// Range: 300 - 1200 mbar
    pub pressure: f32,
}


impl <Conn, Delay, Err> Ms5805 <Conn, Delay, Err> where
    Conn: i2c::Read<Error=Err> + i2c::Write<Error=Err>,
    Delay: DelayMs<u32>,
    Err: BusError,
{
    /// Create a new Ms5805 sensor instance
    /// No bus traffic occurs until the first command.
    pub fn new(conn: Conn, delay: Delay) -> Self {
        Ms5805{ conn, delay, resolution: Resolution::default(), prom: Prom::new(), _err: PhantomData }
    }

    /// Check whether the device acknowledges its address
    pub fn is_connected(&mut self) -> bool {
        self.conn.probe()
    }

    /// Reset the device, reloading its PROM into internal registers
    pub fn reset(&mut self) -> Result<(), Error<Err>> {
        self.conn.write_command(Command::Reset)
    }

    /// Set the ADC resolution used for subsequent conversions
    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Fetch calibration coefficients, if they have been loaded
    pub fn calibration(&self) -> Option<Coefficients> {
        self.prom.coefficients()
    }

    /// Drop cached calibration, the next measurement reads the PROM again
    pub fn reload_calibration(&mut self) {
        self.prom.invalidate();
    }

    /// Read compensated temperature and pressure
    /// Calibration is loaded and checked on the first call.
    pub fn read_temperature_and_pressure(&mut self) -> Result<Measurement, Error<Err>> {
        let coefficients = self.prom.ensure_loaded(&mut self.conn)?;

        let raw_temperature = self.read_raw(Command::ConvertTemperature(self.resolution))?;
        let raw_pressure = self.read_raw(Command::ConvertPressure(self.resolution))?;

        if raw_temperature == 0 || raw_pressure == 0 {
            warn!("Empty conversion (temperature: {} pressure: {})", raw_temperature, raw_pressure);
            return Err(Error::NoConversion);
        }

        let m = compensation::compensate(raw_temperature, raw_pressure, &coefficients);

        debug!("Raw D1: {} D2: {} -> {:?}", raw_pressure, raw_temperature, m);

        Ok(m)
    }

    /// Release the underlying connector and delay
    pub fn release(self) -> (Conn, Delay) {
        (self.conn, self.delay)
    }

    /// Start a conversion and read back the 24-bit result
    fn read_raw(&mut self, command: Command) -> Result<u32, Error<Err>> {
        self.conn.write_command(command)?;

        self.delay.delay_ms(self.resolution.conversion_time_ms());

        // ADC is 24-bit big endian, stored in the low bytes
        let mut buff = [0u8; 4];
        self.conn.read_command(Command::AdcRead, &mut buff[1..])?;

        Ok(u32::from_be_bytes(buff))
    }
}

impl <Conn, Delay, Err> Debug for Ms5805 <Conn, Delay, Err> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("Ms5805")
            .field("resolution", &self.resolution)
            .field("prom", &self.prom)
            .finish()
    }
}
