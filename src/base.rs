//! Base communication implementation for interacting with Ms5805 device
//!
//! Copyright 2019 Ryan Kurte

use core::fmt::Debug;
use std::io;

use embedded_hal::blocking::i2c;

use crate::{Error};
use crate::device::*;

/// `errno` reported by linux i2c adapters when the address is not acknowledged
const ENXIO: i32 = 6;
const EREMOTEIO: i32 = 121;

/// Classification of connector errors
/// Connectors only tell us whether the peripheral acknowledged its address,
/// everything else is reported as a generic transfer error.
pub trait BusError: Debug {
    /// Whether this error means the peripheral did not acknowledge
    fn is_no_acknowledge(&self) -> bool;
}

impl BusError for io::Error {
    fn is_no_acknowledge(&self) -> bool {
        match self.raw_os_error() {
            Some(ENXIO) | Some(EREMOTEIO) => true,
            _ => self.kind() == io::ErrorKind::AddrNotAvailable,
        }
    }
}

impl BusError for () {
    fn is_no_acknowledge(&self) -> bool {
        false
    }
}

#[cfg(test)]
impl BusError for embedded_hal_mock::MockError {
    fn is_no_acknowledge(&self) -> bool {
        matches!(self, embedded_hal_mock::MockError::Io(io::ErrorKind::AddrNotAvailable))
    }
}

/// Base API for reading and writing to the device
/// This should not be required by consumers, but is exposed to support alternate use
pub trait Base<Err> {
    /// Write a single command byte to the device
    fn write_command(&mut self, command: Command) -> Result<(), Error<Err>>;
    /// Read raw bytes from the device
    fn read_bytes(&mut self, data: &mut [u8]) -> Result<(), Error<Err>>;
    /// Write a command then read its response
    fn read_command(&mut self, command: Command, data: &mut [u8]) -> Result<(), Error<Err>>;
    /// Check whether the device acknowledges its address
    fn probe(&mut self) -> bool;
}

/// Base implementation for I2C devices
impl <Conn, Err> Base<Err> for Conn where
    Conn: i2c::Read<Error=Err> + i2c::Write<Error=Err>,
    Err: BusError,
{
    fn write_command(&mut self, command: Command) -> Result<(), Error<Err>> {
        let c: u8 = command.into();

        trace!("Writing command: 0x{:02x}", c);

        self.write(DEFAULT_ADDRESS, &[c]).map_err(Error::from)
    }

    fn read_bytes(&mut self, data: &mut [u8]) -> Result<(), Error<Err>> {
        self.read(DEFAULT_ADDRESS, data).map_err(Error::from)?;

        trace!("Read data: {:x?}", data);

        Ok(())
    }

    fn read_command(&mut self, command: Command, data: &mut [u8]) -> Result<(), Error<Err>> {
        // Select the source, then clock out the response in a separate transfer
        self.write_command(command)?;
        self.read_bytes(data)
    }

    fn probe(&mut self) -> bool {
        let res = self.write(DEFAULT_ADDRESS, &[]);

        trace!("Probe result: {:?}", res);

        res.is_ok()
    }
}
