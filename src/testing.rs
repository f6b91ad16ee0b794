//! Shared fixtures for driver tests

use std::vec;
use std::vec::Vec;

use embedded_hal::blocking::i2c;
use embedded_hal_mock::i2c::Transaction as I2cTransaction;

use crate::calibration::Coefficients;
use crate::device::*;

/// PROM image with a valid CRC nibble, built around the reference coefficients
/// C1..C6 = 46372, 43981, 29059, 27842, 31553, 28165
pub const PROM: [u16; PROM_WORDS] = [0x9B1D, 0xB524, 0xABCD, 0x7183, 0x6CC2, 0x7B41, 0x6E05, 0x0000];

/// Reference ADC readings matching `PROM`
pub const D1: u32 = 6465444;
pub const D2: u32 = 8077636;

pub fn coefficients() -> Coefficients {
    Coefficients::from_prom(&PROM)
}

/// Transactions for a full PROM fetch returning `prom`
pub fn prom_transactions(prom: &[u16; PROM_WORDS]) -> Vec<I2cTransaction> {
    let mut t = Vec::new();
    for (i, w) in prom.iter().enumerate() {
        t.push(I2cTransaction::write(DEFAULT_ADDRESS, vec![0xA0 | ((i as u8) << 1)]));
        t.push(I2cTransaction::read(DEFAULT_ADDRESS, w.to_be_bytes().to_vec()));
    }
    t
}

/// Transactions for a single conversion returning `value`
pub fn conversion_transactions(command: u8, value: u32) -> Vec<I2cTransaction> {
    vec![
        I2cTransaction::write(DEFAULT_ADDRESS, vec![command]),
        I2cTransaction::write(DEFAULT_ADDRESS, vec![0x00]),
        I2cTransaction::read(DEFAULT_ADDRESS, value.to_be_bytes()[1..].to_vec()),
    ]
}

/// Connector wrapper counting bus operations
pub struct Counting<C> {
    pub inner: C,
    pub ops: usize,
}

impl <C> Counting<C> {
    pub fn new(inner: C) -> Self {
        Counting{ inner, ops: 0 }
    }
}

impl <C: i2c::Write> i2c::Write for Counting<C> {
    type Error = C::Error;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.ops += 1;
        self.inner.write(address, bytes)
    }
}

impl <C: i2c::Read> i2c::Read for Counting<C> {
    type Error = C::Error;

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.ops += 1;
        self.inner.read(address, buffer)
    }
}
