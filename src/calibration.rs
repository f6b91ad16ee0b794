//! Factory calibration storage and validation
//!
//! The Ms5805 PROM holds eight 16-bit words: a CRC nibble sharing word 0 with
//! factory data, six calibration coefficients, and an unused trailing word.
//! Coefficients are fetched once and reused until explicitly dropped.
//!
//! Copyright 2019 Ryan Kurte

use crate::{Error};
use crate::base::Base;
use crate::device::*;

/// Calibration coefficients decoded from a validated PROM image
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct Coefficients {
    /// Pressure sensitivity (SENS_T1, C1)
    pub pressure_sensitivity: u16,
    /// Pressure offset (OFF_T1, C2)
    pub pressure_offset: u16,
    /// Temperature coefficient of pressure sensitivity (TCS, C3)
    pub temp_coeff_of_pressure_sensitivity: u16,
    /// Temperature coefficient of pressure offset (TCO, C4)
    pub temp_coeff_of_pressure_offset: u16,
    /// Reference temperature (T_REF, C5)
    pub reference_temperature: u16,
    /// Temperature coefficient of the temperature (TEMPSENS, C6)
    pub temp_coeff_of_temperature: u16,
}

impl Coefficients {
    pub fn from_prom(prom: &[u16; PROM_WORDS]) -> Self {
        Coefficients {
            pressure_sensitivity: prom[1],
            pressure_offset: prom[2],
            temp_coeff_of_pressure_sensitivity: prom[3],
            temp_coeff_of_pressure_offset: prom[4],
            reference_temperature: prom[5],
            temp_coeff_of_temperature: prom[6],
        }
    }
}

/// Cached PROM contents
/// Either empty, or holding a complete image that passed the CRC check.
#[derive(PartialEq, Clone, Debug, Default)]
pub struct Prom {
    words: [u16; PROM_WORDS],
    validated: bool,
}

impl Prom {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Validated coefficients, if loaded
    pub fn coefficients(&self) -> Option<Coefficients> {
        if self.validated {
            Some(Coefficients::from_prom(&self.words))
        } else {
            None
        }
    }

    /// Drop the cached image so the next load fetches from the device
    pub fn invalidate(&mut self) {
        self.words = [0u16; PROM_WORDS];
        self.validated = false;
    }

    /// Fetch and validate the PROM unless a validated image is already cached
    pub fn ensure_loaded<Err>(&mut self, conn: &mut impl Base<Err>) -> Result<Coefficients, Error<Err>> {
        if let Some(c) = self.coefficients() {
            return Ok(c);
        }

        debug!("Loading calibration PROM");

        // Read into a scratch image so a failed fetch leaves the store empty
        let mut words = [0u16; PROM_WORDS];
        for (i, w) in words.iter_mut().enumerate() {
            let mut buff = [0u8; 2];
            conn.read_command(Command::PromRead(i as u8), &mut buff)?;
            *w = u16::from_be_bytes(buff);
        }

        let (computed, stored) = (crc4(&words), stored_crc(&words));
        if computed != stored {
            warn!("PROM CRC mismatch (computed: 0x{:x} stored: 0x{:x})", computed, stored);
            return Err(Error::Crc(computed, stored));
        }

        debug!("PROM loaded: {:04x?}", words);

        self.words = words;
        self.validated = true;

        Ok(Coefficients::from_prom(&self.words))
    }
}

/// CRC nibble stored in the top of the first PROM word
pub fn stored_crc(prom: &[u16; PROM_WORDS]) -> u8 {
    ((prom[0] & CRC_MASK) >> 12) as u8
}

/// Helper for device CRC-4 calculation
/// Computed over the whole image with the CRC nibble and trailing word cleared,
/// the input is not modified.
pub fn crc4(prom: &[u16; PROM_WORDS]) -> u8 {
    let mut words = *prom;
    words[0] &= !CRC_MASK;
    words[PROM_WORDS - 1] = 0;

    let mut rem: u16 = 0;

    for byte in words.iter().flat_map(|w| w.to_be_bytes()) {
        rem ^= byte as u16;

        for _bit in 0..8 {
            if rem & 0x8000 != 0 {
                rem = (rem << 1) ^ CRC_POLY;
            } else {
                rem = rem << 1;
            }
        }
    }

    ((rem >> 12) & 0x000F) as u8
}

/// Check a PROM image against its stored CRC nibble
pub fn crc_check(prom: &[u16; PROM_WORDS]) -> bool {
    crc4(prom) == stored_crc(prom)
}

#[cfg(test)]
mod test {
    extern crate std;
    use std::{io, vec};

    use embedded_hal_mock::MockError;
    use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    use super::*;
    use crate::ErrorKind;
    use crate::testing::*;

    #[test]
    fn test_crc() {
        assert_eq!(crc4(&PROM), 0x9);
        assert!(crc_check(&PROM));

        // Trailing word does not take part
        let mut p = PROM;
        p[7] = 0xFFFF;
        assert!(crc_check(&p));

        let mut p = PROM;
        p[0] = (p[0] & !CRC_MASK) | 0x8000;
        assert!(!crc_check(&p));
    }

    #[test]
    fn test_crc_single_bit_flips() {
        for word in 0..PROM_WORDS {
            for bit in 0..16 {
                let mut p = PROM;
                p[word] ^= 1 << bit;

                // The scratch word is cleared before the check
                let expected = word == PROM_WORDS - 1;
                assert_eq!(crc_check(&p), expected, "word {} bit {}", word, bit);
            }
        }
    }

    #[test]
    fn test_crc_does_not_modify_input() {
        let p = [0xABCDu16, 1, 2, 3, 4, 5, 6, 7];
        let before = p;
        let _ = crc4(&p);
        let _ = crc_check(&p);
        assert_eq!(p, before);
        assert_eq!(p[0].to_be_bytes(), [0xAB, 0xCD]);
    }

    #[test]
    fn test_load() {
        let expectations = prom_transactions(&PROM);
        let mut i2c = I2cMock::new(&expectations);

        let mut prom = Prom::new();
        assert_eq!(prom.coefficients(), None);

        let c = prom.ensure_loaded(&mut i2c).unwrap();
        assert_eq!(c, Coefficients {
            pressure_sensitivity: 46372,
            pressure_offset: 43981,
            temp_coeff_of_pressure_sensitivity: 29059,
            temp_coeff_of_pressure_offset: 27842,
            reference_temperature: 31553,
            temp_coeff_of_temperature: 28165,
        });
        assert!(prom.is_validated());
        assert_eq!(prom.coefficients(), Some(c));

        i2c.done();
    }

    #[test]
    fn test_load_is_cached() {
        let expectations = prom_transactions(&PROM);
        let mut i2c = Counting::new(I2cMock::new(&expectations));

        let mut prom = Prom::new();
        let first = prom.ensure_loaded(&mut i2c).unwrap();
        assert_eq!(i2c.ops, 16);

        let second = prom.ensure_loaded(&mut i2c).unwrap();
        assert_eq!(i2c.ops, 16);
        assert_eq!(first, second);

        i2c.inner.done();
    }

    #[test]
    fn test_load_crc_error() {
        let mut bad = PROM;
        bad[3] ^= 0x0010;

        let mut expectations = prom_transactions(&bad);
        expectations.extend(prom_transactions(&PROM));
        let mut i2c = I2cMock::new(&expectations);

        let mut prom = Prom::new();
        let e = prom.ensure_loaded(&mut i2c).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Crc);
        assert!(matches!(e, Error::Crc(computed, 0x9) if computed == crc4(&bad)));
        assert!(!prom.is_validated());
        assert_eq!(prom.coefficients(), None);

        // Next attempt fetches again
        prom.ensure_loaded(&mut i2c).unwrap();
        assert!(prom.is_validated());

        i2c.done();
    }

    #[test]
    fn test_load_bus_errors() {
        let mut expectations = prom_transactions(&PROM)[..6].to_vec();
        expectations.push(I2cTransaction::write(DEFAULT_ADDRESS, vec![0xA6])
            .with_error(MockError::Io(io::ErrorKind::AddrNotAvailable)));
        expectations.push(I2cTransaction::write(DEFAULT_ADDRESS, vec![0xA0]));
        expectations.push(I2cTransaction::read(DEFAULT_ADDRESS, vec![0x9B, 0x1D])
            .with_error(MockError::Io(io::ErrorKind::Other)));
        let mut i2c = I2cMock::new(&expectations);

        let mut prom = Prom::new();

        let e = prom.ensure_loaded(&mut i2c).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::NoAcknowledge);
        assert_eq!(prom, Prom::new());

        let e = prom.ensure_loaded(&mut i2c).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Transfer);
        assert_eq!(prom, Prom::new());

        i2c.done();
    }

    #[test]
    fn test_invalidate() {
        let mut expectations = prom_transactions(&PROM);
        expectations.extend(prom_transactions(&PROM));
        let mut i2c = I2cMock::new(&expectations);

        let mut prom = Prom::new();
        prom.ensure_loaded(&mut i2c).unwrap();

        prom.invalidate();
        assert_eq!(prom.coefficients(), None);

        prom.ensure_loaded(&mut i2c).unwrap();
        assert_eq!(prom.coefficients(), Some(coefficients()));

        i2c.done();
    }
}
