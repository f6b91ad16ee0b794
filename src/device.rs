//! Ms5805 device definitions
//!
//! Copyright 2019 Ryan Kurte

use core::fmt;
use core::str::FromStr;

/// Ms5805 I2C address (7-bit, fixed in silicon)
pub const DEFAULT_ADDRESS: u8 = 0x76;

/// Number of 16-bit words in the PROM image (CRC word, six coefficients, scratch)
pub const PROM_WORDS: usize = 8;

/// Generator for the PROM CRC-4, aligned to the top nibble of a 16-bit remainder
pub const CRC_POLY: u16 = 0x3000;

/// Mask for the CRC nibble held in the first PROM word
pub const CRC_MASK: u16 = 0xF000;

/// Ms5805 I2C Command
/// All commands are a single byte, conversion and PROM commands carry their
/// argument in the low bits.
#[derive(PartialEq, Clone, Debug)]
pub enum Command {
    /// Reload the PROM into the internal registers
    Reset,

    /// Start a pressure (D1) conversion at the given resolution
    ConvertPressure(Resolution),

    /// Start a temperature (D2) conversion at the given resolution
    ConvertTemperature(Resolution),

    /// Select the ADC result for a following 3 byte read
    AdcRead,

    /// Select a PROM word (0..8) for a following 2 byte read
    PromRead(u8),
}

impl From<Command> for u8 {
    fn from(command: Command) -> u8 {
        use Command::*;
        match command {
            Reset => 0x1E,
            ConvertPressure(r) => 0x40 | r.command_bits(),
            ConvertTemperature(r) => 0x50 | r.command_bits(),
            AdcRead => 0x00,
            PromRead(address) => 0xA0 | (address << 1),
        }
    }
}

/// ADC oversampling ratio
/// Higher ratios trade conversion time for lower noise
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Resolution {
    Osr256 = 0,
    Osr512 = 1,
    Osr1024 = 2,
    Osr2048 = 3,
    Osr4096 = 4,
    Osr8192 = 5,
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::Osr256
    }
}

impl Resolution {
    /// Worst case conversion time in milliseconds
    pub fn conversion_time_ms(&self) -> u32 {
        use Resolution::*;
        match *self {
            Osr256 => 1,
            Osr512 => 2,
            Osr1024 => 3,
            Osr2048 => 5,
            Osr4096 => 9,
            Osr8192 => 17,
        }
    }

    /// Number of samples averaged by the ADC
    pub fn ratio(&self) -> u32 {
        256 << (*self as u32)
    }

    fn command_bits(&self) -> u8 {
        (*self as u8) * 2
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.ratio())
    }
}

/// Error parsing a resolution from a string
#[derive(PartialEq, Clone, Debug)]
pub struct ParseResolutionError(pub String);

impl fmt::Display for ParseResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid resolution '{}' (expected one of 256, 512, 1024, 2048, 4096, 8192)", self.0)
    }
}

impl std::error::Error for ParseResolutionError {}

impl FromStr for Resolution {
    type Err = ParseResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Resolution::*;
        match s.trim().trim_start_matches("osr").trim_start_matches("OSR") {
            "256" => Ok(Osr256),
            "512" => Ok(Osr512),
            "1024" => Ok(Osr1024),
            "2048" => Ok(Osr2048),
            "4096" => Ok(Osr4096),
            "8192" => Ok(Osr8192),
            _ => Err(ParseResolutionError(s.to_string())),
        }
    }
}
