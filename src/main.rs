//! Ms5805 command-line utility
//!
//! Copyright 2019 Ryan Kurte

use std::io;

extern crate embedded_hal;
use embedded_hal::blocking::i2c;

extern crate linux_embedded_hal;
use linux_embedded_hal::{Delay, I2cdev};

extern crate structopt;
use structopt::StructOpt;

extern crate humantime;
use humantime::{Duration as HumanDuration};

#[macro_use] extern crate log;
extern crate simplelog;
use simplelog::{TermLogger, LevelFilter};

extern crate sensor_ms5805;
use sensor_ms5805::{Ms5805, Resolution};

#[derive(StructOpt)]
#[structopt(name = "ms5805-util")]
/// A Command Line Interface (CLI) for interacting with a local Ms5805 pressure sensor over I2C
pub struct Options {

    /// Specify the i2c interface to use to connect to the ms5805 device
    #[structopt(short="d", long = "i2c", default_value = "/dev/i2c-1", env = "MS5805_I2C")]
    i2c: String,

    /// ADC oversampling ratio (256, 512, 1024, 2048, 4096, 8192)
    #[structopt(short = "r", long = "resolution", default_value = "4096")]
    pub resolution: Resolution,

    /// Specify period for taking measurements
    #[structopt(short = "p", long = "sample-period", default_value="1s")]
    pub period: HumanDuration,

    /// Number of measurements to take (0 to run forever)
    #[structopt(short = "n", long = "count", default_value="0")]
    pub count: usize,

    /// Number of allowed I2C errors prior to exiting
    #[structopt(long = "allowed-errors", default_value="3")]
    pub allowed_errors: usize,

    /// Enable verbose logging
    #[structopt(long = "log-level", default_value = "info")]
    level: LevelFilter,
}

/// Linux I2C connector reporting errors as `io::Error` so the driver
/// can detect missing acknowledgements from the errno
struct LinuxBus(I2cdev);

impl i2c::Write for LinuxBus {
    type Error = io::Error;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        i2c::Write::write(&mut self.0, address, bytes).map_err(io::Error::from)
    }
}

impl i2c::Read for LinuxBus {
    type Error = io::Error;

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        i2c::Read::read(&mut self.0, address, buffer).map_err(io::Error::from)
    }
}

fn main() {
    // Load options
    let opts = Options::from_args();

    // Setup logging
    TermLogger::init(opts.level, simplelog::Config::default()).unwrap();

    debug!("Connecting to I2C device");
    let i2c = match I2cdev::new(&opts.i2c) {
        Ok(v) => v,
        Err(e) => {
            error!("Error opening I2C device '{}': {:?}", &opts.i2c, e);
            std::process::exit(-1);
        }
    };

    let mut sensor = Ms5805::new(LinuxBus(i2c), Delay);

    debug!("Connecting to MS5805");
    if !sensor.is_connected() {
        error!("No MS5805 found on '{}'", &opts.i2c);
        std::process::exit(-2);
    }

    if let Err(e) = sensor.reset() {
        error!("Error resetting MS5805: {:?}", e);
        std::process::exit(-3);
    }

    sensor.set_resolution(opts.resolution);
    debug!("Using resolution: OSR {}", opts.resolution);

    let mut errors = 0;
    let mut taken = 0;

    loop {
        debug!("Starting sensor read cycle");

        match sensor.read_temperature_and_pressure() {
            Ok(m) => {
                info!("Temperature: {:.2} C, Pressure: {:.2} mbar", m.temp, m.pressure);
                taken += 1;

                if taken == 1 {
                    debug!("Calibration: {:?}", sensor.calibration());
                }
            },
            Err(e) => {
                warn!("Error reading sensor data: {:?} ({:?})", e.kind(), e);
                errors += 1;
            },
        }

        if errors > opts.allowed_errors {
            error!("Exceeded maximum allowed I2C errors");
            std::process::exit(-4);
        }

        if opts.count != 0 && taken >= opts.count {
            break;
        }

        // Wait for the next measurement period
        std::thread::sleep(*opts.period);
    }
}
