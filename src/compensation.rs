//! Temperature and pressure compensation
//!
//! Converts raw ADC counts into calibrated readings using the datasheet's
//! fixed point algorithm with second order correction below 20 C.
//! All intermediate values are 64-bit signed, shifts of negative values must
//! round towards negative infinity.
//!
//! Copyright 2019 Ryan Kurte

use crate::Measurement;
use crate::calibration::Coefficients;

/// Reference temperature in centi-degrees (20.00 C)
const TEMP_REF: i64 = 2000;

/// Below this temperature (-15.00 C) the low temperature terms are added
const TEMP_LOW: i64 = -1500;

/// Compensated fixed point reading
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct Compensated {
    /// Temperature in centi-degrees celsius
    pub temperature: i64,
    /// Pressure in centi-millibar
    pub pressure: i64,
}

/// Second order correction terms
#[derive(PartialEq, Clone, Copy, Debug, Default)]
pub struct SecondOrder {
    pub t2: i64,
    pub off2: i64,
    pub sens2: i64,
}

/// Compute the second order correction for the first order temperature `temp`
pub fn second_order(temp: i64, dt: i64) -> SecondOrder {
    if temp < TEMP_REF {
        let warm = (temp - TEMP_REF) * (temp - TEMP_REF);

        let mut s = SecondOrder {
            t2: (3 * dt * dt) >> 33,
            off2: 61 * warm / 16,
            sens2: 29 * warm / 16,
        };

        if temp < TEMP_LOW {
            let cold = (temp - TEMP_LOW) * (temp - TEMP_LOW);
            s.off2 += 17 * cold;
            s.sens2 += 9 * cold;
        }

        s
    } else {
        SecondOrder {
            t2: (5 * dt * dt) >> 38,
            off2: 0,
            sens2: 0,
        }
    }
}

/// Compensate raw ADC readings, returning fixed point values
pub fn compensate_raw(raw_temperature: u32, raw_pressure: u32, c: &Coefficients) -> Compensated {
    // Difference between actual and reference temperature
    let dt = raw_temperature as i32 - ((c.reference_temperature as i32) << 8);
    let dt = dt as i64;

    // First order temperature
    let temp = TEMP_REF + ((dt * c.temp_coeff_of_temperature as i64) >> 23);

    let SecondOrder{ t2, off2, sens2 } = second_order(temp, dt);

    // Offset and sensitivity at actual temperature
    let off = ((c.pressure_offset as i64) << 17)
        + ((c.temp_coeff_of_pressure_offset as i64 * dt) >> 6)
        - off2;
    let sens = ((c.pressure_sensitivity as i64) << 16)
        + ((c.temp_coeff_of_pressure_sensitivity as i64 * dt) >> 7)
        - sens2;

    let pressure = (((raw_pressure as i64 * sens) >> 21) - off) >> 15;

    Compensated {
        temperature: temp - t2,
        pressure,
    }
}

/// Compensate raw ADC readings into degrees celsius and millibar
pub fn compensate(raw_temperature: u32, raw_pressure: u32, c: &Coefficients) -> Measurement {
    let Compensated{ temperature, pressure } = compensate_raw(raw_temperature, raw_pressure, c);

    Measurement {
        temp: temperature as f32 / 100.0,
        pressure: pressure as f32 / 100.0,
    }
}
