//! Sensirion SHT40 humidity / temperature sensor.
//!
//! Command-response protocol: one command byte starts a measurement, the
//! result is read back after the settle time as two CRC-protected words.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, error};

use super::settle;
use crate::bus::RegisterBus;
use crate::compensation::round2;
use crate::error::SensorError;

pub const DEFAULT_ADDRESS: u8 = 0x44;
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(20);

const SENSOR: &str = "SHT40";
/// High repeatability, no clock stretching.
const CMD_MEASURE_HIGH_PRECISION: u8 = 0xFD;

/// Typed readings from the SHT40 sensor, rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SHT40Readings {
    pub temperature_celsius: f64,
    pub humidity_percent: f64,
}

pub struct SHT40Sensor<I> {
    i2c: I,
    address: u8,
    settle: Duration,
    verify_crc: bool,
}

impl<I: I2c> SHT40Sensor<I> {
    pub fn new(i2c: I, address: u8, settle: Duration, verify_crc: bool) -> Self {
        Self {
            i2c,
            address,
            settle,
            verify_crc,
        }
    }

    /// Trigger one measurement and decode the 6-byte response.
    ///
    /// Response layout: `T_msb T_lsb T_crc RH_msb RH_lsb RH_crc`.
    pub fn measure<D: DelayNs>(&mut self, delay: &mut D) -> Result<SHT40Readings, SensorError> {
        let address = self.address;

        self.i2c
            .write_bytes(address, &[CMD_MEASURE_HIGH_PRECISION])
            .map_err(|e| {
                error!("SHT40 measurement command failed: {}", e);
                SensorError::bus(SENSOR, "start measurement", e)
            })?;

        settle(delay, self.settle);

        let data: [u8; 6] = self.i2c.read_bytes(address).map_err(|e| {
            error!("SHT40 measurement read failed: {}", e);
            SensorError::bus(SENSOR, "read measurement", e)
        })?;

        if self.verify_crc {
            check_word(&data[0..3], "temperature word")?;
            check_word(&data[3..6], "humidity word")?;
        }

        let raw_temperature = u16::from_be_bytes([data[0], data[1]]);
        let raw_humidity = u16::from_be_bytes([data[3], data[4]]);
        debug!(
            "SHT40 raw temperature {:#06x}, raw humidity {:#06x}",
            raw_temperature, raw_humidity
        );

        Ok(SHT40Readings {
            temperature_celsius: round2(convert_temperature(raw_temperature)),
            humidity_percent: round2(convert_humidity(raw_humidity)),
        })
    }

    /// Temperature (°C) and relative humidity (%); both unavailable on failure.
    ///
    /// The failure itself is logged by [`Self::measure`].
    pub fn read<D: DelayNs>(&mut self, delay: &mut D) -> (Option<f64>, Option<f64>) {
        match self.measure(delay) {
            Ok(readings) => (
                Some(readings.temperature_celsius),
                Some(readings.humidity_percent),
            ),
            Err(_) => (None, None),
        }
    }

    /// Give the bus handle back.
    pub fn release(self) -> I {
        self.i2c
    }
}

fn check_word(word: &[u8], operation: &'static str) -> Result<(), SensorError> {
    let expected = crc8(&word[..2]);
    let found = word[2];
    if expected == found {
        Ok(())
    } else {
        error!(
            "SHT40 CRC mismatch in {}: expected {:#04x}, got {:#04x}",
            operation, expected, found
        );
        Err(SensorError::Checksum {
            sensor: SENSOR,
            operation,
            expected,
            found,
        })
    }
}

/// `-45 + 175 * raw / 65535`
pub fn convert_temperature(raw: u16) -> f64 {
    -45.0 + 175.0 * (raw as f64 / 65535.0)
}

/// `100 * raw / 65535`
pub fn convert_humidity(raw: u16) -> f64 {
    100.0 * (raw as f64 / 65535.0)
}

/// Sensirion CRC-8: polynomial 0x31, initial value 0xFF, no final XOR.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0xFFu8;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}
