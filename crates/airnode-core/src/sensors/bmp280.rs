//! Bosch BMP280 barometric pressure / temperature sensor.
//!
//! The device is configured once for continuous (normal mode) sampling; each
//! cycle then only burst-reads the latest ADC values. Converting those values
//! needs the factory calibration block, which is read exactly once by
//! [`BMP280Sensor::load_calibration`] and kept for the life of the driver.

use embedded_hal::i2c::I2c;
use log::{debug, error, info, warn};

use crate::bus::RegisterBus;
use crate::compensation::{
    CALIBRATION_LEN, CalibrationSet, RAW_SAMPLE_LEN, RawBarometricSample, compensate_pressure,
    compensate_temperature, round2,
};
use crate::error::{BusError, ConfigurationError, SensorError};

pub const DEFAULT_ADDRESS: u8 = 0x76;

const SENSOR: &str = "BMP280";

const REG_CALIBRATION: u8 = 0x88;
const REG_CHIP_ID: u8 = 0xD0;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_DATA: u8 = 0xF7;

/// osrs_t = x1, osrs_p = x1, mode = normal
const CTRL_MEAS_NORMAL_X1: u8 = 0x27;
/// t_sb = 0b101 (1000 ms standby), filter off, 3-wire SPI off
const CONFIG_STANDBY: u8 = 0xA0;

/// Chip ids reported by BMP280 engineering samples and production parts.
const BMP280_CHIP_IDS: [u8; 3] = [0x56, 0x57, 0x58];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BMP280Readings {
    pub temperature_celsius: f64,
    /// `None` when the compensation could not determine a pressure.
    pub pressure_pa: Option<f64>,
}

pub struct BMP280Sensor<I> {
    i2c: I,
    address: u8,
    calibration: Option<CalibrationSet>,
}

impl<I: I2c> BMP280Sensor<I> {
    pub fn new(i2c: I, address: u8) -> Self {
        Self {
            i2c,
            address,
            calibration: None,
        }
    }

    /// Bring the sensor up: identify it, configure sampling and load the
    /// calibration block. Call once at start-up.
    pub fn init(&mut self) -> Result<(), SensorError> {
        let chip_id = self.chip_id()?;
        if BMP280_CHIP_IDS.contains(&chip_id) {
            info!("BMP280 found at {:#04x} (chip id {:#04x})", self.address, chip_id);
        } else {
            warn!(
                "Device at {:#04x} reports chip id {:#04x}, expected a BMP280",
                self.address, chip_id
            );
        }

        self.configure()?;
        self.load_calibration()?;
        info!("BMP280 calibration loaded");
        Ok(())
    }

    pub fn chip_id(&mut self) -> Result<u8, SensorError> {
        let [id] = self
            .i2c
            .read_register::<1>(self.address, REG_CHIP_ID)
            .map_err(|e| SensorError::bus(SENSOR, "read chip id", e))?;
        Ok(id)
    }

    /// Normal mode with x1 oversampling on both channels.
    pub fn configure(&mut self) -> Result<(), SensorError> {
        let address = self.address;
        self.i2c
            .write_register(address, REG_CTRL_MEAS, CTRL_MEAS_NORMAL_X1)
            .and_then(|_| self.i2c.write_register(address, REG_CONFIG, CONFIG_STANDBY))
            .map_err(|e| {
                error!("BMP280 configuration write failed: {}", e);
                SensorError::bus(SENSOR, "write configuration", e)
            })
    }

    /// Read and decode the 24-byte calibration block.
    ///
    /// Calibration is immutable once loaded; a second call is refused.
    pub fn load_calibration(&mut self) -> Result<&CalibrationSet, SensorError> {
        if self.calibration.is_some() {
            return Err(ConfigurationError::CalibrationAlreadyLoaded.into());
        }

        let block: [u8; CALIBRATION_LEN] = self
            .i2c
            .read_register(self.address, REG_CALIBRATION)
            .map_err(|e| {
                error!("BMP280 calibration read failed: {}", e);
                SensorError::bus(SENSOR, "read calibration", e)
            })?;

        let calibration = CalibrationSet::from_bytes(&block);
        debug!("BMP280 calibration: {:?}", calibration);

        Ok(self.calibration.insert(calibration))
    }

    pub fn calibration(&self) -> Result<&CalibrationSet, ConfigurationError> {
        self.calibration
            .as_ref()
            .ok_or(ConfigurationError::CalibrationNotLoaded)
    }

    /// Burst-read the pressure and temperature ADC registers.
    pub fn read_raw(&mut self) -> Result<RawBarometricSample, BusError> {
        let data: [u8; RAW_SAMPLE_LEN] = self.i2c.read_register(self.address, REG_DATA)?;
        Ok(RawBarometricSample::from_bytes(&data))
    }

    /// Read one sample and compensate it, temperature first.
    pub fn measure(&mut self) -> Result<BMP280Readings, SensorError> {
        let calibration = *self
            .calibration()
            .inspect_err(|e| error!("BMP280 measurement refused: {}", e))?;

        let raw = self.read_raw().map_err(|e| {
            error!("BMP280 data read failed: {}", e);
            SensorError::bus(SENSOR, "read data", e)
        })?;
        debug!(
            "BMP280 raw pressure {}, raw temperature {}",
            raw.raw_pressure, raw.raw_temperature
        );

        let (temperature, t_fine) = compensate_temperature(raw.raw_temperature, &calibration);
        let pressure = compensate_pressure(raw.raw_pressure, t_fine, &calibration);

        let pressure_pa = if pressure == 0.0 {
            warn!("BMP280 pressure indeterminate for raw value {}", raw.raw_pressure);
            None
        } else {
            Some(round2(pressure))
        };

        Ok(BMP280Readings {
            temperature_celsius: round2(temperature),
            pressure_pa,
        })
    }

    /// Give the bus handle back.
    pub fn release(self) -> I {
        self.i2c
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use std::vec;
    use std::vec::Vec;

    /// Calibration block of the BMP280 datasheet compensation example.
    pub(crate) fn datasheet_calibration() -> Vec<u8> {
        let words: [i32; 12] = [
            27504, 26435, -1000, 36477, -10685, 3024, 2855, 140, -7, 15500, -14600, 6000,
        ];
        words
            .iter()
            .flat_map(|&w| (w as u16).to_le_bytes())
            .collect()
    }

    /// Burst read for raw pressure 415148 and raw temperature 519888.
    pub(crate) fn datasheet_sample() -> Vec<u8> {
        vec![0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00]
    }

    pub(crate) fn init_transactions(address: u8) -> Vec<I2cTransaction> {
        vec![
            I2cTransaction::write_read(address, vec![0xD0], vec![0x58]),
            I2cTransaction::write(address, vec![0xF4, 0x27]),
            I2cTransaction::write(address, vec![0xF5, 0xA0]),
            I2cTransaction::write_read(address, vec![0x88], datasheet_calibration()),
        ]
    }

    #[test]
    fn test_init_configures_and_loads_calibration() {
        let mut bmp = BMP280Sensor::new(I2cMock::new(&init_transactions(0x76)), 0x76);

        assert_eq!(bmp.calibration(), Err(ConfigurationError::CalibrationNotLoaded));
        bmp.init().unwrap();

        let calibration = bmp.calibration().unwrap();
        assert_eq!(calibration.dig_t1, 27504);
        assert_eq!(calibration.dig_p1, 36477);
        assert_eq!(calibration.dig_p8, -14600);

        bmp.release().done();
    }

    #[test]
    fn test_measure_without_calibration_is_a_configuration_error() {
        // No bus traffic is expected at all.
        let expectations: [I2cTransaction; 0] = [];
        let mut bmp = BMP280Sensor::new(I2cMock::new(&expectations), 0x76);

        assert_eq!(
            bmp.measure(),
            Err(SensorError::Configuration(
                ConfigurationError::CalibrationNotLoaded
            ))
        );
        assert_eq!(
            bmp.measure(),
            Err(SensorError::Configuration(
                ConfigurationError::CalibrationNotLoaded
            ))
        );

        bmp.release().done();
    }

    #[test]
    fn test_calibration_is_loaded_once() {
        let mut bmp = BMP280Sensor::new(
            I2cMock::new(&[I2cTransaction::write_read(
                0x76,
                vec![0x88],
                datasheet_calibration(),
            )]),
            0x76,
        );

        bmp.load_calibration().unwrap();
        assert_eq!(
            bmp.load_calibration(),
            Err(SensorError::Configuration(
                ConfigurationError::CalibrationAlreadyLoaded
            ))
        );

        bmp.release().done();
    }

    #[test]
    fn test_measure_matches_datasheet() {
        let mut expectations = init_transactions(0x76);
        expectations.push(I2cTransaction::write_read(
            0x76,
            vec![0xF7],
            datasheet_sample(),
        ));
        let mut bmp = BMP280Sensor::new(I2cMock::new(&expectations), 0x76);

        bmp.init().unwrap();
        let readings = bmp.measure().unwrap();
        assert_eq!(readings.temperature_celsius, 25.08);
        assert_eq!(readings.pressure_pa, Some(100653.26));

        bmp.release().done();
    }

    #[test]
    fn test_read_raw_reports_bus_error() {
        let mut bmp = BMP280Sensor::new(
            I2cMock::new(&[
                I2cTransaction::write_read(0x76, vec![0xF7], vec![0; 6])
                    .with_error(ErrorKind::NoAcknowledge(
                        embedded_hal::i2c::NoAcknowledgeSource::Address,
                    )),
            ]),
            0x76,
        );

        let err = bmp.read_raw().unwrap_err();
        assert_eq!(err.address, 0x76);

        bmp.release().done();
    }

    #[test]
    fn test_unknown_chip_id_is_not_fatal() {
        let mut expectations = init_transactions(0x77);
        expectations[0] = I2cTransaction::write_read(0x77, vec![0xD0], vec![0x60]);
        let mut bmp = BMP280Sensor::new(I2cMock::new(&expectations), 0x77);

        assert!(bmp.init().is_ok());

        bmp.release().done();
    }
}
