//! DFRobot Gravity PM2.5 air-quality sensor.
//!
//! Every value is fetched the same way: write the register number as a single
//! command byte, give the sensor time to prepare the response, then read the
//! big-endian result. The wire value is trusted as-is; the sensor sends no
//! checksum.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, error};

use super::settle;
use crate::bus::RegisterBus;
use crate::error::SensorError;

pub const DEFAULT_ADDRESS: u8 = 0x19;
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(50);

const SENSOR: &str = "PM2.5";
const REG_VERSION: u8 = 0x1D;

/// Concentration registers, in µg/m³.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PmChannel {
    /// PM1.0, standard particle
    Pm1_0 = 0x05,
    /// PM2.5, standard particle
    Pm2_5 = 0x07,
    /// PM10, standard particle
    Pm10 = 0x09,
    /// PM1.0, atmospheric environment
    Pm1_0Atmosphere = 0x0B,
    /// PM2.5, atmospheric environment
    Pm2_5Atmosphere = 0x0D,
    /// PM10, atmospheric environment
    Pm10Atmosphere = 0x0F,
}

impl PmChannel {
    pub const fn register(self) -> u8 {
        self as u8
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pm1_0 => "PM1.0",
            Self::Pm2_5 => "PM2.5",
            Self::Pm10 => "PM10",
            Self::Pm1_0Atmosphere => "PM1.0 (atm)",
            Self::Pm2_5Atmosphere => "PM2.5 (atm)",
            Self::Pm10Atmosphere => "PM10 (atm)",
        }
    }
}

pub struct PM25Sensor<I> {
    i2c: I,
    address: u8,
    settle: Duration,
}

impl<I: I2c> PM25Sensor<I> {
    pub fn new(i2c: I, address: u8, settle: Duration) -> Self {
        Self {
            i2c,
            address,
            settle,
        }
    }

    /// Read one concentration channel.
    pub fn read_channel<D: DelayNs>(
        &mut self,
        channel: PmChannel,
        delay: &mut D,
    ) -> Result<u16, SensorError> {
        let data: [u8; 2] = self.query(channel.register(), delay, "read concentration")?;
        let value = u16::from_be_bytes(data);
        debug!("{}: {} = {}", SENSOR, channel.label(), value);
        Ok(value)
    }

    /// Firmware version byte reported by the sensor.
    pub fn firmware_version<D: DelayNs>(&mut self, delay: &mut D) -> Result<u8, SensorError> {
        let [version] = self.query::<1, D>(REG_VERSION, delay, "read firmware version")?;
        Ok(version)
    }

    /// Give the bus handle back.
    pub fn release(self) -> I {
        self.i2c
    }

    fn query<const N: usize, D: DelayNs>(
        &mut self,
        register: u8,
        delay: &mut D,
        operation: &'static str,
    ) -> Result<[u8; N], SensorError> {
        let address = self.address;

        self.i2c.write_bytes(address, &[register]).map_err(|e| {
            error!("{} command {:#04x} failed: {}", SENSOR, register, e);
            SensorError::bus(SENSOR, operation, e)
        })?;

        settle(delay, self.settle);

        self.i2c.read_bytes::<N>(address).map_err(|e| {
            error!("{} response to {:#04x} failed: {}", SENSOR, register, e);
            SensorError::bus(SENSOR, operation, e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusError;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use std::vec;

    fn sensor(expectations: &[I2cTransaction]) -> PM25Sensor<I2cMock> {
        PM25Sensor::new(I2cMock::new(expectations), DEFAULT_ADDRESS, DEFAULT_SETTLE)
    }

    #[test]
    fn test_read_channel_is_big_endian() {
        let mut pm = sensor(&[
            I2cTransaction::write(0x19, vec![0x07]),
            I2cTransaction::read(0x19, vec![0x01, 0x2C]),
        ]);

        assert_eq!(pm.read_channel(PmChannel::Pm2_5, &mut NoopDelay), Ok(300));

        pm.release().done();
    }

    #[test]
    fn test_standard_registers() {
        assert_eq!(PmChannel::Pm1_0.register(), 0x05);
        assert_eq!(PmChannel::Pm2_5.register(), 0x07);
        assert_eq!(PmChannel::Pm10.register(), 0x09);
        assert_eq!(PmChannel::Pm10Atmosphere.register(), 0x0F);
    }

    #[test]
    fn test_command_failure_skips_read() {
        let mut pm = sensor(&[
            I2cTransaction::write(0x19, vec![0x05]).with_error(ErrorKind::Other)
        ]);

        let err = pm.read_channel(PmChannel::Pm1_0, &mut NoopDelay).unwrap_err();
        assert_eq!(
            err,
            SensorError::bus(
                "PM2.5",
                "read concentration",
                BusError::new(0x19, ErrorKind::Other)
            )
        );

        pm.release().done();
    }

    #[test]
    fn test_read_failure_is_reported() {
        let mut pm = sensor(&[
            I2cTransaction::write(0x19, vec![0x09]),
            I2cTransaction::read(0x19, vec![0x00, 0x00]).with_error(ErrorKind::Bus),
        ]);

        assert!(pm.read_channel(PmChannel::Pm10, &mut NoopDelay).is_err());

        pm.release().done();
    }

    #[test]
    fn test_firmware_version() {
        let mut pm = sensor(&[
            I2cTransaction::write(0x19, vec![0x1D]),
            I2cTransaction::read(0x19, vec![0x03]),
        ]);

        assert_eq!(pm.firmware_version(&mut NoopDelay), Ok(3));

        pm.release().done();
    }
}
