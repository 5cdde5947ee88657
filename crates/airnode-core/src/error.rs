//! Error taxonomy shared by the bus layer, the drivers and the sampling loop.
//!
//! Bus and sensor errors are recoverable: the sampling controller turns them
//! into unavailable telemetry fields. Configuration errors are fatal and keep
//! the node out of the sampling loop.

use embedded_hal::i2c::ErrorKind;
use thiserror_no_std::Error;

/// Transport-level failure of a single I2C transfer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("I2C transfer with device {address:#04x} failed: {kind}")]
pub struct BusError {
    pub address: u8,
    pub kind: ErrorKind,
}

impl BusError {
    pub const fn new(address: u8, kind: ErrorKind) -> Self {
        Self { address, kind }
    }
}

/// Failure of a specific sensor protocol step.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: {operation} failed: {cause}")]
    Bus {
        sensor: &'static str,
        operation: &'static str,
        cause: BusError,
    },
    #[error("{sensor}: checksum mismatch in {operation} (expected {expected:#04x}, got {found:#04x})")]
    Checksum {
        sensor: &'static str,
        operation: &'static str,
        expected: u8,
        found: u8,
    },
    #[error("{0}")]
    Configuration(ConfigurationError),
}

impl SensorError {
    pub const fn bus(sensor: &'static str, operation: &'static str, cause: BusError) -> Self {
        Self::Bus {
            sensor,
            operation,
            cause,
        }
    }
}

impl From<ConfigurationError> for SensorError {
    fn from(value: ConfigurationError) -> Self {
        Self::Configuration(value)
    }
}

/// Fatal set-up errors. None of these can be fixed by retrying a cycle.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("BMP280 calibration has not been loaded")]
    CalibrationNotLoaded,
    #[error("BMP280 calibration is already loaded")]
    CalibrationAlreadyLoaded,
    #[error("UTC offset of {0} seconds is out of range")]
    InvalidUtcOffset(i32),
    #[error("device id is longer than {0} bytes")]
    DeviceIdTooLong(usize),
}
