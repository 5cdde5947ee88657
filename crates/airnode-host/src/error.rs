use std::io;

use airnode_core::error::{ConfigurationError, SensorError};
use thiserror::Error;

/// Errors that keep the node from starting.
#[derive(Error, Debug)]
pub enum StartupError {
    /// An environment variable holds a value that does not parse
    #[error("{key} has an invalid value {value:?}: {reason}")]
    InvalidSetting {
        key: &'static str,
        value: String,
        reason: &'static str,
    },

    /// The node configuration was rejected by the core
    #[error("invalid node configuration: {0}")]
    Configuration(ConfigurationError),

    /// The barometric sensor could not be brought up
    #[error("sensor initialisation failed: {0}")]
    Sensor(SensorError),

    /// The I2C bus could not be opened
    #[cfg(feature = "rpi")]
    #[error("failed to open I2C bus: {0}")]
    Bus(#[from] rppal::i2c::Error),
}

// The no_std core errors do not implement `std::error::Error`, so `#[from]`
// cannot wrap them as a `source()`.
impl From<ConfigurationError> for StartupError {
    fn from(value: ConfigurationError) -> Self {
        Self::Configuration(value)
    }
}

impl From<SensorError> for StartupError {
    fn from(value: SensorError) -> Self {
        Self::Sensor(value)
    }
}

/// Errors from delivering one record to the collector.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Record could not be encoded as JSON
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    /// Collector host name did not resolve to any address
    #[error("collector address {0} did not resolve")]
    Unresolved(String),

    /// Connect, write or read failed or timed out
    #[error("collector I/O failed: {0}")]
    Io(#[from] io::Error),

    /// Collector answered with something that is not an HTTP status line
    #[error("malformed collector response: {0:?}")]
    MalformedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use airnode_core::error::BusError;
    use embedded_hal::i2c::ErrorKind;

    #[test]
    fn test_core_errors_convert_with_their_message() {
        let err: StartupError = ConfigurationError::CalibrationNotLoaded.into();
        assert!(matches!(
            err,
            StartupError::Configuration(ConfigurationError::CalibrationNotLoaded)
        ));
        assert_eq!(
            err.to_string(),
            "invalid node configuration: BMP280 calibration has not been loaded"
        );

        let err: StartupError =
            SensorError::bus("BMP280", "read chip id", BusError::new(0x76, ErrorKind::Bus)).into();
        assert!(matches!(err, StartupError::Sensor(SensorError::Bus { .. })));
        assert!(
            err.to_string()
                .starts_with("sensor initialisation failed: BMP280: read chip id failed")
        );
    }

    #[test]
    fn test_startup_error_is_a_std_error() {
        fn source_of(err: &dyn std::error::Error) -> bool {
            err.source().is_some()
        }
        let err = StartupError::from(ConfigurationError::InvalidUtcOffset(200_000));
        assert!(!source_of(&err));
    }
}
