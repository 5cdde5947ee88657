//! Real sensors on a Linux I2C bus.

use log::info;
use rppal::i2c::I2c;

use crate::error::StartupError;

/// Open `/dev/i2c-<bus>`. rppal's `I2c` implements the `embedded-hal` 1.0
/// traits, so it drops straight into the shared bus.
pub fn open_bus(bus: u8) -> Result<I2c, StartupError> {
    let i2c = I2c::with_bus(bus)?;
    info!("Opened I2C bus {} at {} Hz", bus, i2c.clock_speed()?);
    Ok(i2c)
}
