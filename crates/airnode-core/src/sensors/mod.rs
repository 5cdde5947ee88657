pub mod bmp280;
pub mod pm25;
pub mod sht40;

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::debug;

pub use bmp280::{BMP280Readings, BMP280Sensor};
pub use pm25::{PM25Sensor, PmChannel};
pub use sht40::{SHT40Readings, SHT40Sensor};

use crate::config::NodeConfig;

/// Block for a sensor's settle time.
pub(crate) fn settle<D: DelayNs>(delay: &mut D, duration: Duration) {
    let micros = u32::try_from(duration.as_micros()).unwrap_or(u32::MAX);
    delay.delay_us(micros);
}

/// Everything one pass over the sensors produced.
///
/// A `None` field means that reading failed during this pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSnapshot {
    pub pm1_0: Option<u16>,
    pub pm2_5: Option<u16>,
    pub pm10: Option<u16>,
    pub temperature_celsius: Option<f64>,
    pub humidity_percent: Option<f64>,
    pub pressure_pa: Option<f64>,
    /// Die temperature of the barometric sensor, only used for diagnostics.
    pub barometer_temperature_celsius: Option<f64>,
}

/// Container for the three sensors of the node.
///
/// Each driver owns its own handle to the shared bus; the readings are
/// taken strictly one after the other.
pub struct SensorsState<P, S, B> {
    pub pm25: PM25Sensor<P>,
    pub sht40: SHT40Sensor<S>,
    pub bmp280: BMP280Sensor<B>,
}

impl<P, S, B> SensorsState<P, S, B>
where
    P: I2c,
    S: I2c,
    B: I2c,
{
    pub fn new(pm25: PM25Sensor<P>, sht40: SHT40Sensor<S>, bmp280: BMP280Sensor<B>) -> Self {
        Self {
            pm25,
            sht40,
            bmp280,
        }
    }

    /// Build the three drivers from the configured addresses and timings.
    ///
    /// The barometric sensor still needs [`BMP280Sensor::init`] before use.
    pub fn from_config(pm_i2c: P, sht_i2c: S, bmp_i2c: B, config: &NodeConfig) -> Self {
        Self::new(
            PM25Sensor::new(pm_i2c, config.addresses.pm25, config.pm_settle),
            SHT40Sensor::new(
                sht_i2c,
                config.addresses.sht40,
                config.sht_settle,
                config.verify_sht_crc,
            ),
            BMP280Sensor::new(bmp_i2c, config.addresses.bmp280),
        )
    }

    /// Read all sensors in the fixed order PM1.0, PM2.5, PM10,
    /// humidity/temperature, barometer.
    ///
    /// A failing sensor only blanks its own fields; the pass always completes.
    /// Failures are logged once, by the driver that hit them.
    pub fn read_all<D: DelayNs>(&mut self, delay: &mut D) -> SensorSnapshot {
        let mut snapshot = SensorSnapshot::default();

        snapshot.pm1_0 = self.read_pm(PmChannel::Pm1_0, delay);
        snapshot.pm2_5 = self.read_pm(PmChannel::Pm2_5, delay);
        snapshot.pm10 = self.read_pm(PmChannel::Pm10, delay);

        let (temperature, humidity) = self.sht40.read(delay);
        snapshot.temperature_celsius = temperature;
        snapshot.humidity_percent = humidity;

        if let Ok(readings) = self.bmp280.measure() {
            debug!("BMP280 temperature {} °C", readings.temperature_celsius);
            snapshot.barometer_temperature_celsius = Some(readings.temperature_celsius);
            snapshot.pressure_pa = readings.pressure_pa;
        }

        snapshot
    }

    fn read_pm<D: DelayNs>(&mut self, channel: PmChannel, delay: &mut D) -> Option<u16> {
        self.pm25.read_channel(channel, delay).ok()
    }
}
