//! Simulated I2C bus with the three sensors of the node attached.
//!
//! The devices are emulated at register level, so the real drivers run
//! unchanged on top of it. Readings drift slowly over time, one step per
//! barometer sample.

use airnode_core::config::BusAddresses;
use airnode_core::sensors::sht40::crc8;
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use log::trace;

const PM_VERSION_REGISTER: u8 = 0x1D;
const PM_FIRMWARE_VERSION: u8 = 0x03;

const SHT40_MEASURE: u8 = 0xFD;

const BMP280_CHIP_ID: u8 = 0x58;
const BMP280_CALIBRATION: u8 = 0x88;
const BMP280_CHIP_ID_REGISTER: u8 = 0xD0;
const BMP280_CTRL_MEAS: u8 = 0xF4;
const BMP280_CONFIG: u8 = 0xF5;
const BMP280_DATA: u8 = 0xF7;
const BMP280_DATA_LEN: u8 = 6;

/// Factory trimming words of the Bosch datasheet example part.
const BMP280_TRIM: [i32; 12] = [
    27504, 26435, -1000, 36477, -10685, 3024, 2855, 140, -7, 15500, -14600, 6000,
];
const BMP280_RAW_TEMPERATURE: u32 = 519888;
const BMP280_RAW_PRESSURE: f64 = 415148.0;
/// Data registers read back after power-on, before the first conversion.
const BMP280_RESET_SAMPLE: [u8; 6] = [0x80, 0x00, 0x00, 0x80, 0x00, 0x00];

/// Synthetic environment at one point in time.
struct Environment {
    temperature: f64,
    humidity: f64,
    pm2_5: f64,
    raw_pressure: u32,
}

impl Environment {
    fn at(step: u32) -> Self {
        let t = step as f64;
        Self {
            // 20–26 °C with a slow drift
            temperature: 23.0 + 3.0 * (t / 12.0).sin(),
            humidity: 50.0 + 10.0 * (t / 18.0).sin(),
            pm2_5: 12.0 + 4.0 * (t / 9.0).sin(),
            raw_pressure: (BMP280_RAW_PRESSURE + 400.0 * (t / 15.0).sin()) as u32,
        }
    }

    fn pm(&self, register: u8) -> Option<u16> {
        let pm2_5 = self.pm2_5;
        let value = match register {
            0x05 | 0x0B => pm2_5 * 0.7,
            0x07 | 0x0D => pm2_5,
            0x09 | 0x0F => pm2_5 * 1.4,
            _ => return None,
        };
        Some(value as u16)
    }

    fn sht40_frame(&self) -> [u8; 6] {
        let t = ((self.temperature + 45.0) / 175.0 * 65535.0).round() as u16;
        let h = (self.humidity / 100.0 * 65535.0).round() as u16;
        let [t0, t1] = t.to_be_bytes();
        let [h0, h1] = h.to_be_bytes();
        [t0, t1, crc8(&[t0, t1]), h0, h1, crc8(&[h0, h1])]
    }

    fn bmp280_sample(&self) -> [u8; 6] {
        let p = self.raw_pressure;
        let t = BMP280_RAW_TEMPERATURE;
        [
            (p >> 12) as u8,
            (p >> 4) as u8,
            ((p & 0x0F) << 4) as u8,
            (t >> 12) as u8,
            (t >> 4) as u8,
            ((t & 0x0F) << 4) as u8,
        ]
    }
}

pub struct SimulatedBus {
    addresses: BusAddresses,
    step: u32,
    pm_register: Option<u8>,
    sht40_pending: bool,
    bmp280_pointer: u8,
    bmp280_ctrl_meas: u8,
    bmp280_config: u8,
    bmp280_trim: [u8; 24],
}

impl SimulatedBus {
    pub fn new(addresses: BusAddresses) -> Self {
        let mut trim = [0u8; 24];
        for (chunk, word) in trim.chunks_exact_mut(2).zip(BMP280_TRIM) {
            chunk.copy_from_slice(&(word as u16).to_le_bytes());
        }

        Self {
            addresses,
            step: 0,
            pm_register: None,
            sht40_pending: false,
            bmp280_pointer: 0,
            bmp280_ctrl_meas: 0,
            bmp280_config: 0,
            bmp280_trim: trim,
        }
    }

    fn write_to(&mut self, address: u8, bytes: &[u8]) -> Result<(), ErrorKind> {
        trace!("sim write {:#04x}: {:02x?}", address, bytes);

        if address == self.addresses.pm25 {
            let [register] = bytes else {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
            };
            self.pm_register = Some(*register);
        } else if address == self.addresses.sht40 {
            if bytes != [SHT40_MEASURE] {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
            }
            self.sht40_pending = true;
        } else if address == self.addresses.bmp280 {
            let Some((&register, values)) = bytes.split_first() else {
                return Ok(());
            };
            self.bmp280_pointer = register;
            match (register, values) {
                (BMP280_CTRL_MEAS, [value, ..]) => self.bmp280_ctrl_meas = *value,
                (BMP280_CONFIG, [value, ..]) => self.bmp280_config = *value,
                _ => {}
            }
        } else {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        Ok(())
    }

    fn read_from(&mut self, address: u8, buf: &mut [u8]) -> Result<(), ErrorKind> {
        let env = Environment::at(self.step);

        if address == self.addresses.pm25 {
            let register = self
                .pm_register
                .ok_or(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))?;
            if register == PM_VERSION_REGISTER {
                buf.fill(PM_FIRMWARE_VERSION);
            } else {
                let value = env
                    .pm(register)
                    .ok_or(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data))?;
                fill(buf, &value.to_be_bytes());
            }
        } else if address == self.addresses.sht40 {
            // The SHT40 NACKs reads until a measurement has been requested
            if !std::mem::take(&mut self.sht40_pending) {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }
            fill(buf, &env.sht40_frame());
        } else if address == self.addresses.bmp280 {
            let sample = if self.bmp280_ctrl_meas & 0x03 == 0 {
                BMP280_RESET_SAMPLE
            } else {
                env.bmp280_sample()
            };
            let start = self.bmp280_pointer;
            for (offset, byte) in buf.iter_mut().enumerate() {
                *byte = self.bmp280_register(start.wrapping_add(offset as u8), &sample);
            }
            if (BMP280_DATA..BMP280_DATA + BMP280_DATA_LEN).contains(&start) {
                self.step = self.step.wrapping_add(1);
            }
        } else {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        trace!("sim read {:#04x}: {:02x?}", address, buf);
        Ok(())
    }

    fn bmp280_register(&self, register: u8, sample: &[u8; 6]) -> u8 {
        match register {
            0x88..=0x9F => self.bmp280_trim[(register - BMP280_CALIBRATION) as usize],
            BMP280_CHIP_ID_REGISTER => BMP280_CHIP_ID,
            BMP280_CTRL_MEAS => self.bmp280_ctrl_meas,
            BMP280_CONFIG => self.bmp280_config,
            0xF7..=0xFC => sample[(register - BMP280_DATA) as usize],
            _ => 0,
        }
    }
}

fn fill(buf: &mut [u8], data: &[u8]) {
    let n = buf.len().min(data.len());
    buf[..n].copy_from_slice(&data[..n]);
}

impl ErrorType for SimulatedBus {
    type Error = ErrorKind;
}

impl I2c for SimulatedBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for operation in operations {
            match operation {
                Operation::Write(bytes) => self.write_to(address, bytes)?,
                Operation::Read(buf) => self.read_from(address, buf)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airnode_core::bus::{RegisterBus, SharedBus, SharedI2cDevice};
    use airnode_core::config::NodeConfig;
    use airnode_core::sampling::SamplingController;
    use airnode_core::sensors::SensorsState;
    use airnode_core::telemetry::{Clock, TelemetryRecord};
    use airnode_core::transport::{DeliveryStatus, Transport};
    use embassy_sync::blocking_mutex::Mutex;
    use embedded_hal::delay::DelayNs;
    use std::cell::RefCell;
    use std::convert::Infallible;
    use time::OffsetDateTime;
    use time::macros::datetime;

    struct FixedClock;

    impl Clock for FixedClock {
        fn now_utc(&mut self) -> OffsetDateTime {
            datetime!(2025-10-01 06:30:00 UTC)
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[derive(Default)]
    struct Capture(Vec<TelemetryRecord>);

    impl Transport for Capture {
        type Error = Infallible;

        fn send(&mut self, record: &TelemetryRecord) -> Result<DeliveryStatus, Self::Error> {
            self.0.push(record.clone());
            Ok(DeliveryStatus::new(200))
        }
    }

    #[test]
    fn test_full_cycle_on_simulated_bus() {
        let config = NodeConfig::default();
        let bus: SharedBus<SimulatedBus> =
            Mutex::new(RefCell::new(SimulatedBus::new(config.addresses)));

        let mut sensors = SensorsState::from_config(
            SharedI2cDevice::new(&bus),
            SharedI2cDevice::new(&bus),
            SharedI2cDevice::new(&bus),
            &config,
        );
        sensors.bmp280.init().unwrap();

        let mut capture = Capture::default();
        let mut controller =
            SamplingController::new(&config, sensors, FixedClock, &mut capture, NoDelay).unwrap();

        let first = controller.run_cycle();
        assert!(first.delivery.is_ok());
        let second = controller.run_cycle();
        drop(controller);

        let record = &first.record;
        assert_eq!(record.timestamp.as_str(), "2025-10-01T08:30:00");
        assert_eq!(record.temperature, Some(23.0));
        assert_eq!(record.humidity, Some(50.0));
        assert_eq!(record.pm1, Some(8));
        assert_eq!(record.pm2_5, Some(12));
        assert_eq!(record.pm10, Some(16));
        assert_eq!(record.pressure, Some(100653.26));

        assert!(second.record.is_complete());
        assert_ne!(second.record.temperature, first.record.temperature);
        assert_eq!(capture.0.len(), 2);
    }

    #[test]
    fn test_data_reads_reset_value_before_configuration() {
        let mut bus = SimulatedBus::new(BusAddresses::default());
        let data: [u8; 6] = bus.read_register(0x76, BMP280_DATA).unwrap();
        assert_eq!(data, BMP280_RESET_SAMPLE);

        bus.write_register(0x76, BMP280_CTRL_MEAS, 0x27).unwrap();
        let data: [u8; 6] = bus.read_register(0x76, BMP280_DATA).unwrap();
        assert_ne!(data, BMP280_RESET_SAMPLE);
    }

    #[test]
    fn test_sht40_frame_carries_valid_crc() {
        let frame = Environment::at(5).sht40_frame();
        assert_eq!(crc8(&frame[0..2]), frame[2]);
        assert_eq!(crc8(&frame[3..5]), frame[5]);
    }

    #[test]
    fn test_unknown_address_is_not_acknowledged() {
        let mut bus = SimulatedBus::new(BusAddresses::default());
        let err = bus.write_bytes(0x50, &[0x00]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
    }

    #[test]
    fn test_sht40_read_without_command_is_rejected() {
        let mut bus = SimulatedBus::new(BusAddresses::default());
        assert!(bus.read_bytes::<6>(0x44).is_err());
    }
}
