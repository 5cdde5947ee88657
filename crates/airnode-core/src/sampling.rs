//! The periodic sampling loop.
//!
//! The controller alternates between two states: **Sampling**, where it reads
//! every sensor once, builds a [`TelemetryRecord`] and hands it to the
//! [`Transport`], and **Idle**, where it sleeps for the configured interval.
//! There is no terminal state; the loop only ends when the host stops.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{error, info, warn};
use time::UtcOffset;

use crate::config::{DeviceId, NodeConfig};
use crate::error::ConfigurationError;
use crate::sensors::SensorsState;
use crate::telemetry::{Clock, Reading, TelemetryRecord, format_timestamp};
use crate::transport::{DeliveryStatus, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// Between cycles.
    Idle,
    /// Reading sensors and sending the record.
    Sampling,
}

/// Result of one sampling cycle.
#[derive(Debug)]
pub struct CycleReport<E> {
    /// 1-based cycle counter.
    pub cycle: u32,
    pub record: TelemetryRecord,
    pub delivery: Result<DeliveryStatus, E>,
}

pub struct SamplingController<P, S, B, C, T, D> {
    sensors: SensorsState<P, S, B>,
    clock: C,
    transport: T,
    delay: D,
    device_id: DeviceId,
    utc_offset: UtcOffset,
    sample_interval: Duration,
    state: CycleState,
    cycles: u32,
}

impl<P, S, B, C, T, D> SamplingController<P, S, B, C, T, D>
where
    P: I2c,
    S: I2c,
    B: I2c,
    C: Clock,
    T: Transport,
    D: DelayNs,
{
    /// Fails when the barometric calibration has not been loaded or the
    /// configuration is unusable; the loop must not start in either case.
    pub fn new(
        config: &NodeConfig,
        sensors: SensorsState<P, S, B>,
        clock: C,
        transport: T,
        delay: D,
    ) -> Result<Self, ConfigurationError> {
        sensors.bmp280.calibration()?;
        let utc_offset = config.utc_offset()?;

        Ok(Self {
            sensors,
            clock,
            transport,
            delay,
            device_id: config.device_id.clone(),
            utc_offset,
            sample_interval: config.sample_interval,
            state: CycleState::Idle,
            cycles: 0,
        })
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Number of cycles run so far.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Run the loop forever.
    pub fn run(&mut self) -> ! {
        info!(
            "Sampling every {} s as {}",
            self.sample_interval.as_secs(),
            self.device_id
        );
        loop {
            self.run_cycle();
            self.idle();
        }
    }

    /// One full Sampling pass. Individual sensor failures only blank their
    /// fields; a record is always built and a send is always attempted.
    pub fn run_cycle(&mut self) -> CycleReport<T::Error> {
        self.state = CycleState::Sampling;
        self.cycles = self.cycles.wrapping_add(1);
        info!("Sampling cycle {} started", self.cycles);

        let snapshot = self.sensors.read_all(&mut self.delay);
        let local = self.clock.now_utc().to_offset(self.utc_offset);
        let record = TelemetryRecord::new(self.device_id.clone(), format_timestamp(local), &snapshot);

        log_record(&record);

        let delivery = self.transport.send(&record);
        match &delivery {
            Ok(status) if status.is_success() => {
                info!("Telemetry delivered (status {})", status.code)
            }
            Ok(status) => warn!("Collector rejected telemetry (status {})", status.code),
            Err(e) => error!("Telemetry delivery failed: {:?}", e),
        }

        self.state = CycleState::Idle;
        CycleReport {
            cycle: self.cycles,
            record,
            delivery,
        }
    }

    /// Sleep for the configured interval.
    pub fn idle(&mut self) {
        self.state = CycleState::Idle;
        let millis = u32::try_from(self.sample_interval.as_millis()).unwrap_or(u32::MAX);
        self.delay.delay_ms(millis);
    }

    pub fn into_parts(self) -> (SensorsState<P, S, B>, C, T, D) {
        (self.sensors, self.clock, self.transport, self.delay)
    }
}

fn log_record(record: &TelemetryRecord) {
    info!("Timestamp: {}", record.timestamp);
    info!("Temperature: {} °C", Reading(record.temperature));
    info!("Humidity: {} %", Reading(record.humidity));
    info!("Pressure: {} Pa", Reading(record.pressure));
    info!("PM1.0: {} µg/m³", Reading(record.pm1));
    info!("PM2.5: {} µg/m³", Reading(record.pm2_5));
    info!("PM10 : {} µg/m³", Reading(record.pm10));

    for field in record.unavailable_fields() {
        warn!("{} unavailable in this record", field);
    }
}
