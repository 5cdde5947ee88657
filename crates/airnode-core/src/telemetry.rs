//! The record sent to the collector after every sampling cycle.

use core::fmt::{self, Display, Write as _};

use serde::Serialize;
use time::OffsetDateTime;

use crate::config::DeviceId;
use crate::sensors::SensorSnapshot;

/// `YYYY-MM-DDTHH:MM:SS`
pub const TIMESTAMP_LEN: usize = 19;

pub type Timestamp = heapless::String<TIMESTAMP_LEN>;

/// Source of the current wall-clock time.
///
/// Keeping it trusted (NTP or otherwise) is the platform's job.
pub trait Clock {
    fn now_utc(&mut self) -> OffsetDateTime;
}

/// One sampling cycle's worth of readings.
///
/// Sensor fields are `None` when the reading failed; they serialize as
/// `null` so the collector can tell a failed read from a zero reading.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    pub device_id: DeviceId,
    pub timestamp: Timestamp,
    /// °C
    pub temperature: Option<f64>,
    /// %RH
    pub humidity: Option<f64>,
    /// Pa
    pub pressure: Option<f64>,
    /// µg/m³
    pub pm1: Option<u16>,
    pub pm2_5: Option<u16>,
    pub pm10: Option<u16>,
}

impl TelemetryRecord {
    pub fn new(device_id: DeviceId, timestamp: Timestamp, snapshot: &SensorSnapshot) -> Self {
        Self {
            device_id,
            timestamp,
            temperature: snapshot.temperature_celsius,
            humidity: snapshot.humidity_percent,
            pressure: snapshot.pressure_pa,
            pm1: snapshot.pm1_0,
            pm2_5: snapshot.pm2_5,
            pm10: snapshot.pm10,
        }
    }

    /// Names of the fields that are unavailable in this record.
    pub fn unavailable_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        [
            ("temperature", self.temperature.is_none()),
            ("humidity", self.humidity.is_none()),
            ("pressure", self.pressure.is_none()),
            ("pm1", self.pm1.is_none()),
            ("pm2_5", self.pm2_5.is_none()),
            ("pm10", self.pm10.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
    }

    pub fn is_complete(&self) -> bool {
        self.unavailable_fields().next().is_none()
    }
}

/// Formats a local date-time as `YYYY-MM-DDTHH:MM:SS`, without a zone suffix.
pub fn format_timestamp(local: OffsetDateTime) -> Timestamp {
    let mut ts = Timestamp::new();
    // Only years past 9999 overflow the buffer; the string is then truncated.
    let _ = write!(
        ts,
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        local.year(),
        u8::from(local.month()),
        local.day(),
        local.hour(),
        local.minute(),
        local.second()
    );
    ts
}

/// Displays a reading, or `unavailable` when it is missing.
pub struct Reading<T>(pub Option<T>);

impl<T: Display> Display for Reading<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(value) => value.fmt(f),
            None => f.write_str("unavailable"),
        }
    }
}
