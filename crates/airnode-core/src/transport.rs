//! Boundary to whatever delivers telemetry records to the collector.

use core::fmt::Debug;

use crate::telemetry::TelemetryRecord;

/// Outcome reported by the collector for one delivered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryStatus {
    /// Protocol status code, e.g. the HTTP status.
    pub code: u16,
}

impl DeliveryStatus {
    pub const fn new(code: u16) -> Self {
        Self { code }
    }

    pub const fn is_success(&self) -> bool {
        self.code >= 200 && self.code < 300
    }
}

/// Serializes and delivers a record.
///
/// The sampling loop only logs the outcome; retries, if any, belong to the
/// implementation.
pub trait Transport {
    type Error: Debug;

    fn send(&mut self, record: &TelemetryRecord) -> Result<DeliveryStatus, Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn send(&mut self, record: &TelemetryRecord) -> Result<DeliveryStatus, Self::Error> {
        (**self).send(record)
    }
}
