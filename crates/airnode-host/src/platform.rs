//! Clock and delay backed by the operating system.

use std::thread;
use std::time::Duration;

use airnode_core::telemetry::Clock;
use embedded_hal::delay::DelayNs;
use time::OffsetDateTime;

/// Wall-clock time from the host. Keeping it synchronised (NTP) is left to
/// the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&mut self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Blocking delay that parks the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(ns.into()));
    }

    fn delay_us(&mut self, us: u32) {
        thread::sleep(Duration::from_micros(us.into()));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms.into()));
    }
}
