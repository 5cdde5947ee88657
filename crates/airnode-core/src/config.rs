use core::time::Duration;

use serde::{Deserialize, Serialize};
use time::UtcOffset;

use crate::error::ConfigurationError;
use crate::sensors::{bmp280, pm25, sht40};

/// Maximum length of the device identifier sent with every record.
pub const DEVICE_ID_CAPACITY: usize = 32;

pub type DeviceId = heapless::String<DEVICE_ID_CAPACITY>;

const DEFAULT_DEVICE_ID: &str = "agt_aqs_1";
const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_UTC_OFFSET_SECS: i32 = 2 * 3600;

/// Fixed 7-bit addresses of the three sensors on the shared bus.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusAddresses {
    pub pm25: u8,
    pub sht40: u8,
    pub bmp280: u8,
}

impl Default for BusAddresses {
    fn default() -> Self {
        Self {
            pm25: pm25::DEFAULT_ADDRESS,
            sht40: sht40::DEFAULT_ADDRESS,
            bmp280: bmp280::DEFAULT_ADDRESS,
        }
    }
}

/// Start-up parameters of the node.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub device_id: DeviceId,
    /// Sleep between the end of one sampling cycle and the start of the next.
    pub sample_interval: Duration,
    /// Offset applied to UTC before timestamps are formatted.
    pub utc_offset_secs: i32,
    pub addresses: BusAddresses,
    /// Wait between the PM command byte and the response read.
    pub pm_settle: Duration,
    /// Wait between the SHT40 measure command and the response read.
    pub sht_settle: Duration,
    /// Reject SHT40 frames whose CRC bytes do not match.
    pub verify_sht_crc: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let mut device_id = DeviceId::new();
        let _ = device_id.push_str(DEFAULT_DEVICE_ID);

        Self {
            device_id,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            utc_offset_secs: DEFAULT_UTC_OFFSET_SECS,
            addresses: BusAddresses::default(),
            pm_settle: pm25::DEFAULT_SETTLE,
            sht_settle: sht40::DEFAULT_SETTLE,
            verify_sht_crc: true,
        }
    }
}

impl NodeConfig {
    /// Replace the device identifier.
    pub fn with_device_id(mut self, id: &str) -> Result<Self, ConfigurationError> {
        let mut device_id = DeviceId::new();
        device_id
            .push_str(id)
            .map_err(|_| ConfigurationError::DeviceIdTooLong(DEVICE_ID_CAPACITY))?;
        self.device_id = device_id;
        Ok(self)
    }

    pub fn utc_offset(&self) -> Result<UtcOffset, ConfigurationError> {
        UtcOffset::from_whole_seconds(self.utc_offset_secs)
            .map_err(|_| ConfigurationError::InvalidUtcOffset(self.utc_offset_secs))
    }
}
