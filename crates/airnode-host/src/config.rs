//! Start-up configuration read from the environment.
//!
//! Every setting is optional and falls back to the deployed defaults. A
//! `.env` file in the working directory is loaded first when present.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use airnode_core::config::NodeConfig;

use crate::error::StartupError;

const DEFAULT_COLLECTOR_HOST: &str = "127.0.0.1";
const DEFAULT_COLLECTOR_PORT: u16 = 8080;
const DEFAULT_COLLECTOR_PATH: &str = "/aqc/apiv0";
const COLLECTOR_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_I2C_BUS: u8 = 1;

/// Where and how records are posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Full `Authorization` header value, e.g. `Basic ...`.
    pub authorization: Option<String>,
    /// Applied to connect, write and read separately.
    pub timeout: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_COLLECTOR_HOST.to_string(),
            port: DEFAULT_COLLECTOR_PORT,
            path: DEFAULT_COLLECTOR_PATH.to_string(),
            authorization: None,
            timeout: COLLECTOR_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub node: NodeConfig,
    pub collector: CollectorConfig,
    /// Linux I2C bus number, only used with real hardware.
    pub i2c_bus: u8,
}

impl HostConfig {
    pub fn from_env() -> Result<Self, StartupError> {
        // A missing .env file is not an error
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StartupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut node = NodeConfig::default();
        if let Some(id) = lookup("AIRNODE_DEVICE_ID") {
            node = node.with_device_id(id.trim())?;
        }
        if let Some(secs) = parse::<u64>(&lookup, "AIRNODE_SAMPLE_INTERVAL_SECS")? {
            node.sample_interval = Duration::from_secs(secs);
        }
        if let Some(offset) = parse::<i32>(&lookup, "AIRNODE_UTC_OFFSET_SECS")? {
            node.utc_offset_secs = offset;
        }
        if let Some(verify) = parse::<bool>(&lookup, "AIRNODE_VERIFY_SHT_CRC")? {
            node.verify_sht_crc = verify;
        }
        // Fail here rather than at controller construction
        node.utc_offset()?;

        let defaults = CollectorConfig::default();
        let collector = CollectorConfig {
            host: lookup("AIRNODE_COLLECTOR_HOST").unwrap_or(defaults.host),
            port: parse(&lookup, "AIRNODE_COLLECTOR_PORT")?.unwrap_or(defaults.port),
            path: lookup("AIRNODE_COLLECTOR_PATH")
                .map(normalize_path)
                .unwrap_or(defaults.path),
            authorization: lookup("AIRNODE_COLLECTOR_AUTH").filter(|v| !v.is_empty()),
            timeout: defaults.timeout,
        };

        let i2c_bus = parse(&lookup, "AIRNODE_I2C_BUS")?.unwrap_or(DEFAULT_I2C_BUS);

        Ok(Self {
            node,
            collector,
            i2c_bus,
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, StartupError> {
    let Some(value) = lookup(key) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| StartupError::InvalidSetting {
            key,
            value,
            reason: "not a valid value for this setting",
        })
}

fn normalize_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<HostConfig, StartupError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HostConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = config(&[]).unwrap();
        assert_eq!(config.node, NodeConfig::default());
        assert_eq!(config.collector, CollectorConfig::default());
        assert_eq!(config.i2c_bus, 1);
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("AIRNODE_DEVICE_ID", "agt_aqs_7"),
            ("AIRNODE_SAMPLE_INTERVAL_SECS", "60"),
            ("AIRNODE_UTC_OFFSET_SECS", "0"),
            ("AIRNODE_VERIFY_SHT_CRC", "false"),
            ("AIRNODE_COLLECTOR_HOST", "collector.local"),
            ("AIRNODE_COLLECTOR_PORT", "9000"),
            ("AIRNODE_COLLECTOR_PATH", "ingest"),
            ("AIRNODE_COLLECTOR_AUTH", "Bearer abc"),
            ("AIRNODE_I2C_BUS", "3"),
        ])
        .unwrap();

        assert_eq!(config.node.device_id.as_str(), "agt_aqs_7");
        assert_eq!(config.node.sample_interval, Duration::from_secs(60));
        assert_eq!(config.node.utc_offset_secs, 0);
        assert!(!config.node.verify_sht_crc);
        assert_eq!(config.collector.host, "collector.local");
        assert_eq!(config.collector.port, 9000);
        assert_eq!(config.collector.path, "/ingest");
        assert_eq!(config.collector.authorization.as_deref(), Some("Bearer abc"));
        assert_eq!(config.i2c_bus, 3);
    }

    #[test]
    fn test_unparsable_value_names_the_key() {
        let err = config(&[("AIRNODE_COLLECTOR_PORT", "eighty")]).unwrap_err();
        assert!(matches!(
            err,
            StartupError::InvalidSetting {
                key: "AIRNODE_COLLECTOR_PORT",
                ..
            }
        ));
    }

    #[test]
    fn test_out_of_range_utc_offset_is_rejected() {
        let err = config(&[("AIRNODE_UTC_OFFSET_SECS", "200000")]).unwrap_err();
        assert!(matches!(err, StartupError::Configuration(_)));
    }
}
