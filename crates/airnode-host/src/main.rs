//! airnode: air-quality node runner.
//!
//! Reads the PM, humidity and barometric sensors every sampling interval and
//! posts one JSON record per cycle to the collector. Without the `rpi`
//! feature the sensors are emulated on a simulated bus so the whole pipeline
//! can run on a desktop.
//!
//! Records are posted over plain HTTP; an HTTPS collector needs a
//! TLS-terminating proxy in front of it.
//!
//! Logging is controlled with `RUST_LOG` (default `info`).

mod config;
mod error;
mod http;
mod platform;
#[cfg(feature = "rpi")]
mod rpi;
#[cfg(any(test, not(feature = "rpi")))]
mod sim;

use std::cell::RefCell;
use std::process::ExitCode;

use airnode_core::bus::{SharedBus, SharedI2cDevice};
use airnode_core::sampling::SamplingController;
use airnode_core::sensors::SensorsState;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::i2c::I2c;
use log::{error, info, warn};

use crate::config::HostConfig;
use crate::error::StartupError;
use crate::http::HttpTransport;
use crate::platform::{SystemClock, ThreadDelay};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match start() {
        Ok(never) => match never {},
        Err(e) => {
            error!("airnode failed to start: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn start() -> Result<std::convert::Infallible, StartupError> {
    let config = HostConfig::from_env()?;
    info!(
        "Device {} posting to {}:{}{}",
        config.node.device_id, config.collector.host, config.collector.port, config.collector.path
    );

    #[cfg(feature = "rpi")]
    let i2c = rpi::open_bus(config.i2c_bus)?;
    #[cfg(not(feature = "rpi"))]
    let i2c = {
        info!("Using the simulated I2C bus");
        sim::SimulatedBus::new(config.node.addresses)
    };

    run(config, i2c)
}

fn run<T: I2c>(config: HostConfig, i2c: T) -> Result<std::convert::Infallible, StartupError> {
    let bus: SharedBus<T> = Mutex::new(RefCell::new(i2c));

    let mut sensors = SensorsState::from_config(
        SharedI2cDevice::new(&bus),
        SharedI2cDevice::new(&bus),
        SharedI2cDevice::new(&bus),
        &config.node,
    );

    let mut delay = ThreadDelay;
    match sensors.pm25.firmware_version(&mut delay) {
        Ok(version) => info!("PM sensor firmware version {:#04x}", version),
        Err(e) => warn!("PM sensor did not report a firmware version: {}", e),
    }

    // Without calibration no pressure can ever be computed
    sensors.bmp280.init()?;

    let mut controller = SamplingController::new(
        &config.node,
        sensors,
        SystemClock,
        HttpTransport::new(config.collector),
        delay,
    )?;

    controller.run()
}
