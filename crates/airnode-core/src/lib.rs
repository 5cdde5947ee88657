//! Sensor acquisition core of the airnode air-quality monitor.
//!
//! Everything in here is hardware independent: drivers talk to
//! [`embedded_hal::i2c::I2c`] handles, time comes from a [`telemetry::Clock`]
//! and records leave through a [`transport::Transport`]. The platform crate
//! provides the concrete bus, clock, delay and transport.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod bus;
pub mod compensation;
pub mod config;
pub mod error;
pub mod sampling;
pub mod sensors;
pub mod telemetry;
pub mod transport;
