//! Blocking I2C bus primitives and bus sharing.
//!
//! The platform owns the bus and hands the core any `embedded_hal::i2c::I2c`
//! implementation. [`RegisterBus`] adds the register-addressed primitives the
//! drivers are written against, and [`SharedI2cDevice`] lets the three
//! drivers each hold their own handle to one physical bus.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::i2c::{Error as _, ErrorType, I2c, Operation};

use crate::error::BusError;

/// A bus shared by every driver on the node.
pub type SharedBus<T> = Mutex<CriticalSectionRawMutex, RefCell<T>>;

/// Register-addressed read/write primitives on top of a raw I2C bus.
///
/// Every failure is reported as a [`BusError`]; nothing here retries.
pub trait RegisterBus {
    /// Write `bytes` to the device.
    fn write_bytes(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError>;

    /// Read exactly `N` bytes from the device.
    fn read_bytes<const N: usize>(&mut self, address: u8) -> Result<[u8; N], BusError>;

    /// Select `register` and read `N` bytes back in a single transaction.
    fn read_register<const N: usize>(
        &mut self,
        address: u8,
        register: u8,
    ) -> Result<[u8; N], BusError>;

    /// Write a single value into `register`.
    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        self.write_bytes(address, &[register, value])
    }
}

impl<T: I2c> RegisterBus for T {
    fn write_bytes(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.write(address, bytes)
            .map_err(|e| BusError::new(address, e.kind()))
    }

    fn read_bytes<const N: usize>(&mut self, address: u8) -> Result<[u8; N], BusError> {
        let mut buf = [0u8; N];
        self.read(address, &mut buf)
            .map_err(|e| BusError::new(address, e.kind()))?;
        Ok(buf)
    }

    fn read_register<const N: usize>(
        &mut self,
        address: u8,
        register: u8,
    ) -> Result<[u8; N], BusError> {
        let mut buf = [0u8; N];
        self.write_read(address, &[register], &mut buf)
            .map_err(|e| BusError::new(address, e.kind()))?;
        Ok(buf)
    }
}

/// Blocking I2C bus sharing device.
///
/// Each driver gets its own `SharedI2cDevice`; all of them point at the same
/// [`SharedBus`]. The bus is locked for the whole duration of every
/// operation, so transfers from different drivers can never interleave, even
/// when the core runs inside a multi-threaded host.
///
/// # Example
///
/// ```ignore
/// use core::cell::RefCell;
/// use embassy_sync::blocking_mutex::Mutex;
///
/// let bus: SharedBus<_> = Mutex::new(RefCell::new(i2c));
///
/// let pm_i2c = SharedI2cDevice::new(&bus);
/// let sht_i2c = SharedI2cDevice::new(&bus);
/// ```
pub struct SharedI2cDevice<'a, T> {
    bus: &'a SharedBus<T>,
}

impl<'a, T> SharedI2cDevice<'a, T> {
    /// Create a new `SharedI2cDevice`.
    #[inline]
    pub const fn new(bus: &'a SharedBus<T>) -> Self {
        Self { bus }
    }
}

impl<T> Clone for SharedI2cDevice<'_, T> {
    fn clone(&self) -> Self {
        Self { bus: self.bus }
    }
}

impl<T> ErrorType for SharedI2cDevice<'_, T>
where
    T: ErrorType,
{
    type Error = T::Error;
}

impl<T> I2c for SharedI2cDevice<'_, T>
where
    T: I2c,
{
    #[inline]
    fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        self.bus.lock(|bus| bus.borrow_mut().read(address, read))
    }

    #[inline]
    fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        self.bus.lock(|bus| bus.borrow_mut().write(address, write))
    }

    #[inline]
    fn write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.bus
            .lock(|bus| bus.borrow_mut().write_read(address, write, read))
    }

    #[inline]
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.bus
            .lock(|bus| bus.borrow_mut().transaction(address, operations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use std::vec;

    #[test]
    fn test_read_register_uses_write_read() {
        let expectations = [I2cTransaction::write_read(
            0x76,
            vec![0xD0],
            vec![0x58],
        )];
        let mut i2c = I2cMock::new(&expectations);

        let id: [u8; 1] = i2c.read_register(0x76, 0xD0).unwrap();
        assert_eq!(id, [0x58]);

        i2c.done();
    }

    #[test]
    fn test_bus_error_carries_address_and_kind() {
        let expectations =
            [I2cTransaction::read(0x19, vec![0x00, 0x00]).with_error(ErrorKind::Other)];
        let mut i2c = I2cMock::new(&expectations);

        let err = i2c.read_bytes::<2>(0x19).unwrap_err();
        assert_eq!(err, BusError::new(0x19, ErrorKind::Other));

        i2c.done();
    }

    #[test]
    fn test_shared_devices_drive_the_same_bus() {
        let expectations = [
            I2cTransaction::write(0x19, vec![0x05]),
            I2cTransaction::write(0x44, vec![0xFD]),
            I2cTransaction::read(0x19, vec![0x00, 0x2A]),
        ];
        let mock = I2cMock::new(&expectations);
        let bus: SharedBus<I2cMock> = Mutex::new(RefCell::new(mock));

        let mut pm = SharedI2cDevice::new(&bus);
        let mut sht = pm.clone();

        pm.write_bytes(0x19, &[0x05]).unwrap();
        sht.write_bytes(0x44, &[0xFD]).unwrap();
        assert_eq!(pm.read_bytes::<2>(0x19).unwrap(), [0x00, 0x2A]);

        bus.lock(|bus| bus.borrow_mut().done());
    }
}
