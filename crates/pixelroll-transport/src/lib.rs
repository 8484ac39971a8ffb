//! Transport abstraction layer for pixelroll.
//!
//! Provides the [`Scanner`], [`Peripheral`] and [`DieLink`] traits that
//! abstract over the Bluetooth LE stack, plus [`connect_with_retry`],
//! which wraps [`Peripheral::open`] in the bounded retry loop every die
//! connection goes through.
//!
//! # Feature Flags
//!
//! - `ble` (default): real Bluetooth LE backend via `btleplug`
//!
//! The [`memory`] backend is always available. It is what the bridge's
//! tests drive, and it doubles as a simulator when no radio is around.

mod error;
#[cfg(feature = "ble")]
mod ble;
pub mod memory;
mod retry;

pub use error::TransportError;
#[cfg(feature = "ble")]
pub use ble::{BleLink, BlePeripheral, BleScanner};
pub use retry::{RetryPolicy, RetryState, RetryStep, connect_with_retry};

use std::future::Future;

use uuid::Uuid;

/// GATT identifiers of the Pixels dice service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GattIds {
    /// Primary service advertised by every die.
    pub service: Uuid,
    /// Characteristic the die notifies on.
    pub notify: Uuid,
    /// Characteristic the host writes commands to.
    pub write: Uuid,
}

impl GattIds {
    /// Identifiers used by Pixels firmware.
    pub const PIXELS: GattIds = GattIds {
        service: Uuid::from_u128(0x6e400001_b5a3_f393_e0a9_e50e24dcca9e),
        notify: Uuid::from_u128(0x6e400001_b5a3_f393_e0a9_e50e24dcca9e),
        write: Uuid::from_u128(0x6e400002_b5a3_f393_e0a9_e50e24dcca9e),
    };
}

impl Default for GattIds {
    fn default() -> Self {
        Self::PIXELS
    }
}

/// What a device request should match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSelector {
    /// Service UUID the device must advertise.
    pub service: Uuid,
    /// Optional advertised name to narrow the pick.
    pub name: Option<String>,
}

impl DeviceSelector {
    /// Matches any device advertising `service`.
    pub fn service(service: Uuid) -> Self {
        Self {
            service,
            name: None,
        }
    }

    /// Narrows the selector to one advertised name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Finds peripherals advertising a service.
pub trait Scanner: Send + Sync + 'static {
    /// The peripheral type produced by this scanner.
    type Peripheral: Peripheral;

    /// Waits for a device matching `selector` and returns it, unopened.
    fn request_device(
        &self,
        selector: &DeviceSelector,
    ) -> impl Future<Output = Result<Self::Peripheral, TransportError>> + Send;
}

/// A device that has been found but not necessarily connected.
pub trait Peripheral: Send + Sync + 'static {
    /// The open link produced by [`Peripheral::open`].
    type Link: DieLink;

    /// The advertised name of the device.
    fn name(&self) -> &str;

    /// Connects, resolves the service and its characteristics, and
    /// subscribes to notifications.
    ///
    /// A missing write characteristic is not an error: the returned link
    /// reports `can_write() == false` instead.
    fn open(
        &self,
    ) -> impl Future<Output = Result<Self::Link, TransportError>> + Send;
}

/// An open, subscribed connection to one die.
pub trait DieLink: Send + Sync + 'static {
    /// Receives the next notification payload.
    ///
    /// Returns `Ok(None)` when the link is closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Writes a command to the die.
    ///
    /// # Errors
    /// Returns `TransportError::WriteUnavailable` if the die has no write
    /// characteristic.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Whether the die exposes a write characteristic.
    fn can_write(&self) -> bool;

    /// Disconnects from the die.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}
