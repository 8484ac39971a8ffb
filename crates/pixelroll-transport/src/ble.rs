//! Bluetooth LE backend built on `btleplug`.

use std::pin::Pin;
use std::time::Duration;

use btleplug::api::{
    Central, Characteristic, Manager as _, Peripheral as _, ScanFilter,
    ValueNotification, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral as PlatformPeripheral};
use futures_util::{Stream, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    DeviceSelector, DieLink, GattIds, Peripheral, Scanner, TransportError,
};

/// How often the adapter's peripheral list is polled while scanning.
const SCAN_POLL: Duration = Duration::from_millis(250);

type NotificationStream = Pin<Box<dyn Stream<Item = ValueNotification> + Send>>;

/// Scans the first available adapter for Pixels dice.
pub struct BleScanner {
    adapter: Adapter,
    ids: GattIds,
    scan_timeout: Duration,
}

impl BleScanner {
    /// Opens the first Bluetooth adapter on the system.
    ///
    /// # Errors
    /// Returns `TransportError::AdapterUnavailable` if there is none.
    pub async fn new(
        ids: GattIds,
        scan_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(TransportError::AdapterUnavailable)?;
        info!(service = %ids.service, "bluetooth adapter ready");
        Ok(Self {
            adapter,
            ids,
            scan_timeout,
        })
    }

    async fn find(
        &self,
        selector: &DeviceSelector,
    ) -> Result<BlePeripheral, TransportError> {
        loop {
            for peripheral in self.adapter.peripherals().await? {
                let Some(props) = peripheral.properties().await? else {
                    continue;
                };
                if !props.services.contains(&selector.service) {
                    continue;
                }
                let name = props
                    .local_name
                    .unwrap_or_else(|| format!("{:?}", peripheral.id()));
                if selector.name.as_ref().is_some_and(|wanted| *wanted != name) {
                    continue;
                }
                debug!(die = %name, "found advertising die");
                return Ok(BlePeripheral {
                    peripheral,
                    name,
                    ids: self.ids,
                });
            }
            tokio::time::sleep(SCAN_POLL).await;
        }
    }
}

impl Scanner for BleScanner {
    type Peripheral = BlePeripheral;

    async fn request_device(
        &self,
        selector: &DeviceSelector,
    ) -> Result<BlePeripheral, TransportError> {
        self.adapter
            .start_scan(ScanFilter {
                services: vec![selector.service],
            })
            .await?;

        let found = tokio::time::timeout(self.scan_timeout, self.find(selector)).await;

        if let Err(e) = self.adapter.stop_scan().await {
            warn!(error = %e, "failed to stop scan");
        }

        found.unwrap_or(Err(TransportError::NoDevice {
            service: selector.service,
        }))
    }
}

/// A die found by [`BleScanner`].
pub struct BlePeripheral {
    peripheral: PlatformPeripheral,
    name: String,
    ids: GattIds,
}

impl Peripheral for BlePeripheral {
    type Link = BleLink;

    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self) -> Result<BleLink, TransportError> {
        if !self.peripheral.is_connected().await? {
            self.peripheral.connect().await?;
        }
        match self.attach().await {
            Ok(link) => Ok(link),
            Err(e) => {
                if let Err(close) = self.peripheral.disconnect().await {
                    warn!(die = %self.name, error = %close, "disconnect after failed open failed");
                }
                Err(e)
            }
        }
    }
}

impl BlePeripheral {
    /// Finds the die's characteristics on a connected peripheral and
    /// subscribes to notifications.
    async fn attach(&self) -> Result<BleLink, TransportError> {
        self.peripheral.discover_services().await?;

        let service = self
            .peripheral
            .services()
            .into_iter()
            .find(|s| s.uuid == self.ids.service)
            .ok_or(TransportError::ServiceNotFound(self.ids.service))?;
        let notify = service
            .characteristics
            .iter()
            .find(|c| c.uuid == self.ids.notify)
            .cloned()
            .ok_or(TransportError::CharacteristicNotFound(self.ids.notify))?;
        let write = service
            .characteristics
            .iter()
            .find(|c| c.uuid == self.ids.write)
            .cloned();
        if write.is_none() {
            warn!(die = %self.name, "no write characteristic; animations disabled");
        }

        self.peripheral.subscribe(&notify).await?;
        let notifications = self.peripheral.notifications().await?;

        Ok(BleLink {
            peripheral: self.peripheral.clone(),
            notify: notify.uuid,
            write,
            notifications: Mutex::new(notifications),
        })
    }
}

/// An open link to a die over Bluetooth LE.
pub struct BleLink {
    peripheral: PlatformPeripheral,
    notify: Uuid,
    write: Option<Characteristic>,
    notifications: Mutex<NotificationStream>,
}

impl DieLink for BleLink {
    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut stream = self.notifications.lock().await;
        while let Some(notification) = stream.next().await {
            if notification.uuid == self.notify {
                return Ok(Some(notification.value));
            }
        }
        Ok(None)
    }

    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let Some(characteristic) = &self.write else {
            return Err(TransportError::WriteUnavailable);
        };
        self.peripheral
            .write(characteristic, data, WriteType::WithoutResponse)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn can_write(&self) -> bool {
        self.write.is_some()
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
