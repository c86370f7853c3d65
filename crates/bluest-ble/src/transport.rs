//! `GattTransport` over a connected btleplug peripheral

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use btleplug::api::{CharPropFlags, Characteristic, Peripheral as _, WriteType};
use btleplug::platform::Peripheral;
use futures::stream::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use bluest_core::{
    CharacteristicHandle, CharacteristicInfo, DeviceSession, GattTransport, Timestamp,
    TransportError,
};

use crate::error::{map_btleplug_error, BleTransportError, GattOperation};

// ----------------------------------------------------------------------------
// btleplug Transport
// ----------------------------------------------------------------------------

/// GATT access to one connected node
pub struct BtleTransport {
    peripheral: Peripheral,
    characteristics: BTreeMap<CharacteristicHandle, Characteristic>,
}

impl BtleTransport {
    /// Wrap a peripheral whose services have already been discovered
    pub fn new(peripheral: Peripheral) -> Self {
        let characteristics = peripheral
            .characteristics()
            .into_iter()
            .map(|c| (CharacteristicHandle::new(c.service_uuid, c.uuid), c))
            .collect::<BTreeMap<_, _>>();
        debug!(
            "Transport for {} tracks {} characteristics",
            peripheral.id(),
            characteristics.len()
        );
        Self {
            peripheral,
            characteristics,
        }
    }

    pub fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }

    fn lookup(&self, handle: &CharacteristicHandle) -> Result<&Characteristic, TransportError> {
        self.characteristics
            .get(handle)
            .ok_or(TransportError::CharacteristicNotFound { uuid: handle.uuid })
    }

    /// Feed the peripheral's notification stream into a session
    ///
    /// Decode failures are logged and the pump moves on to the next
    /// notification. The task ends when the stream closes.
    pub async fn spawn_notification_pump(
        &self,
        session: Arc<DeviceSession>,
    ) -> Result<JoinHandle<()>, BleTransportError> {
        let mut notifications = self
            .peripheral
            .notifications()
            .await
            .map_err(|e| BleTransportError::NotificationStreamFailed(e.to_string()))?;
        let id = self.peripheral.id();

        Ok(tokio::spawn(async move {
            while let Some(notification) = notifications.next().await {
                trace!(
                    "Notification from {}: {} bytes",
                    notification.uuid,
                    notification.value.len()
                );
                if let Err(e) = session.handle_notification(
                    &notification.uuid,
                    Timestamp::now(),
                    &notification.value,
                ) {
                    warn!("Dropping notification from {}: {}", notification.uuid, e);
                }
            }
            debug!("Notification pump for {} ended", id);
        }))
    }
}

#[async_trait]
impl GattTransport for BtleTransport {
    fn characteristics(&self) -> Vec<CharacteristicInfo> {
        self.characteristics
            .iter()
            .map(|(handle, c)| CharacteristicInfo {
                handle: *handle,
                notify: c.properties.contains(CharPropFlags::NOTIFY),
            })
            .collect()
    }

    async fn write_with_response(
        &self,
        characteristic: &CharacteristicHandle,
        data: &[u8],
    ) -> Result<(), TransportError> {
        let target = self.lookup(characteristic)?;
        self.peripheral
            .write(target, data, WriteType::WithResponse)
            .await
            .map_err(|e| map_btleplug_error(characteristic.uuid, GattOperation::Write, e))
    }

    async fn read_uncached(
        &self,
        characteristic: &CharacteristicHandle,
    ) -> Result<Vec<u8>, TransportError> {
        let target = self.lookup(characteristic)?;
        self.peripheral
            .read(target)
            .await
            .map_err(|e| map_btleplug_error(characteristic.uuid, GattOperation::Read, e))
    }

    async fn set_notifications(
        &self,
        characteristic: &CharacteristicHandle,
        enabled: bool,
    ) -> Result<(), TransportError> {
        let target = self.lookup(characteristic)?;
        let result = if enabled {
            self.peripheral.subscribe(target).await
        } else {
            self.peripheral.unsubscribe(target).await
        };
        result.map_err(|e| map_btleplug_error(characteristic.uuid, GattOperation::Notify, e))
    }
}
