//! Transport collaborator contract
//!
//! The protocol layer never talks to a BLE stack directly. A connected
//! peripheral is exposed through [`GattTransport`]; notification delivery is
//! driven by the transport, which calls
//! [`DeviceSession::handle_notification`](crate::session::DeviceSession::handle_notification)
//! from its own task.

use core::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::TransportError;

// ----------------------------------------------------------------------------
// Characteristic Identity
// ----------------------------------------------------------------------------

/// Opaque identity of a discovered characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CharacteristicHandle {
    pub service: Uuid,
    pub uuid: Uuid,
}

impl CharacteristicHandle {
    pub fn new(service: Uuid, uuid: Uuid) -> Self {
        Self { service, uuid }
    }
}

impl fmt::Display for CharacteristicHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.uuid)
    }
}

/// A discovered characteristic together with its notify capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacteristicInfo {
    pub handle: CharacteristicHandle,
    pub notify: bool,
}

// ----------------------------------------------------------------------------
// Transport Trait
// ----------------------------------------------------------------------------

/// Raw GATT operations on one connected peripheral
#[async_trait]
pub trait GattTransport: Send + Sync {
    /// Every characteristic discovered on the peripheral
    fn characteristics(&self) -> Vec<CharacteristicInfo>;

    /// Write with acknowledged delivery
    async fn write_with_response(
        &self,
        characteristic: &CharacteristicHandle,
        data: &[u8],
    ) -> Result<(), TransportError>;

    /// Read the current value from the device, bypassing any cache
    async fn read_uncached(
        &self,
        characteristic: &CharacteristicHandle,
    ) -> Result<Vec<u8>, TransportError>;

    /// Arm or disarm notification delivery
    async fn set_notifications(
        &self,
        characteristic: &CharacteristicHandle,
        enabled: bool,
    ) -> Result<(), TransportError>;
}
