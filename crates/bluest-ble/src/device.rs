//! Discovered BlueST nodes and their connection state

use btleplug::api::Peripheral as _;
use btleplug::platform::{Peripheral, PeripheralId};

use bluest_core::{AdvertisementRecord, FeatureMask};

// ----------------------------------------------------------------------------
// Device State Management
// ----------------------------------------------------------------------------

/// Connection state of a discovered node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// A node found by scanning, with its parsed advertisement
#[derive(Debug, Clone)]
pub struct DiscoveredDevice {
    pub peripheral: Peripheral,
    /// Advertised local name
    pub name: Option<String>,
    pub rssi: Option<i16>,
    pub advertisement: AdvertisementRecord,
    pub connection_state: ConnectionState,
}

impl DiscoveredDevice {
    pub fn new(
        peripheral: Peripheral,
        name: Option<String>,
        rssi: Option<i16>,
        advertisement: AdvertisementRecord,
    ) -> Self {
        Self {
            peripheral,
            name,
            rssi,
            advertisement,
            connection_state: ConnectionState::Disconnected,
        }
    }

    /// Features announced in the advertisement
    pub fn features(&self) -> FeatureMask {
        self.advertisement.features
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }

    pub fn id(&self) -> PeripheralId {
        self.peripheral.id()
    }

    pub(crate) fn mark_connecting(&mut self) {
        self.connection_state = ConnectionState::Connecting;
    }

    pub(crate) fn mark_connected(&mut self) {
        self.connection_state = ConnectionState::Connected;
    }

    pub(crate) fn mark_failed(&mut self) {
        self.connection_state = ConnectionState::Failed;
    }

    pub(crate) fn mark_disconnected(&mut self) {
        self.connection_state = ConnectionState::Disconnected;
    }
}
