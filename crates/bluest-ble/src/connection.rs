//! Connecting to a node and running a protocol session over it

use std::sync::Arc;

use btleplug::api::Peripheral as _;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

use bluest_core::{AggregateFeature, BlueStResult, DeviceSession, FeatureMask, SessionConfig};

use crate::config::BleConfig;
use crate::device::DiscoveredDevice;
use crate::error::BleTransportError;
use crate::transport::BtleTransport;

// ----------------------------------------------------------------------------
// Connection Management
// ----------------------------------------------------------------------------

/// Connect to a discovered node and discover its services
pub async fn connect(
    device: &mut DiscoveredDevice,
    config: &BleConfig,
) -> Result<BtleTransport, BleTransportError> {
    if !device.is_connected() {
        device.mark_connecting();
        match timeout(config.connection_timeout, device.peripheral.connect()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                device.mark_failed();
                error!("Failed to connect to {}: {}", device.id(), e);
                return Err(BleTransportError::ConnectionFailed(e.to_string()));
            }
            Err(_) => {
                device.mark_failed();
                error!("Connection to {} timed out", device.id());
                return Err(BleTransportError::ConnectionTimeout);
            }
        }
    }

    if let Err(e) = device.peripheral.discover_services().await {
        device.mark_failed();
        error!("Failed to discover services for {}: {}", device.id(), e);
        return Err(BleTransportError::ServiceDiscoveryFailed(e.to_string()));
    }

    device.mark_connected();
    info!("Connected to {:?} ({})", device.name, device.id());
    Ok(BtleTransport::new(device.peripheral.clone()))
}

/// Live session on a connected node with its notification pump
pub struct BlueStConnection {
    transport: Arc<BtleTransport>,
    session: Arc<DeviceSession>,
    pump: JoinHandle<()>,
}

impl BlueStConnection {
    /// Connect, build the session and start delivering notifications to it
    pub async fn open(
        device: &mut DiscoveredDevice,
        ble_config: &BleConfig,
        aggregates: Vec<AggregateFeature>,
        session_config: SessionConfig,
    ) -> BlueStResult<Self> {
        let transport = Arc::new(connect(device, ble_config).await?);
        let session = Arc::new(DeviceSession::new(
            transport.clone(),
            aggregates,
            session_config,
        )?);
        let pump = transport.spawn_notification_pump(session.clone()).await?;

        Ok(Self {
            transport,
            session,
            pump,
        })
    }

    pub fn session(&self) -> &Arc<DeviceSession> {
        &self.session
    }

    /// Arm notifications for `features`
    pub async fn start(&self, features: FeatureMask) -> BlueStResult<usize> {
        self.session.enable_notifications(features).await
    }

    /// Disarm notifications, stop the pump and disconnect
    ///
    /// The link is torn down even if disarming fails; that failure is
    /// returned afterwards.
    pub async fn close(self, device: &mut DiscoveredDevice) -> BlueStResult<()> {
        let teardown = self.session.disable_all_notifications().await;
        self.pump.abort();

        if let Err(e) = self.transport.peripheral().disconnect().await {
            warn!("Failed to disconnect from {}: {}", device.id(), e);
        }
        device.mark_disconnected();
        info!("Disconnected from {}", device.id());
        teardown
    }
}
