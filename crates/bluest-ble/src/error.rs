//! Error types for the BLE transport

use bluest_core::{BlueStError, TransportError};
use thiserror::Error;
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors raised while scanning for or connecting to a node
#[derive(Error, Debug)]
pub enum BleTransportError {
    #[error("Failed to create BLE manager: {0}")]
    ManagerFailed(String),

    #[error("BLE adapter not available")]
    AdapterNotAvailable,

    #[error("Failed to scan for devices: {0}")]
    ScanFailed(String),

    #[error("Failed to connect to device: {0}")]
    ConnectionFailed(String),

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Failed to discover services: {0}")]
    ServiceDiscoveryFailed(String),

    #[error("Failed to get notifications stream: {0}")]
    NotificationStreamFailed(String),
}

impl From<BleTransportError> for BlueStError {
    fn from(err: BleTransportError) -> Self {
        BlueStError::Transport(TransportError::Other(err.to_string()))
    }
}

// ----------------------------------------------------------------------------
// btleplug Error Mapping
// ----------------------------------------------------------------------------

/// GATT operation a btleplug error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GattOperation {
    Write,
    Read,
    Notify,
}

/// Translate a btleplug failure into the protocol layer's transport error
pub(crate) fn map_btleplug_error(
    uuid: Uuid,
    operation: GattOperation,
    err: btleplug::Error,
) -> TransportError {
    match err {
        btleplug::Error::NotConnected | btleplug::Error::DeviceNotFound => {
            TransportError::Unreachable { uuid }
        }
        btleplug::Error::NoSuchCharacteristic => TransportError::CharacteristicNotFound { uuid },
        other => {
            let reason = other.to_string();
            match operation {
                GattOperation::Write => TransportError::WriteFailed { uuid, reason },
                GattOperation::Read => TransportError::ReadFailed { uuid, reason },
                GattOperation::Notify => TransportError::NotifyFailed { uuid, reason },
            }
        }
    }
}
