//! Error types for the BlueST protocol
//!
//! This module contains the transport-facing [`TransportError`] reported by a
//! [`GattTransport`](crate::transport::GattTransport) implementation and the
//! main [`BlueStError`] type that every public operation returns.

use uuid::Uuid;

// ----------------------------------------------------------------------------
// Transport Errors
// ----------------------------------------------------------------------------

/// Errors reported by the BLE transport collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Write to characteristic {uuid} failed: {reason}")]
    WriteFailed { uuid: Uuid, reason: String },
    #[error("Read from characteristic {uuid} failed: {reason}")]
    ReadFailed { uuid: Uuid, reason: String },
    #[error("Changing notification state of {uuid} failed: {reason}")]
    NotifyFailed { uuid: Uuid, reason: String },
    #[error("Device unreachable while accessing {uuid}")]
    Unreachable { uuid: Uuid },
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound { uuid: Uuid },
    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether the device had already gone away when the operation ran
    pub fn is_unreachable(&self) -> bool {
        matches!(self, TransportError::Unreachable { .. })
    }
}

// ----------------------------------------------------------------------------
// Main Error Type
// ----------------------------------------------------------------------------

/// Core error type for the BlueST protocol layer
#[derive(Debug, thiserror::Error)]
pub enum BlueStError {
    #[error("Invalid data format: {reason}")]
    Format { reason: String },

    #[error("Invalid argument: {reason}")]
    Argument { reason: String },

    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("Device reported an error accessing register 0x{index:02X}: code=0x{code:02X}")]
    Access { index: u8, code: u8 },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to enable notifications on {uuid}: {source}")]
    Notification {
        uuid: Uuid,
        #[source]
        source: TransportError,
    },

    #[error("Failed to disable notifications on {} characteristic(s)", failures.len())]
    NotificationTeardown { failures: Vec<(Uuid, TransportError)> },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Unsupported operation: {reason}")]
    Unsupported { reason: String },

    #[error("Truncated frame: needed {expected} bytes, {available} available")]
    TruncatedFrame { expected: usize, available: usize },

    #[error("Index out of range: {required} bytes at offset {offset}, buffer holds {available}")]
    Index {
        offset: usize,
        required: usize,
        available: usize,
    },
}

impl BlueStError {
    /// Create a format error
    pub fn format(reason: impl Into<String>) -> Self {
        Self::Format {
            reason: reason.into(),
        }
    }

    /// Create an argument error
    pub fn argument(reason: impl Into<String>) -> Self {
        Self::Argument {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Create an unsupported-operation error
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported {
            reason: reason.into(),
        }
    }
}

/// Result type used throughout the crate
pub type BlueStResult<T> = core::result::Result<T, BlueStError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_error_display() {
        let err = BlueStError::Access {
            index: 0x74,
            code: 0x0a,
        };
        assert_eq!(
            err.to_string(),
            "Device reported an error accessing register 0x74: code=0x0A"
        );
    }

    #[test]
    fn test_transport_error_conversion() {
        let uuid = Uuid::nil();
        let err: BlueStError = TransportError::Unreachable { uuid }.into();
        assert!(matches!(
            err,
            BlueStError::Transport(TransportError::Unreachable { .. })
        ));
    }

    #[test]
    fn test_teardown_display_counts_failures() {
        let failures = vec![
            (Uuid::nil(), TransportError::Other("a".into())),
            (Uuid::from_u128(1), TransportError::Other("b".into())),
        ];
        let err = BlueStError::NotificationTeardown { failures };
        assert_eq!(
            err.to_string(),
            "Failed to disable notifications on 2 characteristic(s)"
        );
    }
}
