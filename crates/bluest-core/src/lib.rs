//! BlueST Core Protocol Implementation
//!
//! This crate implements the client side of the BlueST telemetry protocol
//! spoken by STMicroelectronics sensor nodes over Bluetooth Low Energy:
//! advertisement parsing, feature discovery, notification decoding and
//! fan-out, polled configuration register access, and a cancellable
//! notification pipeline. It is transport agnostic; a BLE stack plugs in
//! through [`GattTransport`].

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod errors;
pub mod pipeline;
pub mod protocol;
pub mod sensor_config;
pub mod session;
pub mod transport;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{PipelineConfig, SessionConfig};
pub use errors::{BlueStError, BlueStResult, TransportError};
pub use pipeline::{NotificationPipeline, PipelineProducer, PipelineStats};
pub use protocol::{
    AdvertisementRecord, BatteryData, DecodedPayload, MotionAxes, PayloadKind, Persistence,
    RegisterDescriptor, TransactionState,
};
pub use sensor_config::{MotionRates, SensorConfig};
pub use session::{
    AggregateFeature, DeviceSession, FeatureFrame, FeatureSource, FrameListener, ListenerId,
};
pub use transport::{CharacteristicHandle, CharacteristicInfo, GattTransport};
pub use types::{CancelToken, DeviceId, DeviceMac, FeatureMask, Timestamp};
