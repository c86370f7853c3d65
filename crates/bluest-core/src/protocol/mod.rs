//! BlueST Protocol Module
//!
//! This module contains the wire-level pieces of the BlueST protocol:
//! - `feature_mask`: Feature characteristic UUIDs and service identifiers
//! - `advertisement`: Manufacturer-specific advertisement records
//! - `frame`: Telemetry notification payload decoding
//! - `register`: Register-access control header and polled transactions
//! - `register_map`: Static map of configuration registers

pub mod advertisement;
pub mod feature_mask;
pub mod frame;
pub mod register;
pub mod register_map;

// Re-export characteristic identifiers
pub use feature_mask::{
    feature_characteristic_uuid, feature_mask_of, is_feature_characteristic, CONFIG_SERVICE_UUID,
    DATA_SERVICE_UUID, DEBUG_SERVICE_UUID, REGISTER_ACCESS_CHARACTERISTIC_UUID,
};

// Re-export advertisement types
pub use advertisement::AdvertisementRecord;

// Re-export frame types
pub use frame::{
    decode_aggregate, decode_single, BatteryData, DecodedPayload, FrameCursor, FrameShape,
    MotionAxes, PayloadKind, Payloads,
};

// Re-export register types
pub use register::{
    encode_read_request, encode_write_request, parse_response, Persistence, PollOutcome,
    RegisterAccess, RegisterAccessControl, TransactionState,
};
pub use register_map::{RegisterDescriptor, REGISTER_MAP};
