//! Static configuration register map
//!
//! All registers hold one little-endian 16-bit word.

use serde::Serialize;

use crate::protocol::register::Persistence;

/// Static description of one configuration register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RegisterDescriptor {
    pub name: &'static str,
    pub index: u8,
    /// Always a whole number of 2-byte words
    pub width: usize,
    pub writable: bool,
    pub persistence: Persistence,
}

impl RegisterDescriptor {
    const fn word(name: &'static str, index: u8, writable: bool) -> Self {
        Self {
            name,
            index,
            width: 2,
            writable,
            persistence: Persistence::Persistent,
        }
    }
}

pub const FIRMWARE_VERSION: RegisterDescriptor =
    RegisterDescriptor::word("firmware_version", 0x00, false);
pub const TIMER_FREQUENCY: RegisterDescriptor =
    RegisterDescriptor::word("timer_frequency", 0x21, true);
pub const ACCELEROMETER_FULL_SCALE: RegisterDescriptor =
    RegisterDescriptor::word("accelerometer_full_scale", 0x74, true);
pub const ACCELEROMETER_OUTPUT_DATA_RATE: RegisterDescriptor =
    RegisterDescriptor::word("accelerometer_output_data_rate", 0x75, true);
pub const GYROSCOPE_FULL_SCALE: RegisterDescriptor =
    RegisterDescriptor::word("gyroscope_full_scale", 0x76, true);
pub const GYROSCOPE_OUTPUT_DATA_RATE: RegisterDescriptor =
    RegisterDescriptor::word("gyroscope_output_data_rate", 0x77, true);
pub const MAGNETOMETER_FULL_SCALE: RegisterDescriptor =
    RegisterDescriptor::word("magnetometer_full_scale", 0x78, true);
pub const MAGNETOMETER_OUTPUT_DATA_RATE: RegisterDescriptor =
    RegisterDescriptor::word("magnetometer_output_data_rate", 0x79, true);

/// Every known register, in load/save order
pub const REGISTER_MAP: &[RegisterDescriptor] = &[
    FIRMWARE_VERSION,
    ACCELEROMETER_FULL_SCALE,
    ACCELEROMETER_OUTPUT_DATA_RATE,
    GYROSCOPE_FULL_SCALE,
    GYROSCOPE_OUTPUT_DATA_RATE,
    MAGNETOMETER_FULL_SCALE,
    MAGNETOMETER_OUTPUT_DATA_RATE,
    TIMER_FREQUENCY,
];

/// Look up a register by index
pub fn descriptor(index: u8) -> Option<&'static RegisterDescriptor> {
    REGISTER_MAP.iter().find(|d| d.index == index)
}
