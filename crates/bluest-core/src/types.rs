//! Core types for the BlueST protocol
//!
//! This module defines the fundamental types used throughout the protocol,
//! using newtype patterns for bit-level semantics and type safety.

use core::fmt;
use core::ops::{BitAnd, BitOr, BitOrAssign};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Feature Mask
// ----------------------------------------------------------------------------

/// 32-bit set of sensor capabilities, one bit per feature
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FeatureMask(u32);

impl FeatureMask {
    /// No features
    pub const NONE: Self = Self(0);

    pub const GESTURE: Self = Self(1 << 2);
    pub const CARRY_POSITION: Self = Self(1 << 3);
    pub const ACTIVITY: Self = Self(1 << 4);
    pub const SENSOR_FUSION: Self = Self(1 << 7);
    pub const SENSOR_FUSION_COMPACT: Self = Self(1 << 8);
    pub const BATTERY: Self = Self(1 << 17);
    pub const TEMPERATURE: Self = Self(1 << 18);
    pub const HUMIDITY: Self = Self(1 << 19);
    pub const PRESSURE: Self = Self(1 << 20);
    pub const MAGNETOMETER: Self = Self(1 << 21);
    pub const GYROSCOPE: Self = Self(1 << 22);
    pub const ACCELEROMETER: Self = Self(1 << 23);
    pub const LUX: Self = Self(1 << 24);
    pub const PROXIMITY: Self = Self(1 << 25);
    pub const MIC_LEVEL: Self = Self(1 << 26);

    const NAMED: &'static [(FeatureMask, &'static str)] = &[
        (Self::GESTURE, "Gesture"),
        (Self::CARRY_POSITION, "CarryPosition"),
        (Self::ACTIVITY, "Activity"),
        (Self::SENSOR_FUSION, "SensorFusion"),
        (Self::SENSOR_FUSION_COMPACT, "SensorFusionCompact"),
        (Self::BATTERY, "Battery"),
        (Self::TEMPERATURE, "Temperature"),
        (Self::HUMIDITY, "Humidity"),
        (Self::PRESSURE, "Pressure"),
        (Self::MAGNETOMETER, "Magnetometer"),
        (Self::GYROSCOPE, "Gyroscope"),
        (Self::ACCELEROMETER, "Accelerometer"),
        (Self::LUX, "Lux"),
        (Self::PROXIMITY, "Proximity"),
        (Self::MIC_LEVEL, "MicLevel"),
    ];

    /// Create a mask from raw bits
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Mask with only the given bit position set, `None` past bit 31
    pub const fn bit(position: u32) -> Option<Self> {
        match 1u32.checked_shl(position) {
            Some(bits) => Some(Self(bits)),
            None => None,
        }
    }

    /// Raw bits
    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of features in the mask
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Exactly one bit set
    pub const fn is_single(self) -> bool {
        self.0.count_ones() == 1
    }

    /// Two or more bits set
    pub const fn is_aggregate(self) -> bool {
        self.0.count_ones() >= 2
    }

    /// Any bit shared with `other`
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Every bit of `other` is present in `self`
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Iterate the single-bit masks contained in this mask, lowest bit first
    pub fn singles(self) -> impl Iterator<Item = FeatureMask> {
        (0..32)
            .filter_map(FeatureMask::bit)
            .filter(move |bit| self.contains(*bit))
    }
}

impl BitOr for FeatureMask {
    type Output = FeatureMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FeatureMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for FeatureMask {
    type Output = FeatureMask;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for FeatureMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "None");
        }

        let mut remaining = self.0;
        let mut first = true;
        for (mask, name) in Self::NAMED {
            if self.contains(*mask) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                remaining &= !mask.0;
                first = false;
            }
        }
        if remaining != 0 {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "0x{:08X}", remaining)?;
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Device Identification
// ----------------------------------------------------------------------------

/// Board identifier carried in the advertisement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceId {
    Generic,
    StevalWesu1,
    GenericNucleo,
    Other(u8),
}

impl DeviceId {
    pub fn as_u8(self) -> u8 {
        match self {
            DeviceId::Generic => 0x00,
            DeviceId::StevalWesu1 => 0x01,
            DeviceId::GenericNucleo => 0x80,
            DeviceId::Other(value) => value,
        }
    }
}

impl From<u8> for DeviceId {
    fn from(value: u8) -> Self {
        match value {
            0x00 => DeviceId::Generic,
            0x01 => DeviceId::StevalWesu1,
            0x80 => DeviceId::GenericNucleo,
            other => DeviceId::Other(other),
        }
    }
}

/// 6-byte device MAC as advertised by the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceMac([u8; 6]);

impl DeviceMac {
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for DeviceMac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|b| hex::encode_upper([*b])).collect();
        write!(f, "{}", parts.join(":"))
    }
}

// ----------------------------------------------------------------------------
// Timestamp
// ----------------------------------------------------------------------------

/// Wall-clock timestamp in milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a new timestamp
    pub fn new(millis: u64) -> Self {
        Self(millis)
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

// ----------------------------------------------------------------------------
// Cancellation
// ----------------------------------------------------------------------------

/// Cooperative cancellation flag shared between a caller and a long-running loop
///
/// Cloning shares the flag. Loops observe it at their own checkpoints and never
/// abort an I/O call midway.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_classification() {
        assert!(FeatureMask::BATTERY.is_single());
        assert!(!FeatureMask::BATTERY.is_aggregate());

        let motion =
            FeatureMask::ACCELEROMETER | FeatureMask::GYROSCOPE | FeatureMask::MAGNETOMETER;
        assert!(motion.is_aggregate());
        assert_eq!(motion.count(), 3);
        assert!(motion.intersects(FeatureMask::ACCELEROMETER));
        assert!(!motion.intersects(FeatureMask::BATTERY));
        assert!(!FeatureMask::NONE.is_single());
        assert!(!FeatureMask::NONE.is_aggregate());
    }

    #[test]
    fn test_bit_position_bounds() {
        assert_eq!(FeatureMask::bit(0), Some(FeatureMask::from_bits(1)));
        assert_eq!(FeatureMask::bit(31), Some(FeatureMask::from_bits(0x8000_0000)));
        assert_eq!(FeatureMask::bit(32), None);
        assert_eq!(FeatureMask::bit(u32::MAX), None);
    }

    #[test]
    fn test_singles_lowest_first() {
        let mask = FeatureMask::ACCELEROMETER | FeatureMask::BATTERY;
        let singles: Vec<_> = mask.singles().collect();
        assert_eq!(singles, vec![FeatureMask::BATTERY, FeatureMask::ACCELEROMETER]);
    }

    #[test]
    fn test_mask_display() {
        assert_eq!(FeatureMask::NONE.to_string(), "None");
        assert_eq!(
            (FeatureMask::BATTERY | FeatureMask::ACCELEROMETER).to_string(),
            "Battery|Accelerometer"
        );
        assert_eq!(
            (FeatureMask::from_bits(1) | FeatureMask::LUX).to_string(),
            "Lux|0x00000001"
        );
    }

    #[test]
    fn test_device_id_roundtrip_known_values() {
        assert_eq!(DeviceId::from(0x01), DeviceId::StevalWesu1);
        assert_eq!(DeviceId::from(0x80), DeviceId::GenericNucleo);
        assert_eq!(DeviceId::from(0x42), DeviceId::Other(0x42));
        assert_eq!(DeviceId::Other(0x42).as_u8(), 0x42);
    }

    #[test]
    fn test_device_mac_display() {
        let mac = DeviceMac::new([0xC0, 0x12, 0x34, 0x56, 0x78, 0x9A]);
        assert_eq!(mac.to_string(), "C0:12:34:56:78:9A");
    }

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }
}
