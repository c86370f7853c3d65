//! Feature mask ↔ characteristic UUID mapping
//!
//! Every BlueST telemetry characteristic is named by the template
//! `XXXXXXXX-0001-11e1-ac36-0002a5d5c51b`, where the leading 32 bits hold the
//! feature mask that the characteristic carries.

use uuid::Uuid;

use crate::types::FeatureMask;

// ----------------------------------------------------------------------------
// BLE Service and Characteristic UUIDs
// ----------------------------------------------------------------------------

/// Service hosting the telemetry characteristics
pub const DATA_SERVICE_UUID: Uuid = Uuid::from_u128(0x00000000_0001_11e1_9ab4_0002a5d5c51b);

/// Debug console service
pub const DEBUG_SERVICE_UUID: Uuid = Uuid::from_u128(0x00000000_000e_11e1_9ab4_0002a5d5c51b);

/// Configuration service hosting the register-access characteristic
pub const CONFIG_SERVICE_UUID: Uuid = Uuid::from_u128(0x00000000_000f_11e1_9ab4_0002a5d5c51b);

/// Register-access characteristic
pub const REGISTER_ACCESS_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x00000001_000f_11e1_ac36_0002a5d5c51b);

/// Low 96 bits shared by every feature characteristic
const FEATURE_UUID_SUFFIX: u128 = 0x0001_11e1_ac36_0002_a5d5_c51b;

const MASK_SHIFT: u32 = 96;
const SUFFIX_BITS: u128 = (1u128 << MASK_SHIFT) - 1;

// ----------------------------------------------------------------------------
// Codec
// ----------------------------------------------------------------------------

/// Characteristic UUID carrying the given feature mask
pub const fn feature_characteristic_uuid(mask: FeatureMask) -> Uuid {
    Uuid::from_u128(((mask.bits() as u128) << MASK_SHIFT) | FEATURE_UUID_SUFFIX)
}

/// Feature mask encoded in a characteristic UUID
///
/// Exact inverse of [`feature_characteristic_uuid`]; the suffix is not
/// checked, use [`is_feature_characteristic`] for that.
pub fn feature_mask_of(uuid: &Uuid) -> FeatureMask {
    FeatureMask::from_bits((uuid.as_u128() >> MASK_SHIFT) as u32)
}

/// Whether the UUID follows the feature characteristic template
pub fn is_feature_characteristic(uuid: &Uuid) -> bool {
    (uuid.as_u128() & SUFFIX_BITS) == FEATURE_UUID_SUFFIX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battery_uuid_text_form() {
        let uuid = feature_characteristic_uuid(FeatureMask::BATTERY);
        assert_eq!(uuid.to_string(), "00020000-0001-11e1-ac36-0002a5d5c51b");
    }

    #[test]
    fn test_aggregate_uuid_text_form() {
        let motion =
            FeatureMask::ACCELEROMETER | FeatureMask::GYROSCOPE | FeatureMask::MAGNETOMETER;
        let uuid = feature_characteristic_uuid(motion);
        assert_eq!(uuid.to_string(), "00e00000-0001-11e1-ac36-0002a5d5c51b");
        assert_eq!(feature_mask_of(&uuid), motion);
    }

    #[test]
    fn test_every_single_bit_roundtrips() {
        for bit in 0..32 {
            let mask = FeatureMask::bit(bit).unwrap();
            let uuid = feature_characteristic_uuid(mask);
            assert_eq!(feature_mask_of(&uuid), mask);
            assert!(is_feature_characteristic(&uuid));
        }
    }

    #[test]
    fn test_service_uuids_are_not_feature_characteristics() {
        assert!(!is_feature_characteristic(&DATA_SERVICE_UUID));
        assert!(!is_feature_characteristic(&CONFIG_SERVICE_UUID));
        assert!(!is_feature_characteristic(&REGISTER_ACCESS_CHARACTERISTIC_UUID));
    }
}
