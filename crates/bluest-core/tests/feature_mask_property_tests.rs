//! Property-based tests for feature characteristic identity and
//! advertisement parsing.
//!
//! These tests verify the mask/UUID bijection and that advertisement parsing
//! never panics on arbitrary input.

use bluest_core::protocol::feature_mask::{
    feature_characteristic_uuid, feature_mask_of, is_feature_characteristic,
};
use bluest_core::{AdvertisementRecord, BlueStError, FeatureMask};
use proptest::prelude::*;

/// Generate an arbitrary feature mask
fn arb_mask() -> impl Strategy<Value = FeatureMask> {
    any::<u32>().prop_map(FeatureMask::from_bits)
}

/// Generate a single-feature mask
fn arb_single() -> impl Strategy<Value = FeatureMask> {
    (0u32..32).prop_map(|position| FeatureMask::bit(position).unwrap())
}

proptest! {
    /// Property: The mask is recovered from its characteristic UUID
    #[test]
    fn mask_round_trips_through_uuid(mask in arb_mask()) {
        let uuid = feature_characteristic_uuid(mask);
        prop_assert_eq!(feature_mask_of(&uuid), mask);
        prop_assert!(is_feature_characteristic(&uuid));
    }

    /// Property: Distinct masks never share a UUID
    #[test]
    fn distinct_masks_distinct_uuids(a in arb_mask(), b in arb_mask()) {
        prop_assume!(a != b);
        prop_assert_ne!(feature_characteristic_uuid(a), feature_characteristic_uuid(b));
    }

    /// Property: Single masks are never aggregates
    #[test]
    fn single_masks_classified(mask in arb_single()) {
        prop_assert!(mask.is_single());
        prop_assert!(!mask.is_aggregate());
        prop_assert_eq!(mask.singles().collect::<Vec<_>>(), vec![mask]);
    }

    /// Property: Splitting a mask into singles and recombining is lossless
    #[test]
    fn singles_recombine(mask in arb_mask()) {
        let rebuilt = mask.singles().fold(FeatureMask::NONE, |acc, m| acc | m);
        prop_assert_eq!(rebuilt, mask);
        prop_assert_eq!(mask.singles().count() as u32, mask.count());
    }

    /// Property: Advertisement parsing returns an error instead of panicking
    #[test]
    fn advertisement_parse_never_panics(
        data in prop::collection::vec(any::<u8>(), 0..32),
        offset in 0usize..40,
    ) {
        match AdvertisementRecord::parse(&data, offset) {
            Ok(record) => prop_assert!(offset + record.encoded_len() <= data.len()),
            Err(BlueStError::Index { .. }) | Err(BlueStError::Format { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }
}
