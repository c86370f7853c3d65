//! BlueST advertisement record parsing
//!
//! The node advertises one manufacturer-specific AD field:
//!
//! ```text
//! [length:1][type=0xFF:1][version=0x01:1][device_id:1][mask:4 LE][mac:6]?
//! ```
//!
//! `length` counts the bytes that follow it and is either 7 (no MAC) or 13.

use serde::{Deserialize, Serialize};

use crate::types::{DeviceId, DeviceMac, FeatureMask};
use crate::{BlueStError, BlueStResult};

// ----------------------------------------------------------------------------
// Constants
// ----------------------------------------------------------------------------

/// AD type for manufacturer-specific data
pub const MANUFACTURER_SPECIFIC_AD_TYPE: u8 = 0xFF;

/// Only protocol version understood by this crate
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Length byte of a record without MAC
pub const SHORT_RECORD_LENGTH: u8 = 0x07;

/// Length byte of a record carrying the MAC
pub const LONG_RECORD_LENGTH: u8 = 0x0d;

// ----------------------------------------------------------------------------
// Advertisement Record
// ----------------------------------------------------------------------------

/// Parsed BlueST advertisement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertisementRecord {
    pub protocol_version: u8,
    pub device_id: DeviceId,
    pub features: FeatureMask,
    pub device_mac: Option<DeviceMac>,
}

impl AdvertisementRecord {
    /// Parse the record starting at `offset`
    pub fn parse(data: &[u8], offset: usize) -> BlueStResult<Self> {
        let length = *data.get(offset).ok_or(BlueStError::Index {
            offset,
            required: 1,
            available: data.len(),
        })?;

        if length != SHORT_RECORD_LENGTH && length != LONG_RECORD_LENGTH {
            return Err(BlueStError::format(format!(
                "Invalid length field 0x{:02X} in advertisement",
                length
            )));
        }

        let required = 1 + length as usize;
        if data.len() - offset < required {
            return Err(BlueStError::Index {
                offset,
                required,
                available: data.len(),
            });
        }
        let record = &data[offset..offset + required];

        if record[1] != MANUFACTURER_SPECIFIC_AD_TYPE {
            return Err(BlueStError::format(format!(
                "Invalid field type 0x{:02X} in advertisement",
                record[1]
            )));
        }

        let protocol_version = record[2];
        if protocol_version != PROTOCOL_VERSION {
            return Err(BlueStError::format(format!(
                "Unsupported protocol version 0x{:02X} in advertisement",
                protocol_version
            )));
        }

        let device_id = DeviceId::from(record[3]);
        let raw_features = [record[4], record[5], record[6], record[7]];
        let features = FeatureMask::from_bits(u32::from_le_bytes(raw_features));

        let device_mac = if length == LONG_RECORD_LENGTH {
            let mut mac = [0u8; 6];
            mac.copy_from_slice(&record[8..14]);
            Some(DeviceMac::new(mac))
        } else {
            None
        };

        Ok(Self {
            protocol_version,
            device_id,
            features,
            device_mac,
        })
    }

    /// Number of bytes this record occupies in the advertising payload
    pub fn encoded_len(&self) -> usize {
        if self.device_mac.is_some() {
            1 + LONG_RECORD_LENGTH as usize
        } else {
            1 + SHORT_RECORD_LENGTH as usize
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: [u8; 8] = [0x07, 0xFF, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00];

    #[test]
    fn test_short_record() {
        let record = AdvertisementRecord::parse(&SHORT, 0).unwrap();
        assert_eq!(record.protocol_version, 1);
        assert_eq!(record.device_id, DeviceId::StevalWesu1);
        assert_eq!(record.features, FeatureMask::bit(0).unwrap());
        assert!(record.device_mac.is_none());
        assert_eq!(record.encoded_len(), 8);
    }

    #[test]
    fn test_long_record_with_mac() {
        let data = [
            0x0d, 0xFF, 0x01, 0x80, 0x00, 0x00, 0xE0, 0x00, 0xC0, 0x01, 0x02, 0x03, 0x04, 0x05,
        ];
        let record = AdvertisementRecord::parse(&data, 0).unwrap();
        assert_eq!(record.device_id, DeviceId::GenericNucleo);
        assert_eq!(
            record.features,
            FeatureMask::ACCELEROMETER | FeatureMask::GYROSCOPE | FeatureMask::MAGNETOMETER
        );
        assert_eq!(
            record.device_mac.unwrap().as_bytes(),
            &[0xC0, 0x01, 0x02, 0x03, 0x04, 0x05]
        );
    }

    #[test]
    fn test_record_at_offset() {
        let mut data = vec![0xAA, 0xBB];
        data.extend_from_slice(&SHORT);
        let record = AdvertisementRecord::parse(&data, 2).unwrap();
        assert_eq!(record.features, FeatureMask::bit(0).unwrap());
    }

    #[test]
    fn test_invalid_length() {
        let mut data = SHORT;
        data[0] = 0x08;
        let err = AdvertisementRecord::parse(&data, 0).unwrap_err();
        assert!(matches!(err, BlueStError::Format { .. }));
    }

    #[test]
    fn test_invalid_field_type() {
        let mut data = SHORT;
        data[1] = 0x16;
        let err = AdvertisementRecord::parse(&data, 0).unwrap_err();
        assert!(matches!(err, BlueStError::Format { .. }));
    }

    #[test]
    fn test_invalid_version() {
        let mut data = SHORT;
        data[2] = 0x02;
        let err = AdvertisementRecord::parse(&data, 0).unwrap_err();
        assert!(matches!(err, BlueStError::Format { .. }));
    }

    #[test]
    fn test_declared_length_exceeds_buffer() {
        let data = [0x0d, 0xFF, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00];
        let err = AdvertisementRecord::parse(&data, 0).unwrap_err();
        assert!(matches!(
            err,
            BlueStError::Index {
                required: 14,
                available: 8,
                ..
            }
        ));
    }

    #[test]
    fn test_offset_past_end() {
        let err = AdvertisementRecord::parse(&SHORT, 8).unwrap_err();
        assert!(matches!(err, BlueStError::Index { offset: 8, .. }));
    }
}
