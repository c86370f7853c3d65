//! Telemetry frame decoding
//!
//! A notification carries a 2-byte little-endian device timestamp followed by
//! one fixed-width payload (single feature) or several payloads sharing that
//! timestamp (aggregate feature). Decoding is pure: it reads from a
//! [`FrameCursor`] and either yields complete values or a
//! [`BlueStError::TruncatedFrame`].

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::types::FeatureMask;
use crate::{BlueStError, BlueStResult};

/// Width of the shared device timestamp
pub const TIMESTAMP_WIDTH: usize = 2;

/// Payload list of one frame; aggregates rarely exceed three sub-features
pub type Payloads = SmallVec<[DecodedPayload; 3]>;

// ----------------------------------------------------------------------------
// Byte Cursor
// ----------------------------------------------------------------------------

/// Forward-only reader over a notification buffer
#[derive(Debug, Clone)]
pub struct FrameCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> FrameCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Take exactly `N` bytes, leaving the cursor untouched on failure
    pub fn take<const N: usize>(&mut self) -> BlueStResult<[u8; N]> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.position..self.position + N]);
        self.position += N;
        Ok(out)
    }

    /// Fail unless at least `width` bytes remain
    pub fn ensure(&self, width: usize) -> BlueStResult<()> {
        if self.remaining() < width {
            return Err(BlueStError::TruncatedFrame {
                expected: width,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> BlueStResult<u8> {
        Ok(self.take::<1>()?[0])
    }

    pub fn read_u16_le(&mut self) -> BlueStResult<u16> {
        Ok(u16::from_le_bytes(self.take::<2>()?))
    }

    pub fn read_i16_le(&mut self) -> BlueStResult<i16> {
        Ok(i16::from_le_bytes(self.take::<2>()?))
    }
}

// ----------------------------------------------------------------------------
// Payload Types
// ----------------------------------------------------------------------------

/// Battery status sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryData {
    /// Charge level in tenths of a percent
    pub level: i16,
    pub voltage: i16,
    pub current: i16,
    pub status: u8,
}

impl BatteryData {
    pub const WIDTH: usize = 7;

    pub fn decode(cursor: &mut FrameCursor<'_>) -> BlueStResult<Self> {
        cursor.ensure(Self::WIDTH)?;
        Ok(Self {
            level: cursor.read_i16_le()?,
            voltage: cursor.read_i16_le()?,
            current: cursor.read_i16_le()?,
            status: cursor.read_u8()?,
        })
    }

    /// Charge level as a ratio in `0.0..=1.0`
    pub fn level_ratio(&self) -> f32 {
        self.level as f32 / 1000.0
    }
}

/// Three-axis sample from an accelerometer, gyroscope or magnetometer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionAxes {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl MotionAxes {
    pub const WIDTH: usize = 6;

    pub fn decode(cursor: &mut FrameCursor<'_>) -> BlueStResult<Self> {
        cursor.ensure(Self::WIDTH)?;
        Ok(Self {
            x: cursor.read_i16_le()?,
            y: cursor.read_i16_le()?,
            z: cursor.read_i16_le()?,
        })
    }
}

/// Kind of payload a characteristic delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    Battery,
    MotionAxes,
}

impl PayloadKind {
    /// Encoded width in bytes
    pub const fn width(self) -> usize {
        match self {
            PayloadKind::Battery => BatteryData::WIDTH,
            PayloadKind::MotionAxes => MotionAxes::WIDTH,
        }
    }

    /// Payload kind of a single-feature characteristic, if decodable
    pub fn for_feature(mask: FeatureMask) -> Option<Self> {
        match mask {
            FeatureMask::BATTERY => Some(PayloadKind::Battery),
            FeatureMask::ACCELEROMETER | FeatureMask::GYROSCOPE | FeatureMask::MAGNETOMETER => {
                Some(PayloadKind::MotionAxes)
            }
            _ => None,
        }
    }

    pub fn decode(self, cursor: &mut FrameCursor<'_>) -> BlueStResult<DecodedPayload> {
        match self {
            PayloadKind::Battery => BatteryData::decode(cursor).map(DecodedPayload::Battery),
            PayloadKind::MotionAxes => MotionAxes::decode(cursor).map(DecodedPayload::MotionAxes),
        }
    }
}

/// One decoded payload value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodedPayload {
    Battery(BatteryData),
    MotionAxes(MotionAxes),
}

impl DecodedPayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            DecodedPayload::Battery(_) => PayloadKind::Battery,
            DecodedPayload::MotionAxes(_) => PayloadKind::MotionAxes,
        }
    }

    pub fn as_battery(&self) -> Option<&BatteryData> {
        match self {
            DecodedPayload::Battery(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_motion(&self) -> Option<&MotionAxes> {
        match self {
            DecodedPayload::MotionAxes(data) => Some(data),
            _ => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Frame Decoding
// ----------------------------------------------------------------------------

/// Expected layout of a characteristic's frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameShape {
    Single(PayloadKind),
    Aggregate(Vec<PayloadKind>),
}

impl FrameShape {
    /// Total encoded width including the timestamp
    pub fn width(&self) -> usize {
        TIMESTAMP_WIDTH
            + match self {
                FrameShape::Single(kind) => kind.width(),
                FrameShape::Aggregate(kinds) => kinds.iter().map(|k| k.width()).sum(),
            }
    }

    pub fn decode(&self, cursor: &mut FrameCursor<'_>) -> BlueStResult<(u16, Payloads)> {
        match self {
            FrameShape::Single(kind) => {
                let (timestamp, payload) = decode_single(cursor, *kind)?;
                let mut payloads = Payloads::new();
                payloads.push(payload);
                Ok((timestamp, payloads))
            }
            FrameShape::Aggregate(kinds) => decode_aggregate(cursor, kinds),
        }
    }
}

/// Decode a timestamp and exactly one payload of `kind`
pub fn decode_single(
    cursor: &mut FrameCursor<'_>,
    kind: PayloadKind,
) -> BlueStResult<(u16, DecodedPayload)> {
    cursor.ensure(TIMESTAMP_WIDTH + kind.width())?;
    let timestamp = cursor.read_u16_le()?;
    let payload = kind.decode(cursor)?;
    Ok((timestamp, payload))
}

/// Decode one shared timestamp followed by `kinds.len()` payloads in the given order
pub fn decode_aggregate(
    cursor: &mut FrameCursor<'_>,
    kinds: &[PayloadKind],
) -> BlueStResult<(u16, Payloads)> {
    let width = TIMESTAMP_WIDTH + kinds.iter().map(|k| k.width()).sum::<usize>();
    cursor.ensure(width)?;

    let timestamp = cursor.read_u16_le()?;
    let payloads = kinds
        .iter()
        .map(|kind| kind.decode(cursor))
        .collect::<BlueStResult<Payloads>>()?;
    Ok((timestamp, payloads))
}
