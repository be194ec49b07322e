//! 14-bit expression values shared by all MPE dimensions.

use serde::{Deserialize, Serialize};

/// A single MPE dimension reading in 14-bit resolution (0-16383).
///
/// Bipolar dimensions (pitchbend, timbre) rest at [`MpeValue::CENTRE`],
/// pressure rests at [`MpeValue::MIN`]. Values are always within range;
/// every constructor and combinator saturates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub struct MpeValue(u16);

impl MpeValue {
    pub const MIN: MpeValue = MpeValue(0);
    pub const CENTRE: MpeValue = MpeValue(8192);
    pub const MAX: MpeValue = MpeValue(16383);

    #[inline]
    pub const fn minimum() -> Self {
        Self::MIN
    }

    #[inline]
    pub const fn centre() -> Self {
        Self::CENTRE
    }

    #[inline]
    pub const fn maximum() -> Self {
        Self::MAX
    }

    /// Scale a 7-bit value up to 14 bits so that 0, 64 and 127 land exactly
    /// on the minimum, centre and maximum.
    #[inline]
    pub fn from_7bit(value: u8) -> Self {
        let value = value.min(127) as u32;
        if value <= 64 {
            Self((value << 7) as u16)
        } else {
            Self(((value - 64) * 8191 / 63 + 8192) as u16)
        }
    }

    #[inline]
    pub fn from_14bit(value: u16) -> Self {
        Self(value.min(Self::MAX.0))
    }

    /// Combine a 7-bit MSB with a 7-bit LSB.
    #[inline]
    pub fn from_msb_lsb(msb: u8, lsb: u8) -> Self {
        Self::from_14bit(((msb.min(127) as u16) << 7) | lsb.min(127) as u16)
    }

    /// -1.0 at minimum, 0.0 at centre, 1.0 at maximum.
    #[inline]
    pub fn from_signed_f32(value: f32) -> Self {
        let value = value.clamp(-1.0, 1.0);
        let centre = Self::CENTRE.0 as f32;
        let raw = if value < 0.0 {
            centre + value * centre
        } else {
            centre + value * (Self::MAX.0 - Self::CENTRE.0) as f32
        };
        Self::from_14bit(raw.round() as u16)
    }

    #[inline]
    pub fn as_7bit(self) -> u8 {
        (self.0 >> 7) as u8
    }

    #[inline]
    pub fn as_14bit(self) -> u16 {
        self.0
    }

    /// -1.0 ..= 1.0, exactly ±1.0 at the extremes and 0.0 at the centre.
    #[inline]
    pub fn as_signed_f32(self) -> f32 {
        let offset = self.0 as f32 - Self::CENTRE.0 as f32;
        if self.0 < Self::CENTRE.0 {
            offset / Self::CENTRE.0 as f32
        } else {
            offset / (Self::MAX.0 - Self::CENTRE.0) as f32
        }
    }

    /// 0.0 ..= 1.0.
    #[inline]
    pub fn as_unsigned_f32(self) -> f32 {
        self.0 as f32 / Self::MAX.0 as f32
    }

    /// Add the bipolar deflection of `offset` (its distance from the centre)
    /// to this value, saturating at the range boundaries.
    #[inline]
    pub fn saturating_offset(self, offset: MpeValue) -> Self {
        let sum = self.0 as i32 + offset.0 as i32 - Self::CENTRE.0 as i32;
        Self(sum.clamp(Self::MIN.0 as i32, Self::MAX.0 as i32) as u16)
    }
}

impl Default for MpeValue {
    fn default() -> Self {
        Self::CENTRE
    }
}

impl From<u16> for MpeValue {
    fn from(value: u16) -> Self {
        Self::from_14bit(value)
    }
}

impl From<MpeValue> for u16 {
    fn from(value: MpeValue) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_7bit_scaling_hits_anchor_points() {
        assert_eq!(MpeValue::from_7bit(0), MpeValue::MIN);
        assert_eq!(MpeValue::from_7bit(64), MpeValue::CENTRE);
        assert_eq!(MpeValue::from_7bit(127), MpeValue::MAX);
        assert_eq!(MpeValue::from_7bit(1).as_14bit(), 128);
        // Out-of-range input clamps
        assert_eq!(MpeValue::from_7bit(200), MpeValue::MAX);
    }

    #[test]
    fn test_14bit_saturates() {
        assert_eq!(MpeValue::from_14bit(20000), MpeValue::MAX);
        assert_eq!(MpeValue::from_14bit(1234).as_14bit(), 1234);
        assert_eq!(MpeValue::from(u16::MAX), MpeValue::MAX);
    }

    #[test]
    fn test_msb_lsb() {
        assert_eq!(MpeValue::from_msb_lsb(64, 0), MpeValue::CENTRE);
        assert_eq!(MpeValue::from_msb_lsb(127, 127), MpeValue::MAX);
        assert_eq!(MpeValue::from_msb_lsb(0, 5).as_14bit(), 5);
    }

    #[test]
    fn test_signed_float_extremes_are_exact() {
        assert_eq!(MpeValue::MIN.as_signed_f32(), -1.0);
        assert_eq!(MpeValue::CENTRE.as_signed_f32(), 0.0);
        assert_eq!(MpeValue::MAX.as_signed_f32(), 1.0);
        assert_eq!(MpeValue::from_signed_f32(1.0), MpeValue::MAX);
        assert_eq!(MpeValue::from_signed_f32(-1.0), MpeValue::MIN);
        assert_eq!(MpeValue::from_signed_f32(0.0), MpeValue::CENTRE);
    }

    #[test]
    fn test_unsigned_float() {
        assert_eq!(MpeValue::MIN.as_unsigned_f32(), 0.0);
        assert_eq!(MpeValue::MAX.as_unsigned_f32(), 1.0);
    }

    #[test]
    fn test_saturating_offset() {
        // Centred offset is the identity
        let v = MpeValue::from_14bit(3000);
        assert_eq!(v.saturating_offset(MpeValue::CENTRE), v);

        // Max + max saturates instead of wrapping
        assert_eq!(MpeValue::MAX.saturating_offset(MpeValue::MAX), MpeValue::MAX);
        assert_eq!(MpeValue::MIN.saturating_offset(MpeValue::MIN), MpeValue::MIN);

        let up = MpeValue::from_14bit(8192 + 100);
        assert_eq!(v.saturating_offset(up).as_14bit(), 3100);
    }
}
