//! MPE zone layout types.
//!
//! Channels are 1-based (1-16). A zone is one master channel plus a
//! contiguous block of note channels.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest pitchbend range accepted for zones and Omni mode.
pub const MAX_PITCHBEND_RANGE: u8 = 96;

/// Per-note pitchbend range recommended for MPE note channels.
pub const DEFAULT_PER_NOTE_PITCHBEND_RANGE: u8 = 48;

/// Pitchbend range for master channels and non-MPE devices.
pub const DEFAULT_MASTER_PITCHBEND_RANGE: u8 = 2;

/// One MPE zone: a master channel and its note channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MpeZone {
    master_channel: u8,
    first_note_channel: u8,
    last_note_channel: u8,
    per_note_pitchbend_range: u8,
    master_pitchbend_range: u8,
}

impl MpeZone {
    /// Zone whose `num_note_channels` note channels directly follow the master.
    pub fn new(master_channel: u8, num_note_channels: u8) -> Result<Self> {
        if !(1..=16).contains(&master_channel) {
            return Err(Error::InvalidChannel(master_channel));
        }
        let last = master_channel as u16 + num_note_channels as u16;
        if num_note_channels == 0 || last > 16 {
            return Err(Error::InvalidZone(format!(
                "master channel {master_channel} cannot have {num_note_channels} note channels"
            )));
        }
        Ok(Self::with_channels(
            master_channel,
            master_channel + 1,
            last as u8,
        ))
    }

    /// Lower Zone: master on channel 1, note channels 2 upwards.
    pub fn lower(num_note_channels: u8) -> Self {
        let n = num_note_channels.clamp(1, 15);
        Self::with_channels(1, 2, 1 + n)
    }

    /// Upper Zone: master on channel 16, note channels 15 downwards.
    pub fn upper(num_note_channels: u8) -> Self {
        let n = num_note_channels.clamp(1, 15);
        Self::with_channels(16, 16 - n, 15)
    }

    fn with_channels(master_channel: u8, first: u8, last: u8) -> Self {
        Self {
            master_channel,
            first_note_channel: first,
            last_note_channel: last,
            per_note_pitchbend_range: DEFAULT_PER_NOTE_PITCHBEND_RANGE,
            master_pitchbend_range: DEFAULT_MASTER_PITCHBEND_RANGE,
        }
    }

    /// Set the per-note pitchbend range in semitones (0-96).
    pub fn with_per_note_pitchbend_range(mut self, semitones: u8) -> Self {
        self.per_note_pitchbend_range = semitones;
        self
    }

    /// Set the master pitchbend range in semitones (0-96).
    pub fn with_master_pitchbend_range(mut self, semitones: u8) -> Self {
        self.master_pitchbend_range = semitones;
        self
    }

    #[inline]
    pub fn master_channel(&self) -> u8 {
        self.master_channel
    }

    #[inline]
    pub fn num_note_channels(&self) -> u8 {
        self.last_note_channel - self.first_note_channel + 1
    }

    #[inline]
    pub fn note_channels(&self) -> RangeInclusive<u8> {
        self.first_note_channel..=self.last_note_channel
    }

    #[inline]
    pub fn per_note_pitchbend_range(&self) -> u8 {
        self.per_note_pitchbend_range
    }

    #[inline]
    pub fn master_pitchbend_range(&self) -> u8 {
        self.master_pitchbend_range
    }

    #[inline]
    pub fn is_master_channel(&self, channel: u8) -> bool {
        channel == self.master_channel
    }

    #[inline]
    pub fn is_note_channel(&self, channel: u8) -> bool {
        self.note_channels().contains(&channel)
    }

    #[inline]
    pub fn handles_channel(&self, channel: u8) -> bool {
        self.is_master_channel(channel) || self.is_note_channel(channel)
    }

    fn validate(&self) -> Result<()> {
        for channel in [
            self.master_channel,
            self.first_note_channel,
            self.last_note_channel,
        ] {
            if !(1..=16).contains(&channel) {
                return Err(Error::InvalidChannel(channel));
            }
        }
        if self.first_note_channel > self.last_note_channel {
            return Err(Error::InvalidZone("zone has no note channels".into()));
        }
        if self.is_note_channel(self.master_channel) {
            return Err(Error::InvalidZone(format!(
                "master channel {} is also a note channel",
                self.master_channel
            )));
        }
        for range in [self.per_note_pitchbend_range, self.master_pitchbend_range] {
            if range > MAX_PITCHBEND_RANGE {
                return Err(Error::InvalidPitchbendRange(range));
            }
        }
        Ok(())
    }
}

/// The part a channel plays under a layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelRole {
    Master(MpeZone),
    Note(MpeZone),
    Unassigned,
}

/// A validated set of non-overlapping zones.
///
/// Zones keep the order they were added in. The only ways to build a layout
/// go through [`MpeZoneLayout::add_zone`], so a layout held by the instrument
/// never assigns a channel twice.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MpeZone>", into = "Vec<MpeZone>")]
pub struct MpeZoneLayout {
    zones: Vec<MpeZone>,
}

impl MpeZoneLayout {
    /// Layout with no zones. Every channel is unassigned.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single Lower Zone with `num_note_channels` note channels.
    pub fn lower_zone(num_note_channels: u8) -> Self {
        Self {
            zones: vec![MpeZone::lower(num_note_channels)],
        }
    }

    /// Single Upper Zone with `num_note_channels` note channels.
    pub fn upper_zone(num_note_channels: u8) -> Self {
        Self {
            zones: vec![MpeZone::upper(num_note_channels)],
        }
    }

    /// Lower and Upper Zone side by side. The two counts must fit in the
    /// 14 channels left after both masters.
    pub fn dual_zone(lower_note_channels: u8, upper_note_channels: u8) -> Result<Self> {
        Self::new()
            .with_zone(MpeZone::lower(lower_note_channels))?
            .with_zone(MpeZone::upper(upper_note_channels))
    }

    pub fn with_zone(mut self, zone: MpeZone) -> Result<Self> {
        self.add_zone(zone)?;
        Ok(self)
    }

    /// Add a zone, rejecting it if any of its channels is already taken.
    pub fn add_zone(&mut self, zone: MpeZone) -> Result<()> {
        zone.validate()?;
        let channels = std::iter::once(zone.master_channel).chain(zone.note_channels());
        for channel in channels {
            if self.zones.iter().any(|z| z.handles_channel(channel)) {
                return Err(Error::OverlappingZones { channel });
            }
        }
        self.zones.push(zone);
        Ok(())
    }

    pub fn clear_all_zones(&mut self) {
        self.zones.clear();
    }

    #[inline]
    pub fn zones(&self) -> &[MpeZone] {
        &self.zones
    }

    #[inline]
    pub fn num_zones(&self) -> usize {
        self.zones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn zone_by_master_channel(&self, channel: u8) -> Option<&MpeZone> {
        self.zones.iter().find(|z| z.is_master_channel(channel))
    }

    pub fn zone_by_note_channel(&self, channel: u8) -> Option<&MpeZone> {
        self.zones.iter().find(|z| z.is_note_channel(channel))
    }

    pub fn channel_role(&self, channel: u8) -> ChannelRole {
        for zone in &self.zones {
            if zone.is_master_channel(channel) {
                return ChannelRole::Master(*zone);
            }
            if zone.is_note_channel(channel) {
                return ChannelRole::Note(*zone);
            }
        }
        ChannelRole::Unassigned
    }
}

impl TryFrom<Vec<MpeZone>> for MpeZoneLayout {
    type Error = Error;

    fn try_from(zones: Vec<MpeZone>) -> Result<Self> {
        zones.into_iter().try_fold(Self::new(), Self::with_zone)
    }
}

impl From<MpeZoneLayout> for Vec<MpeZone> {
    fn from(layout: MpeZoneLayout) -> Self {
        layout.zones
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_zone() {
        let zone = MpeZone::lower(10);
        assert_eq!(zone.master_channel(), 1);
        assert_eq!(zone.num_note_channels(), 10);
        assert!(zone.is_master_channel(1));
        assert!(!zone.is_master_channel(2));
        assert!(zone.is_note_channel(2));
        assert!(zone.is_note_channel(11));
        assert!(!zone.is_note_channel(12));
        assert!(!zone.is_note_channel(1));
        assert_eq!(zone.per_note_pitchbend_range(), 48);
        assert_eq!(zone.master_pitchbend_range(), 2);
    }

    #[test]
    fn test_upper_zone() {
        let zone = MpeZone::upper(5);
        assert_eq!(zone.master_channel(), 16);
        assert_eq!(zone.note_channels(), 11..=15);
        assert!(zone.is_note_channel(15));
        assert!(zone.is_note_channel(11));
        assert!(!zone.is_note_channel(10));
        assert!(!zone.is_note_channel(16));
    }

    #[test]
    fn test_member_count_is_clamped() {
        assert_eq!(MpeZone::lower(0).num_note_channels(), 1);
        assert_eq!(MpeZone::upper(40).num_note_channels(), 15);
    }

    #[test]
    fn test_new_zone_rejects_overflow() {
        assert!(MpeZone::new(10, 6).is_ok());
        assert_eq!(
            MpeZone::new(10, 7).unwrap_err(),
            Error::InvalidZone("master channel 10 cannot have 7 note channels".into())
        );
        assert_eq!(MpeZone::new(0, 3).unwrap_err(), Error::InvalidChannel(0));
        assert!(MpeZone::new(4, 0).is_err());
    }

    #[test]
    fn test_dual_zone_layout() {
        let layout = MpeZoneLayout::dual_zone(7, 7).unwrap();
        assert_eq!(layout.num_zones(), 2);
        assert!(matches!(layout.channel_role(1), ChannelRole::Master(_)));
        assert!(matches!(layout.channel_role(8), ChannelRole::Note(z) if z.master_channel() == 1));
        assert!(matches!(layout.channel_role(9), ChannelRole::Note(z) if z.master_channel() == 16));
        assert!(matches!(layout.channel_role(16), ChannelRole::Master(_)));
    }

    #[test]
    fn test_overlapping_zones_rejected() {
        let err = MpeZoneLayout::dual_zone(10, 10).unwrap_err();
        assert_eq!(err, Error::OverlappingZones { channel: 6 });

        let mut layout = MpeZoneLayout::lower_zone(3);
        let err = layout.add_zone(MpeZone::new(4, 2).unwrap()).unwrap_err();
        assert_eq!(err, Error::OverlappingZones { channel: 4 });
        assert_eq!(layout.num_zones(), 1, "Rejected zone must not be added");
    }

    #[test]
    fn test_pitchbend_range_validated() {
        let zone = MpeZone::lower(4).with_per_note_pitchbend_range(97);
        let err = MpeZoneLayout::new().with_zone(zone).unwrap_err();
        assert_eq!(err, Error::InvalidPitchbendRange(97));
    }

    #[test]
    fn test_unassigned_channels() {
        let layout = MpeZoneLayout::lower_zone(3);
        assert_eq!(layout.channel_role(5), ChannelRole::Unassigned);
        assert!(layout.zone_by_master_channel(2).is_none());
        assert_eq!(
            layout.zone_by_note_channel(4).map(|z| z.master_channel()),
            Some(1)
        );
        assert_eq!(MpeZoneLayout::new().channel_role(1), ChannelRole::Unassigned);
    }

    #[test]
    fn test_layout_deserialization_validates() {
        let good = vec![MpeZone::lower(3), MpeZone::upper(3)];
        let bytes = bincode::serialize(&good).unwrap();
        let layout: MpeZoneLayout = bincode::deserialize(&bytes).unwrap();
        assert_eq!(layout, MpeZoneLayout::dual_zone(3, 3).unwrap());

        let bad = vec![MpeZone::lower(15), MpeZone::upper(1)];
        let bytes = bincode::serialize(&bad).unwrap();
        assert!(bincode::deserialize::<MpeZoneLayout>(&bytes).is_err());
    }
}
