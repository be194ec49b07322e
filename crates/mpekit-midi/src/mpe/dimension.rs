//! Per-dimension tracking state and note routing.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::note::MpeNote;
use super::value::MpeValue;

/// Indices into the note collection chosen by [`route`].
pub(crate) type RoutedNotes = SmallVec<[usize; 8]>;

/// The three MPE dimensions of expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Pitchbend,
    Pressure,
    Timbre,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Pitchbend, Dimension::Pressure, Dimension::Timbre];

    /// Resting value before anything is received: centre for the bipolar
    /// dimensions, minimum for pressure.
    #[inline]
    pub fn default_value(self) -> MpeValue {
        match self {
            Dimension::Pitchbend | Dimension::Timbre => MpeValue::CENTRE,
            Dimension::Pressure => MpeValue::MIN,
        }
    }

    /// The note's own value for this dimension.
    #[inline]
    pub fn value(self, note: &MpeNote) -> MpeValue {
        match self {
            Dimension::Pitchbend => note.pitchbend,
            Dimension::Pressure => note.pressure,
            Dimension::Timbre => note.timbre,
        }
    }

    #[inline]
    pub(crate) fn value_mut(self, note: &mut MpeNote) -> &mut MpeValue {
        match self {
            Dimension::Pitchbend => &mut note.pitchbend,
            Dimension::Pressure => &mut note.pressure,
            Dimension::Timbre => &mut note.timbre,
        }
    }
}

/// Which note(s) on a channel receive a per-channel dimension update when
/// several notes share that channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackingMode {
    /// The most recent note on the channel that is still playing.
    #[default]
    LastNotePlayedOnChannel,
    /// The lowest initial note number; the most recent note wins ties.
    LowestNoteOnChannel,
    /// The highest initial note number; the most recent note wins ties.
    HighestNoteOnChannel,
    /// Every note on the channel.
    AllNotesOnChannel,
}

/// Select the notes on `channel` that a per-channel update applies to.
///
/// `notes` must be in recency order, oldest first. Every note in the
/// collection is playing (key down and/or sustained). The result is in
/// ascending collection order.
pub(crate) fn route(notes: &[MpeNote], channel: u8, mode: TrackingMode) -> RoutedNotes {
    let on_channel = notes
        .iter()
        .enumerate()
        .filter(|(_, note)| note.midi_channel == channel);

    let mut routed = RoutedNotes::new();
    match mode {
        TrackingMode::AllNotesOnChannel => routed.extend(on_channel.map(|(i, _)| i)),
        TrackingMode::LastNotePlayedOnChannel => routed.extend(on_channel.last().map(|(i, _)| i)),
        TrackingMode::LowestNoteOnChannel => {
            // Ties fall through to the later note
            let lowest = on_channel.fold(None::<(usize, u8)>, |best, (i, note)| match best {
                Some((_, n)) if n < note.initial_note => best,
                _ => Some((i, note.initial_note)),
            });
            routed.extend(lowest.map(|(i, _)| i));
        }
        TrackingMode::HighestNoteOnChannel => {
            let highest = on_channel.fold(None::<(usize, u8)>, |best, (i, note)| match best {
                Some((_, n)) if n > note.initial_note => best,
                _ => Some((i, note.initial_note)),
            });
            routed.extend(highest.map(|(i, _)| i));
        }
    }
    routed
}

/// Tracking state for one dimension: its mode and the last value received
/// on each channel.
#[derive(Clone, Debug)]
pub(crate) struct DimensionTracker {
    dimension: Dimension,
    mode: TrackingMode,
    last_received: [MpeValue; 16],
}

impl DimensionTracker {
    pub(crate) fn new(dimension: Dimension) -> Self {
        Self {
            dimension,
            mode: TrackingMode::default(),
            last_received: [dimension.default_value(); 16],
        }
    }

    #[inline]
    pub(crate) fn dimension(&self) -> Dimension {
        self.dimension
    }

    #[inline]
    pub(crate) fn mode(&self) -> TrackingMode {
        self.mode
    }

    #[inline]
    pub(crate) fn set_mode(&mut self, mode: TrackingMode) {
        self.mode = mode;
    }

    /// Last value received on a 1-based channel.
    #[inline]
    pub(crate) fn last_received(&self, channel: u8) -> MpeValue {
        self.last_received[channel as usize - 1]
    }

    #[inline]
    pub(crate) fn record(&mut self, channel: u8, value: MpeValue) {
        self.last_received[channel as usize - 1] = value;
    }

    #[inline]
    pub(crate) fn route(&self, notes: &[MpeNote], channel: u8) -> RoutedNotes {
        route(notes, channel, self.mode)
    }
}
