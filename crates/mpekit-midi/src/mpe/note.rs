//! Expressive note state tracked by the MPE instrument.

use super::value::MpeValue;

/// Identifier assigned to each note at note-on. Unique among playing notes;
/// values are reused after wrapping.
pub type NoteId = u16;

/// Whether a note's key is down and/or held by a pedal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyState {
    /// Key released and not held. Notes in this state are no longer playing.
    Off,
    KeyDown,
    /// Key released but held by the sustain or sostenuto pedal.
    Sustained,
    KeyDownAndSustained,
}

impl KeyState {
    #[inline]
    pub fn is_key_down(self) -> bool {
        matches!(self, KeyState::KeyDown | KeyState::KeyDownAndSustained)
    }

    #[inline]
    pub fn is_sustained(self) -> bool {
        matches!(self, KeyState::Sustained | KeyState::KeyDownAndSustained)
    }
}

/// One active expressive note.
///
/// Identity is the pair (`midi_channel`, `initial_note`). Instances handed to
/// listeners are snapshots; mutating a copy has no effect on the instrument.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MpeNote {
    pub(crate) id: NoteId,
    pub(crate) midi_channel: u8,
    pub(crate) initial_note: u8,
    pub(crate) note_on_velocity: MpeValue,
    pub(crate) note_off_velocity: MpeValue,
    pub(crate) pitchbend: MpeValue,
    pub(crate) pressure: MpeValue,
    pub(crate) timbre: MpeValue,
    pub(crate) total_pitchbend: MpeValue,
    pub(crate) total_pitchbend_semitones: f32,
    pub(crate) key_down: bool,
    pub(crate) held_by_sustain: bool,
    pub(crate) held_by_sostenuto: bool,
}

impl MpeNote {
    pub(crate) fn new(
        id: NoteId,
        midi_channel: u8,
        initial_note: u8,
        note_on_velocity: MpeValue,
        pitchbend: MpeValue,
        pressure: MpeValue,
        timbre: MpeValue,
    ) -> Self {
        Self {
            id,
            midi_channel,
            initial_note,
            note_on_velocity,
            note_off_velocity: MpeValue::MIN,
            pitchbend,
            pressure,
            timbre,
            total_pitchbend: pitchbend,
            total_pitchbend_semitones: 0.0,
            key_down: true,
            held_by_sustain: false,
            held_by_sostenuto: false,
        }
    }

    #[inline]
    pub fn id(&self) -> NoteId {
        self.id
    }

    /// 1-based MIDI channel.
    #[inline]
    pub fn midi_channel(&self) -> u8 {
        self.midi_channel
    }

    #[inline]
    pub fn initial_note(&self) -> u8 {
        self.initial_note
    }

    #[inline]
    pub fn note_on_velocity(&self) -> MpeValue {
        self.note_on_velocity
    }

    /// Velocity of the note-off, or the minimum while the key is still down.
    #[inline]
    pub fn note_off_velocity(&self) -> MpeValue {
        self.note_off_velocity
    }

    /// Per-note pitchbend, excluding the master channel.
    #[inline]
    pub fn pitchbend(&self) -> MpeValue {
        self.pitchbend
    }

    #[inline]
    pub fn pressure(&self) -> MpeValue {
        self.pressure
    }

    #[inline]
    pub fn timbre(&self) -> MpeValue {
        self.timbre
    }

    /// Per-note pitchbend plus the zone's master pitchbend, saturated.
    #[inline]
    pub fn total_pitchbend(&self) -> MpeValue {
        self.total_pitchbend
    }

    /// Effective bend in semitones with the zone's pitchbend ranges applied.
    #[inline]
    pub fn total_pitchbend_semitones(&self) -> f32 {
        self.total_pitchbend_semitones
    }

    #[inline]
    pub fn key_state(&self) -> KeyState {
        match (self.key_down, self.is_held()) {
            (true, true) => KeyState::KeyDownAndSustained,
            (true, false) => KeyState::KeyDown,
            (false, true) => KeyState::Sustained,
            (false, false) => KeyState::Off,
        }
    }

    #[inline]
    pub fn is_held(&self) -> bool {
        self.held_by_sustain || self.held_by_sostenuto
    }

    /// Sounding frequency in Hz, A4 = 440 Hz.
    pub fn frequency_hz(&self) -> f32 {
        let semitones = self.initial_note as f32 + self.total_pitchbend_semitones - 69.0;
        440.0 * 2.0_f32.powf(semitones / 12.0)
    }

    /// Transition to [`KeyState::Off`] regardless of pedals.
    #[inline]
    pub(crate) fn finish(&mut self) {
        self.key_down = false;
        self.held_by_sustain = false;
        self.held_by_sostenuto = false;
    }

    #[inline]
    pub(crate) fn matches(&self, midi_channel: u8, initial_note: u8) -> bool {
        self.midi_channel == midi_channel && self.initial_note == initial_note
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note() -> MpeNote {
        MpeNote::new(
            1,
            2,
            69,
            MpeValue::from_7bit(100),
            MpeValue::CENTRE,
            MpeValue::from_7bit(100),
            MpeValue::CENTRE,
        )
    }

    #[test]
    fn test_key_state_derivation() {
        let mut n = note();
        assert_eq!(n.key_state(), KeyState::KeyDown);

        n.held_by_sustain = true;
        assert_eq!(n.key_state(), KeyState::KeyDownAndSustained);

        n.key_down = false;
        assert_eq!(n.key_state(), KeyState::Sustained);
        assert!(n.key_state().is_sustained());
        assert!(!n.key_state().is_key_down());

        n.held_by_sustain = false;
        n.held_by_sostenuto = true;
        assert_eq!(n.key_state(), KeyState::Sustained);

        n.finish();
        assert_eq!(n.key_state(), KeyState::Off);
    }

    #[test]
    fn test_frequency_of_unbent_a4() {
        let n = note();
        assert!((n.frequency_hz() - 440.0).abs() < 0.001);
    }

    #[test]
    fn test_frequency_follows_total_bend() {
        let mut n = note();
        n.total_pitchbend_semitones = 12.0;
        assert!((n.frequency_hz() - 880.0).abs() < 0.01);
    }
}
