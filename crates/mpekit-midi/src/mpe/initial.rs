//! Initial expression values for newly triggered notes.

use super::value::MpeValue;

/// Everything known about a note-on when its initial values are chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteOnContext {
    /// 1-based MIDI channel.
    pub midi_channel: u8,
    pub note_number: u8,
    pub velocity: MpeValue,
    pub last_pitchbend: MpeValue,
    pub last_pressure: MpeValue,
    pub last_timbre: MpeValue,
}

/// Chooses the starting pitchbend, pressure and timbre of a new note.
///
/// The defaults reuse the last pitchbend and timbre received on the note's
/// channel and take pressure from the note-on velocity. Implementations run
/// under the instrument lock and must not block.
pub trait InitialExpression: Send + Sync {
    fn pitchbend(&self, ctx: &NoteOnContext) -> MpeValue {
        ctx.last_pitchbend
    }

    fn pressure(&self, ctx: &NoteOnContext) -> MpeValue {
        ctx.velocity
    }

    fn timbre(&self, ctx: &NoteOnContext) -> MpeValue {
        ctx.last_timbre
    }
}

/// The default seeding rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChannelSeeded;

impl InitialExpression for ChannelSeeded {}
