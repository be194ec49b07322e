//! MPE (MIDI Polyphonic Expression) note tracking.
//!
//! [`MpeInstrument`] turns a stream of MPE input into a set of expressive
//! notes, each with its own pitchbend, pressure and timbre. Channels are
//! split into zones ([`MpeZoneLayout`]) or treated uniformly in Omni mode.

mod builder;
mod dimension;
mod initial;
mod instrument;
mod listener;
mod note;
mod value;
mod zone;

pub use builder::MpeInstrumentBuilder;
pub use dimension::{Dimension, TrackingMode};
pub use initial::{ChannelSeeded, InitialExpression, NoteOnContext};
pub use instrument::{cc, MpeInstrument};
pub use listener::{ListenerId, MpeListener};
pub use note::{KeyState, MpeNote, NoteId};
pub use value::MpeValue;
pub use zone::{
    ChannelRole, MpeZone, MpeZoneLayout, DEFAULT_MASTER_PITCHBEND_RANGE,
    DEFAULT_PER_NOTE_PITCHBEND_RANGE, MAX_PITCHBEND_RANGE,
};
