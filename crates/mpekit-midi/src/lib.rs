//! MIDI subsystem for mpekit.
//!
//! Provides typed channel-voice events and MPE note tracking: zone layouts,
//! per-note pitchbend, pressure and timbre, pedal handling and listener
//! notification.

pub mod error;
pub use error::{Error, Result};

pub(crate) mod event;
pub use event::MidiEvent;

pub use midi_msg::{Channel, ChannelModeMsg, ChannelVoiceMsg, ControlChange, MidiMsg};

pub mod mpe;
pub use mpe::{
    Dimension, KeyState, MpeInstrument, MpeInstrumentBuilder, MpeListener, MpeNote, MpeValue,
    MpeZone, MpeZoneLayout, TrackingMode,
};
