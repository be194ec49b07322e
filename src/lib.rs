//! # mpekit - MPE Note Tracking
//!
//! Turns MIDI Polyphonic Expression input into a set of expressive notes,
//! each with its own pitchbend, pressure and timbre.
//!
//! ## Architecture
//!
//! mpekit is an umbrella crate over:
//! - **mpekit-midi** - MIDI events, MPE zones, note tracking and listeners
//!
//! ## Quick Start
//!
//! ```ignore
//! use mpekit::prelude::*;
//!
//! let instrument = MpeInstrument::builder()
//!     .zone_layout(MpeZoneLayout::lower_zone(15))
//!     .pressure_tracking(TrackingMode::LowestNoteOnChannel)
//!     .build()?;
//!
//! instrument.process_midi_event(&MidiEvent::note_on(2, 60, 100))?;
//! instrument.process_midi_event(&MidiEvent::pitch_bend(1, 12000))?;
//!
//! for note in instrument.notes() {
//!     println!("{} Hz, {} st", note.frequency_hz(), note.total_pitchbend_semitones());
//! }
//! ```

/// Re-export of mpekit-midi for direct access
pub use mpekit_midi as midi;

pub use mpekit_midi::mpe;

pub use mpekit_midi::{
    Dimension, KeyState, MidiEvent, MpeInstrument, MpeInstrumentBuilder, MpeListener, MpeNote,
    MpeValue, MpeZone, MpeZoneLayout, TrackingMode,
};

mod error;
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    // Instrument
    pub use crate::{MpeInstrument, MpeInstrumentBuilder, MpeListener};

    // Notes and values
    pub use crate::{Dimension, KeyState, MpeNote, MpeValue, TrackingMode};

    // Layout
    pub use crate::{MpeZone, MpeZoneLayout};

    // MIDI
    pub use crate::MidiEvent;

    pub use crate::{Error, Result};
}
