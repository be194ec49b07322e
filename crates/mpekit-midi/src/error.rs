//! Error types for the MIDI subsystem.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("MIDI channel {0} out of range (expected 1-16)")]
    InvalidChannel(u8),

    #[error("MIDI note number {0} out of range (expected 0-127)")]
    InvalidNoteNumber(u8),

    #[error("Pitchbend range of {0} semitones out of range (expected 0-96)")]
    InvalidPitchbendRange(u8),

    #[error("Invalid zone: {0}")]
    InvalidZone(String),

    #[error("Zone overlaps an existing zone on channel {channel}")]
    OverlappingZones { channel: u8 },
}

pub type Result<T> = std::result::Result<T, Error>;
