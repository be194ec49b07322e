//! Centralized error type for the mpekit umbrella crate.
//!
//! Wraps subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("MIDI: {0}")]
    Midi(#[from] mpekit_midi::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
