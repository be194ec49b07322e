//! MpeInstrument builder for configuring layout, tracking and listeners.

use std::sync::Arc;

use super::dimension::{Dimension, TrackingMode};
use super::initial::{ChannelSeeded, InitialExpression};
use super::instrument::MpeInstrument;
use super::listener::MpeListener;
use super::zone::MpeZoneLayout;
use crate::error::Result;

pub struct MpeInstrumentBuilder {
    layout: MpeZoneLayout,
    omni_pitchbend_range: Option<u8>,
    pitchbend_tracking: TrackingMode,
    pressure_tracking: TrackingMode,
    timbre_tracking: TrackingMode,
    initial: Box<dyn InitialExpression>,
    listeners: Vec<Arc<dyn MpeListener>>,
}

impl Default for MpeInstrumentBuilder {
    fn default() -> Self {
        Self {
            layout: MpeZoneLayout::new(),
            omni_pitchbend_range: None,
            pitchbend_tracking: TrackingMode::default(),
            pressure_tracking: TrackingMode::default(),
            timbre_tracking: TrackingMode::default(),
            initial: Box::new(ChannelSeeded),
            listeners: Vec::new(),
        }
    }
}

impl MpeInstrumentBuilder {
    pub fn zone_layout(mut self, layout: MpeZoneLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Start in Omni mode. Takes precedence over the zone layout.
    pub fn omni_mode(mut self, pitchbend_range: u8) -> Self {
        self.omni_pitchbend_range = Some(pitchbend_range);
        self
    }

    pub fn pitchbend_tracking(mut self, mode: TrackingMode) -> Self {
        self.pitchbend_tracking = mode;
        self
    }

    pub fn pressure_tracking(mut self, mode: TrackingMode) -> Self {
        self.pressure_tracking = mode;
        self
    }

    pub fn timbre_tracking(mut self, mode: TrackingMode) -> Self {
        self.timbre_tracking = mode;
        self
    }

    pub fn initial_expression(mut self, initial: impl InitialExpression + 'static) -> Self {
        self.initial = Box::new(initial);
        self
    }

    /// Register a listener before any event can be processed.
    pub fn listener(mut self, listener: Arc<dyn MpeListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Fails only on an out-of-range Omni pitchbend range.
    pub fn build(self) -> Result<MpeInstrument> {
        let instrument = MpeInstrument::from_parts(self.layout, self.initial);

        if let Some(range) = self.omni_pitchbend_range {
            instrument.enable_omni_mode(range)?;
        }

        instrument.set_tracking_mode(Dimension::Pitchbend, self.pitchbend_tracking);
        instrument.set_tracking_mode(Dimension::Pressure, self.pressure_tracking);
        instrument.set_tracking_mode(Dimension::Timbre, self.timbre_tracking);

        for listener in self.listeners {
            instrument.add_listener(listener);
        }

        Ok(instrument)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_default_build() {
        let instrument = MpeInstrumentBuilder::default().build().unwrap();

        assert!(instrument.zone_layout().is_empty());
        assert!(!instrument.is_omni_mode_enabled());
        assert_eq!(instrument.num_listeners(), 0);
        for dimension in Dimension::ALL {
            assert_eq!(
                instrument.tracking_mode(dimension),
                TrackingMode::LastNotePlayedOnChannel
            );
        }
    }

    #[test]
    fn test_build_with_layout_and_tracking() {
        let instrument = MpeInstrument::builder()
            .zone_layout(MpeZoneLayout::upper_zone(5))
            .pressure_tracking(TrackingMode::HighestNoteOnChannel)
            .timbre_tracking(TrackingMode::AllNotesOnChannel)
            .build()
            .unwrap();

        assert_eq!(instrument.zone_layout(), MpeZoneLayout::upper_zone(5));
        assert_eq!(
            instrument.tracking_mode(Dimension::Pitchbend),
            TrackingMode::LastNotePlayedOnChannel
        );
        assert_eq!(
            instrument.tracking_mode(Dimension::Pressure),
            TrackingMode::HighestNoteOnChannel
        );
        assert_eq!(
            instrument.tracking_mode(Dimension::Timbre),
            TrackingMode::AllNotesOnChannel
        );
    }

    #[test]
    fn test_build_with_omni_mode() {
        let instrument = MpeInstrument::builder()
            .zone_layout(MpeZoneLayout::lower_zone(15))
            .omni_mode(12)
            .build()
            .unwrap();
        assert_eq!(instrument.omni_pitchbend_range(), Some(12));

        let result = MpeInstrument::builder().omni_mode(200).build();
        assert!(matches!(result, Err(Error::InvalidPitchbendRange(200))));
    }

    #[test]
    fn test_build_with_listener() {
        struct Quiet;
        impl MpeListener for Quiet {}

        let instrument = MpeInstrument::builder()
            .listener(Arc::new(Quiet))
            .listener(Arc::new(Quiet))
            .build()
            .unwrap();
        assert_eq!(instrument.num_listeners(), 2);
    }
}
