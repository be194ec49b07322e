//! The MPE instrument: note lifecycle, zone-aware routing and listener
//! notification.

use std::ops::RangeInclusive;
use std::sync::Arc;

use midi_msg::{Channel, ChannelModeMsg, ChannelVoiceMsg, ControlChange, MidiMsg};
use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::builder::MpeInstrumentBuilder;
use super::dimension::{Dimension, DimensionTracker, TrackingMode};
use super::initial::{ChannelSeeded, InitialExpression, NoteOnContext};
use super::listener::{notify, ListenerId, ListenerList, MpeListener, NoteEvent, Notifications};
use super::note::{KeyState, MpeNote, NoteId};
use super::value::MpeValue;
use super::zone::{MpeZoneLayout, DEFAULT_MASTER_PITCHBEND_RANGE, MAX_PITCHBEND_RANGE};
use crate::error::{Error, Result};
use crate::event::MidiEvent;

/// Controller numbers the instrument reacts to.
pub mod cc {
    pub const SUSTAIN: u8 = 64;
    pub const SOSTENUTO: u8 = 66;
    pub const TIMBRE_MSB: u8 = 74;
    pub const PRESSURE_LSB: u8 = 102;
    pub const TIMBRE_LSB: u8 = 106;
    pub const ALL_NOTES_OFF: u8 = 123;
}

/// Note-off velocity used when a note-on with velocity 0 ends a note.
const RUNNING_STATUS_NOTE_OFF_VELOCITY: u8 = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pedal {
    Sustain,
    Sostenuto,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OmniMode {
    enabled: bool,
    pitchbend_range: u8,
}

impl Default for OmniMode {
    fn default() -> Self {
        Self {
            enabled: false,
            pitchbend_range: DEFAULT_MASTER_PITCHBEND_RANGE,
        }
    }
}

#[inline]
fn check_channel(midi_channel: u8) -> Result<()> {
    if (1..=16).contains(&midi_channel) {
        Ok(())
    } else {
        Err(Error::InvalidChannel(midi_channel))
    }
}

#[inline]
fn check_note(note_number: u8) -> Result<()> {
    if note_number <= 127 {
        Ok(())
    } else {
        Err(Error::InvalidNoteNumber(note_number))
    }
}

#[inline]
fn check_pitchbend_range(semitones: u8) -> Result<()> {
    if semitones <= MAX_PITCHBEND_RANGE {
        Ok(())
    } else {
        Err(Error::InvalidPitchbendRange(semitones))
    }
}

#[inline]
fn changed_event(dimension: Dimension) -> NoteEvent {
    match dimension {
        Dimension::Pitchbend => NoteEvent::PitchbendChanged,
        Dimension::Pressure => NoteEvent::PressureChanged,
        Dimension::Timbre => NoteEvent::TimbreChanged,
    }
}

#[inline]
fn combine_msb(msb: u8, lsb: Option<u8>) -> MpeValue {
    match lsb {
        Some(lsb) => MpeValue::from_msb_lsb(msb, lsb),
        None => MpeValue::from_7bit(msb),
    }
}

/// Everything guarded by the instrument lock.
struct InstrumentState {
    /// Playing notes, oldest first.
    notes: Vec<MpeNote>,
    layout: MpeZoneLayout,
    omni: OmniMode,
    pitchbend: DimensionTracker,
    pressure: DimensionTracker,
    timbre: DimensionTracker,
    pressure_lsb: [Option<u8>; 16],
    timbre_lsb: [Option<u8>; 16],
    sustain: [bool; 16],
    sostenuto: [bool; 16],
    next_note_id: NoteId,
    initial: Box<dyn InitialExpression>,
}

impl InstrumentState {
    fn new(layout: MpeZoneLayout, initial: Box<dyn InitialExpression>) -> Self {
        Self {
            notes: Vec::with_capacity(64),
            layout,
            omni: OmniMode::default(),
            pitchbend: DimensionTracker::new(Dimension::Pitchbend),
            pressure: DimensionTracker::new(Dimension::Pressure),
            timbre: DimensionTracker::new(Dimension::Timbre),
            pressure_lsb: [None; 16],
            timbre_lsb: [None; 16],
            sustain: [false; 16],
            sostenuto: [false; 16],
            next_note_id: 1,
            initial,
        }
    }

    #[inline]
    fn tracker(&self, dimension: Dimension) -> &DimensionTracker {
        match dimension {
            Dimension::Pitchbend => &self.pitchbend,
            Dimension::Pressure => &self.pressure,
            Dimension::Timbre => &self.timbre,
        }
    }

    #[inline]
    fn tracker_mut(&mut self, dimension: Dimension) -> &mut DimensionTracker {
        match dimension {
            Dimension::Pitchbend => &mut self.pitchbend,
            Dimension::Pressure => &mut self.pressure,
            Dimension::Timbre => &mut self.timbre,
        }
    }

    #[inline]
    fn is_note_channel(&self, midi_channel: u8) -> bool {
        self.omni.enabled || self.layout.zone_by_note_channel(midi_channel).is_some()
    }

    #[inline]
    fn is_master_channel(&self, midi_channel: u8) -> bool {
        !self.omni.enabled && self.layout.zone_by_master_channel(midi_channel).is_some()
    }

    /// Note channels a pedal or all-notes-off on `midi_channel` acts on.
    /// Zones are addressed through their master channel; in Omni mode every
    /// channel addresses only itself.
    fn controlled_channels(&self, midi_channel: u8) -> Option<RangeInclusive<u8>> {
        if self.omni.enabled {
            Some(midi_channel..=midi_channel)
        } else {
            self.layout
                .zone_by_master_channel(midi_channel)
                .map(|zone| zone.note_channels())
        }
    }

    fn find_index(&self, midi_channel: u8, note_number: u8) -> Option<usize> {
        self.notes
            .iter()
            .position(|note| note.matches(midi_channel, note_number))
    }

    /// Next id not held by a playing note. Ids wrap past `NoteId::MAX`.
    fn allocate_note_id(&mut self) -> NoteId {
        loop {
            let id = self.next_note_id;
            self.next_note_id = self.next_note_id.checked_add(1).unwrap_or(1);
            if self.notes.iter().all(|note| note.id != id) {
                return id;
            }
        }
    }

    /// Recompute the note's total pitchbend from its own bend and the
    /// current master bend of its zone.
    fn with_total_pitchbend(&self, mut note: MpeNote) -> MpeNote {
        if self.omni.enabled {
            note.total_pitchbend = note.pitchbend;
            note.total_pitchbend_semitones =
                note.pitchbend.as_signed_f32() * self.omni.pitchbend_range as f32;
        } else if let Some(zone) = self.layout.zone_by_note_channel(note.midi_channel) {
            let master = self.pitchbend.last_received(zone.master_channel());
            note.total_pitchbend = note.pitchbend.saturating_offset(master);
            note.total_pitchbend_semitones = note.pitchbend.as_signed_f32()
                * zone.per_note_pitchbend_range() as f32
                + master.as_signed_f32() * zone.master_pitchbend_range() as f32;
        }
        note
    }

    fn note_on(
        &mut self,
        midi_channel: u8,
        note_number: u8,
        velocity: MpeValue,
        out: &mut Notifications,
    ) {
        if !self.is_note_channel(midi_channel) {
            trace!(midi_channel, note_number, "Note-on ignored on non-note channel");
            return;
        }

        if let Some(index) = self.find_index(midi_channel, note_number) {
            let mut replaced = self.notes.remove(index);
            replaced.finish();
            notify(out, NoteEvent::Released, &replaced);
        }

        let ctx = NoteOnContext {
            midi_channel,
            note_number,
            velocity,
            last_pitchbend: self.pitchbend.last_received(midi_channel),
            last_pressure: self.pressure.last_received(midi_channel),
            last_timbre: self.timbre.last_received(midi_channel),
        };
        let id = self.allocate_note_id();
        let mut note = MpeNote::new(
            id,
            midi_channel,
            note_number,
            velocity,
            self.initial.pitchbend(&ctx),
            self.initial.pressure(&ctx),
            self.initial.timbre(&ctx),
        );
        note.held_by_sustain = self.sustain[midi_channel as usize - 1];
        let note = self.with_total_pitchbend(note);

        notify(out, NoteEvent::Added, &note);
        self.notes.push(note);
    }

    fn note_off(
        &mut self,
        midi_channel: u8,
        note_number: u8,
        velocity: MpeValue,
        out: &mut Notifications,
    ) {
        if self.notes.is_empty() || !self.is_note_channel(midi_channel) {
            return;
        }
        let Some(index) = self.find_index(midi_channel, note_number) else {
            trace!(midi_channel, note_number, "Note-off without matching note");
            return;
        };

        let note = &mut self.notes[index];
        note.key_down = false;
        note.note_off_velocity = velocity;

        if note.is_held() {
            notify(out, NoteEvent::KeyStateChanged, note);
        } else {
            let released = self.notes.remove(index);
            notify(out, NoteEvent::Released, &released);
        }
    }

    fn update_dimension(
        &mut self,
        dimension: Dimension,
        midi_channel: u8,
        value: MpeValue,
        out: &mut Notifications,
    ) {
        self.tracker_mut(dimension).record(midi_channel, value);

        if self.notes.is_empty() {
            return;
        }

        if self.is_master_channel(midi_channel) {
            self.update_dimension_master(dimension, midi_channel, value, out);
        } else if self.is_note_channel(midi_channel) {
            let routed = self.tracker(dimension).route(&self.notes, midi_channel);
            for index in routed {
                self.update_dimension_for_note(index, dimension, value, out);
            }
        } else {
            trace!(midi_channel, ?dimension, "Expression ignored on unassigned channel");
        }
    }

    fn update_dimension_master(
        &mut self,
        dimension: Dimension,
        master_channel: u8,
        value: MpeValue,
        out: &mut Notifications,
    ) {
        let Some(zone) = self.layout.zone_by_master_channel(master_channel).copied() else {
            return;
        };

        for index in 0..self.notes.len() {
            if !zone.is_note_channel(self.notes[index].midi_channel) {
                continue;
            }

            if dimension == Dimension::Pitchbend {
                // The master bend lives in the tracker; only the total moves
                self.notes[index] = self.with_total_pitchbend(self.notes[index]);
                notify(out, NoteEvent::PitchbendChanged, &self.notes[index]);
            } else if dimension.value(&self.notes[index]) != value {
                *dimension.value_mut(&mut self.notes[index]) = value;
                notify(out, changed_event(dimension), &self.notes[index]);
            }
        }
    }

    fn update_dimension_for_note(
        &mut self,
        index: usize,
        dimension: Dimension,
        value: MpeValue,
        out: &mut Notifications,
    ) {
        if dimension.value(&self.notes[index]) == value {
            return;
        }

        *dimension.value_mut(&mut self.notes[index]) = value;
        if dimension == Dimension::Pitchbend {
            self.notes[index] = self.with_total_pitchbend(self.notes[index]);
        }
        notify(out, changed_event(dimension), &self.notes[index]);
    }

    fn pedal(&mut self, midi_channel: u8, is_down: bool, pedal: Pedal, out: &mut Notifications) {
        let Some(channels) = self.controlled_channels(midi_channel) else {
            trace!(midi_channel, ?pedal, "Pedal ignored on non-master channel");
            return;
        };

        let flags = match pedal {
            Pedal::Sustain => &mut self.sustain,
            Pedal::Sostenuto => &mut self.sostenuto,
        };
        for channel in channels.clone() {
            flags[channel as usize - 1] = is_down;
        }

        let mut index = 0;
        while index < self.notes.len() {
            let note = &mut self.notes[index];
            if !channels.contains(&note.midi_channel) {
                index += 1;
                continue;
            }

            let before = note.key_state();
            let key_down = note.key_down;
            let hold = match pedal {
                Pedal::Sustain => &mut note.held_by_sustain,
                Pedal::Sostenuto => &mut note.held_by_sostenuto,
            };
            if !is_down {
                *hold = false;
            } else if key_down {
                *hold = true;
            }

            let after = note.key_state();
            if after == KeyState::Off {
                let released = self.notes.remove(index);
                notify(out, NoteEvent::Released, &released);
                continue;
            }
            if after != before {
                notify(out, NoteEvent::KeyStateChanged, note);
            }
            index += 1;
        }
    }

    fn finish_notes_where(
        &mut self,
        mut predicate: impl FnMut(&MpeNote) -> bool,
        out: &mut Notifications,
    ) {
        self.notes.retain_mut(|note| {
            if predicate(note) {
                note.finish();
                notify(out, NoteEvent::Released, note);
                false
            } else {
                true
            }
        });
    }

    fn all_notes_off(&mut self, midi_channel: u8, out: &mut Notifications) {
        let Some(channels) = self.controlled_channels(midi_channel) else {
            trace!(midi_channel, "All-notes-off ignored on non-master channel");
            return;
        };
        self.finish_notes_where(|note| channels.contains(&note.midi_channel), out);
    }

    fn release_all_notes(&mut self, out: &mut Notifications) {
        self.finish_notes_where(|_| true, out);
    }

    fn reset_pedals(&mut self) {
        self.sustain = [false; 16];
        self.sostenuto = [false; 16];
    }

    fn controller(&mut self, midi_channel: u8, control: u8, value: u8, out: &mut Notifications) {
        let slot = midi_channel as usize - 1;
        match control {
            cc::SUSTAIN => self.pedal(midi_channel, value >= 64, Pedal::Sustain, out),
            cc::SOSTENUTO => self.pedal(midi_channel, value >= 64, Pedal::Sostenuto, out),
            cc::TIMBRE_MSB => {
                let timbre = combine_msb(value, self.timbre_lsb[slot]);
                self.update_dimension(Dimension::Timbre, midi_channel, timbre, out);
            }
            cc::PRESSURE_LSB => self.pressure_lsb[slot] = Some(value.min(127)),
            cc::TIMBRE_LSB => self.timbre_lsb[slot] = Some(value.min(127)),
            cc::ALL_NOTES_OFF => self.all_notes_off(midi_channel, out),
            _ => {}
        }
    }

    fn channel_voice(
        &mut self,
        midi_channel: u8,
        msg: ChannelVoiceMsg,
        out: &mut Notifications,
    ) -> Result<()> {
        match msg {
            ChannelVoiceMsg::NoteOn { note, velocity } => {
                check_note(note)?;
                if velocity == 0 {
                    let off = MpeValue::from_7bit(RUNNING_STATUS_NOTE_OFF_VELOCITY);
                    self.note_off(midi_channel, note, off, out);
                } else {
                    self.note_on(midi_channel, note, MpeValue::from_7bit(velocity), out);
                }
            }
            ChannelVoiceMsg::NoteOff { note, velocity } => {
                check_note(note)?;
                self.note_off(midi_channel, note, MpeValue::from_7bit(velocity), out);
            }
            ChannelVoiceMsg::HighResNoteOn { note, velocity } => {
                check_note(note)?;
                if velocity == 0 {
                    let off = MpeValue::from_7bit(RUNNING_STATUS_NOTE_OFF_VELOCITY);
                    self.note_off(midi_channel, note, off, out);
                } else {
                    self.note_on(midi_channel, note, MpeValue::from_14bit(velocity), out);
                }
            }
            ChannelVoiceMsg::HighResNoteOff { note, velocity } => {
                check_note(note)?;
                self.note_off(midi_channel, note, MpeValue::from_14bit(velocity), out);
            }
            ChannelVoiceMsg::PitchBend { bend } => {
                self.update_dimension(
                    Dimension::Pitchbend,
                    midi_channel,
                    MpeValue::from_14bit(bend),
                    out,
                );
            }
            ChannelVoiceMsg::ChannelPressure { pressure } => {
                let value = combine_msb(pressure, self.pressure_lsb[midi_channel as usize - 1]);
                self.update_dimension(Dimension::Pressure, midi_channel, value, out);
            }
            ChannelVoiceMsg::ControlChange {
                control: ControlChange::CC { control, value },
            } => self.controller(midi_channel, control, value, out),
            ChannelVoiceMsg::ControlChange { control } => {
                // Typed and high-resolution controllers: recover the raw
                // (controller, value) pairs from their wire form
                let msg = MidiMsg::ChannelVoice {
                    channel: Channel::from_u8(midi_channel - 1),
                    msg: ChannelVoiceMsg::ControlChange { control },
                };
                let data: SmallVec<[u8; 8]> =
                    msg.to_midi().into_iter().filter(|b| b & 0x80 == 0).collect();
                for pair in data.chunks_exact(2) {
                    self.controller(midi_channel, pair[0], pair[1], out);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Tracks expressive notes from MPE input.
///
/// The instrument owns a zone layout (or Omni mode), the set of playing
/// notes and the per-dimension tracking state. Feed it events either through
/// the typed methods ([`note_on`](Self::note_on), [`pitchbend`](Self::pitchbend), ...)
/// or as MIDI messages through [`process_midi_event`](Self::process_midi_event).
/// It works out which notes each message affects and reports every change
/// to the registered [`MpeListener`]s.
///
/// All methods take `&self`; the instrument can be shared between a
/// real-time input thread and a configuration thread. One lock guards the
/// whole state and is held only while that state is mutated. Listener
/// callbacks run after the lock is released, synchronously on the calling
/// thread and in the order the changes happened, also across threads: a
/// configuration call on one thread never reaches listeners ahead of an event
/// it was applied after. Calling back into the instrument from inside a
/// listener callback is not supported and can deadlock.
///
/// Channels are 1-based (1-16) and note numbers 0-127; anything outside
/// those ranges is rejected with an error. Messages that are merely out of
/// protocol (wrong channel role, note-off without a note) are ignored.
///
/// # Example
///
/// ```ignore
/// use mpekit_midi::mpe::{MpeInstrument, MpeValue, MpeZoneLayout};
///
/// let instrument = MpeInstrument::builder()
///     .zone_layout(MpeZoneLayout::lower_zone(15))
///     .build()?;
///
/// instrument.note_on(2, 60, MpeValue::from_7bit(100))?;
/// instrument.pitchbend(2, MpeValue::MAX)?;
/// assert_eq!(instrument.num_playing_notes(), 1);
/// ```
pub struct MpeInstrument {
    state: Mutex<InstrumentState>,
    /// Taken before the state lock is released and held across dispatch, so
    /// notifications reach listeners in mutation order.
    dispatch: Mutex<()>,
    listeners: ListenerList,
}

impl Default for MpeInstrument {
    fn default() -> Self {
        Self::new()
    }
}

impl MpeInstrument {
    /// Instrument with no zones. Until a layout is set or Omni mode is
    /// enabled, no channel is a note channel and all input is ignored.
    pub fn new() -> Self {
        Self::from_parts(MpeZoneLayout::new(), Box::new(ChannelSeeded))
    }

    pub fn builder() -> MpeInstrumentBuilder {
        MpeInstrumentBuilder::default()
    }

    pub(crate) fn from_parts(layout: MpeZoneLayout, initial: Box<dyn InitialExpression>) -> Self {
        Self {
            state: Mutex::new(InstrumentState::new(layout, initial)),
            dispatch: Mutex::new(()),
            listeners: ListenerList::new(),
        }
    }

    /// Run `f` under the lock, then fire whatever it recorded.
    ///
    /// The dispatch lock is acquired while the state lock is still held, so a
    /// later mutation cannot reach listeners before an earlier one.
    fn with_state<R>(&self, f: impl FnOnce(&mut InstrumentState, &mut Notifications) -> R) -> R {
        let mut out = Notifications::new();
        let (result, _dispatching) = {
            let mut state = self.state.lock();
            let result = f(&mut state, &mut out);
            (result, self.dispatch.lock())
        };
        self.listeners.dispatch(&out);
        result
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Replace the zone layout. Releases every playing note first and
    /// leaves Omni mode.
    pub fn set_zone_layout(&self, layout: MpeZoneLayout) {
        self.with_state(|state, out| {
            state.release_all_notes(out);
            debug!(zones = layout.num_zones(), "MPE zone layout replaced");
            state.layout = layout;
            state.omni.enabled = false;
            state.reset_pedals();
        });
    }

    /// Treat all 16 channels as note channels with no master channel.
    /// Releases every playing note first.
    pub fn enable_omni_mode(&self, pitchbend_range: u8) -> Result<()> {
        check_pitchbend_range(pitchbend_range)?;
        self.with_state(|state, out| {
            state.release_all_notes(out);
            debug!(pitchbend_range, "MPE omni mode enabled");
            state.omni = OmniMode {
                enabled: true,
                pitchbend_range,
            };
            state.reset_pedals();
        });
        Ok(())
    }

    pub fn set_tracking_mode(&self, dimension: Dimension, mode: TrackingMode) {
        let mut state = self.state.lock();
        let tracker = state.tracker_mut(dimension);
        debug!(dimension = ?tracker.dimension(), ?mode, "MPE tracking mode set");
        tracker.set_mode(mode);
    }

    pub fn set_pitchbend_tracking_mode(&self, mode: TrackingMode) {
        self.set_tracking_mode(Dimension::Pitchbend, mode);
    }

    pub fn set_pressure_tracking_mode(&self, mode: TrackingMode) {
        self.set_tracking_mode(Dimension::Pressure, mode);
    }

    pub fn set_timbre_tracking_mode(&self, mode: TrackingMode) {
        self.set_tracking_mode(Dimension::Timbre, mode);
    }

    /// Replace the rules choosing initial values for new notes.
    pub fn set_initial_expression(&self, initial: impl InitialExpression + 'static) {
        self.state.lock().initial = Box::new(initial);
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    pub fn add_listener(&self, listener: Arc<dyn MpeListener>) -> ListenerId {
        let id = self.listeners.add(listener);
        debug!(id, "MPE listener added");
        id
    }

    /// Returns false if no listener was registered under `id`.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn num_listeners(&self) -> usize {
        self.listeners.len()
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Start a note. Ignored unless `midi_channel` is a note channel. A note
    /// already playing with the same channel and number is released first.
    pub fn note_on(&self, midi_channel: u8, note_number: u8, velocity: MpeValue) -> Result<()> {
        check_channel(midi_channel)?;
        check_note(note_number)?;
        self.with_state(|state, out| state.note_on(midi_channel, note_number, velocity, out));
        Ok(())
    }

    /// Release a note's key. The note keeps playing while a pedal holds it.
    pub fn note_off(&self, midi_channel: u8, note_number: u8, velocity: MpeValue) -> Result<()> {
        check_channel(midi_channel)?;
        check_note(note_number)?;
        self.with_state(|state, out| state.note_off(midi_channel, note_number, velocity, out));
        Ok(())
    }

    /// Pitchbend on a note channel bends the tracked note(s) on it; on a
    /// master channel it becomes the zone's master bend for all its notes.
    pub fn pitchbend(&self, midi_channel: u8, value: MpeValue) -> Result<()> {
        self.dimension(Dimension::Pitchbend, midi_channel, value)
    }

    pub fn pressure(&self, midi_channel: u8, value: MpeValue) -> Result<()> {
        self.dimension(Dimension::Pressure, midi_channel, value)
    }

    pub fn timbre(&self, midi_channel: u8, value: MpeValue) -> Result<()> {
        self.dimension(Dimension::Timbre, midi_channel, value)
    }

    fn dimension(&self, dimension: Dimension, midi_channel: u8, value: MpeValue) -> Result<()> {
        check_channel(midi_channel)?;
        self.with_state(|state, out| state.update_dimension(dimension, midi_channel, value, out));
        Ok(())
    }

    /// Sustain pedal on a zone's master channel (or any channel in Omni mode).
    pub fn sustain_pedal(&self, midi_channel: u8, is_down: bool) -> Result<()> {
        check_channel(midi_channel)?;
        self.with_state(|state, out| state.pedal(midi_channel, is_down, Pedal::Sustain, out));
        Ok(())
    }

    /// Sostenuto pedal on a zone's master channel (or any channel in Omni
    /// mode). Holds only the notes whose keys are down when it is pressed.
    pub fn sostenuto_pedal(&self, midi_channel: u8, is_down: bool) -> Result<()> {
        check_channel(midi_channel)?;
        self.with_state(|state, out| state.pedal(midi_channel, is_down, Pedal::Sostenuto, out));
        Ok(())
    }

    /// Release every note in the zone mastered by `midi_channel`, or every
    /// note on `midi_channel` in Omni mode.
    pub fn all_notes_off(&self, midi_channel: u8) -> Result<()> {
        check_channel(midi_channel)?;
        self.with_state(|state, out| state.all_notes_off(midi_channel, out));
        Ok(())
    }

    /// Release and discard every playing note.
    pub fn release_all_notes(&self) {
        self.with_state(|state, out| state.release_all_notes(out));
    }

    /// Dispatch a channel-voice message to the matching event method.
    pub fn process_midi_event(&self, event: &MidiEvent) -> Result<()> {
        let midi_channel = event.channel_num();
        self.with_state(|state, out| state.channel_voice(midi_channel, event.msg, out))
    }

    /// Like [`process_midi_event`](Self::process_midi_event), also handling
    /// the channel-mode all-notes-off message. Other messages are ignored.
    pub fn process_midi_msg(&self, msg: &MidiMsg) -> Result<()> {
        match msg {
            MidiMsg::ChannelVoice { channel, msg } => {
                self.process_midi_event(&MidiEvent::new(*channel, *msg))
            }
            MidiMsg::ChannelMode {
                channel,
                msg: ChannelModeMsg::AllNotesOff,
            } => self.all_notes_off(*channel as u8 + 1),
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn num_playing_notes(&self) -> usize {
        self.state.lock().notes.len()
    }

    /// Note at `index`, oldest first; the most recently added note is last.
    pub fn note(&self, index: usize) -> Option<MpeNote> {
        self.state.lock().notes.get(index).copied()
    }

    /// The playing note started on `midi_channel` with `note_number`.
    pub fn find_note(&self, midi_channel: u8, note_number: u8) -> Option<MpeNote> {
        let state = self.state.lock();
        state
            .find_index(midi_channel, note_number)
            .map(|index| state.notes[index])
    }

    /// The most recent note on `midi_channel` whose key is still down.
    pub fn most_recent_note(&self, midi_channel: u8) -> Option<MpeNote> {
        self.state
            .lock()
            .notes
            .iter()
            .rev()
            .find(|note| note.midi_channel == midi_channel && note.key_down)
            .copied()
    }

    /// The most recent playing note that is not `other`.
    pub fn most_recent_note_other_than(&self, other: &MpeNote) -> Option<MpeNote> {
        self.state
            .lock()
            .notes
            .iter()
            .rev()
            .find(|note| note.id != other.id)
            .copied()
    }

    /// Snapshot of every playing note, oldest first.
    pub fn notes(&self) -> Vec<MpeNote> {
        self.state.lock().notes.clone()
    }

    /// The configured zone layout. While Omni mode is enabled this is the
    /// layout that will apply again once a layout is set, not the one in use.
    pub fn zone_layout(&self) -> MpeZoneLayout {
        self.state.lock().layout.clone()
    }

    pub fn is_omni_mode_enabled(&self) -> bool {
        self.state.lock().omni.enabled
    }

    /// Omni mode pitchbend range, if Omni mode is enabled.
    pub fn omni_pitchbend_range(&self) -> Option<u8> {
        let omni = self.state.lock().omni;
        omni.enabled.then_some(omni.pitchbend_range)
    }

    pub fn tracking_mode(&self, dimension: Dimension) -> TrackingMode {
        self.state.lock().tracker(dimension).mode()
    }

    /// Last value received for `dimension` on `midi_channel`, used to seed
    /// new notes there.
    pub fn last_value_received(&self, dimension: Dimension, midi_channel: u8) -> Result<MpeValue> {
        check_channel(midi_channel)?;
        Ok(self
            .state
            .lock()
            .tracker(dimension)
            .last_received(midi_channel))
    }

    /// Whether the sustain pedal currently holds `midi_channel`.
    pub fn is_sustain_pedal_down(&self, midi_channel: u8) -> bool {
        (1..=16).contains(&midi_channel) && self.state.lock().sustain[midi_channel as usize - 1]
    }

    /// Whether the sostenuto pedal is currently down for `midi_channel`.
    pub fn is_sostenuto_pedal_down(&self, midi_channel: u8) -> bool {
        (1..=16).contains(&midi_channel) && self.state.lock().sostenuto[midi_channel as usize - 1]
    }
}
