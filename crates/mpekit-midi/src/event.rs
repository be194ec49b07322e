//! Typed channel-voice MIDI events fed into the MPE instrument.
//!
//! Channel numbers on this API are 1-based (1-16), matching the MPE
//! instrument. The wrapped [`Channel`] from `midi-msg` stays 0-based.

use midi_msg::{Channel, ChannelVoiceMsg, ControlChange, MidiMsg};

/// A single channel-voice MIDI message addressed to one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiEvent {
    pub channel: Channel,
    pub msg: ChannelVoiceMsg,
}

impl MidiEvent {
    #[inline]
    pub fn new(channel: Channel, msg: ChannelVoiceMsg) -> Self {
        Self { channel, msg }
    }

    #[inline]
    fn on_channel(channel: u8, msg: ChannelVoiceMsg) -> Self {
        Self {
            channel: Channel::from_u8(channel.saturating_sub(1)),
            msg,
        }
    }

    #[inline]
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::on_channel(channel, ChannelVoiceMsg::NoteOn { note, velocity })
    }

    #[inline]
    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self::on_channel(channel, ChannelVoiceMsg::NoteOff { note, velocity })
    }

    #[inline]
    pub fn control_change(channel: u8, cc: u8, value: u8) -> Self {
        Self::on_channel(
            channel,
            ChannelVoiceMsg::ControlChange {
                control: ControlChange::CC { control: cc, value },
            },
        )
    }

    /// 14-bit pitch wheel position, 8192 = centre.
    #[inline]
    pub fn pitch_bend(channel: u8, bend: u16) -> Self {
        Self::on_channel(channel, ChannelVoiceMsg::PitchBend { bend })
    }

    #[inline]
    pub fn aftertouch(channel: u8, pressure: u8) -> Self {
        Self::on_channel(channel, ChannelVoiceMsg::ChannelPressure { pressure })
    }

    /// 1-based channel number.
    #[inline]
    pub fn channel_num(&self) -> u8 {
        self.channel as u8 + 1
    }

    #[inline]
    pub fn is_note_on(&self) -> bool {
        matches!(
            self.msg,
            ChannelVoiceMsg::NoteOn { velocity, .. } if velocity > 0
        ) || matches!(
            self.msg,
            ChannelVoiceMsg::HighResNoteOn { velocity, .. } if velocity > 0
        )
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        matches!(
            self.msg,
            ChannelVoiceMsg::NoteOff { .. }
                | ChannelVoiceMsg::HighResNoteOff { .. }
                | ChannelVoiceMsg::NoteOn { velocity: 0, .. }
                | ChannelVoiceMsg::HighResNoteOn { velocity: 0, .. }
        )
    }

    #[inline]
    pub fn note(&self) -> Option<u8> {
        match self.msg {
            ChannelVoiceMsg::NoteOn { note, .. }
            | ChannelVoiceMsg::NoteOff { note, .. }
            | ChannelVoiceMsg::HighResNoteOn { note, .. }
            | ChannelVoiceMsg::HighResNoteOff { note, .. }
            | ChannelVoiceMsg::PolyPressure { note, .. } => Some(note),
            _ => None,
        }
    }

    #[inline]
    pub fn to_midi_msg(&self) -> MidiMsg {
        MidiMsg::ChannelVoice {
            channel: self.channel,
            msg: self.msg,
        }
    }

    /// Wraps a parsed message if it is a channel-voice message.
    pub fn from_midi_msg(msg: &MidiMsg) -> Option<Self> {
        match msg {
            MidiMsg::ChannelVoice { channel, msg } => Some(Self {
                channel: *channel,
                msg: *msg,
            }),
            _ => None,
        }
    }

    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_midi_msg().to_midi()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, midi_msg::ParseError> {
        let (msg, _len) = MidiMsg::from_midi(bytes)?;
        Self::from_midi_msg(&msg).ok_or(midi_msg::ParseError::Invalid(
            "Expected ChannelVoice message",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_uses_one_based_channel() {
        let event = MidiEvent::note_on(2, 60, 100);
        assert!(event.is_note_on());
        assert!(!event.is_note_off());
        assert_eq!(event.note(), Some(60));
        assert_eq!(event.channel_num(), 2);
        assert_eq!(event.channel, Channel::Ch2);
    }

    #[test]
    fn test_note_on_zero_velocity_is_note_off() {
        let event = MidiEvent::note_on(1, 60, 0);
        assert!(event.is_note_off());
        assert!(!event.is_note_on());
    }

    #[test]
    fn test_control_change() {
        let event = MidiEvent::control_change(16, 74, 127);
        assert_eq!(event.channel_num(), 16);
        match event.msg {
            ChannelVoiceMsg::ControlChange {
                control: ControlChange::CC { control, value },
            } => {
                assert_eq!(control, 74);
                assert_eq!(value, 127);
            }
            _ => panic!("Expected CC"),
        }
        assert_eq!(event.note(), None);
    }

    #[test]
    fn test_bytes_parse_back_to_event() {
        let event = MidiEvent::pitch_bend(5, 12000);
        let parsed = MidiEvent::from_bytes(&event.to_bytes()).unwrap();
        assert_eq!(parsed, event);
    }
}
