//! Data model for the MIDI input side of the pipeline.
//!
//! `MidiEvent` is what the external MIDI parser hands over (delta times
//! already resolved to absolute pulses). `MidiNote` is what the track
//! builder produces from it.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::SheetError;

/// A single parsed MIDI event. Read-only for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiEvent {
    /// Pulses since the previous event in the track
    #[serde(default)]
    pub delta_time: u32,
    /// Absolute time in pulses from the start of the track
    pub start_time: u32,
    /// MIDI channel (0-15); ignored for meta events
    #[serde(default)]
    pub channel: u8,
    pub kind: EventKind,
}

/// Channel and meta event payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8, velocity: u8 },
    KeyPressure { note: u8, pressure: u8 },
    ControlChange { controller: u8, value: u8 },
    ProgramChange { instrument: u8 },
    ChannelPressure { pressure: u8 },
    PitchBend { value: u16 },
    SysEx { data: Vec<u8> },
    Meta(MetaEvent),
}

/// Meta events the notation core cares about. Anything else is kept raw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "meta", rename_all = "snake_case")]
pub enum MetaEvent {
    Text { text: String },
    Lyric { text: String },
    Tempo { micros_per_quarter: u32 },
    TimeSignature { numerator: u8, denominator: u8 },
    KeySignature { sharps: i8, minor: bool },
    EndOfTrack,
    Other { kind: u8, data: Vec<u8> },
}

impl MidiEvent {
    pub fn new(start_time: u32, channel: u8, kind: EventKind) -> Self {
        Self { delta_time: 0, start_time, channel, kind }
    }

    pub fn note_on(start_time: u32, channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(start_time, channel, EventKind::NoteOn { note, velocity })
    }

    pub fn note_off(start_time: u32, channel: u8, note: u8) -> Self {
        Self::new(start_time, channel, EventKind::NoteOff { note, velocity: 0 })
    }

    pub fn lyric(start_time: u32, text: impl Into<String>) -> Self {
        Self::new(start_time, 0, EventKind::Meta(MetaEvent::Lyric { text: text.into() }))
    }

    pub fn end_of_track(start_time: u32) -> Self {
        Self::new(start_time, 0, EventKind::Meta(MetaEvent::EndOfTrack))
    }
}

/// A sounding note: one matched NoteOn/NoteOff pair.
///
/// Values are immutable; the transforms build new notes instead of editing
/// them in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MidiNote {
    start_time: u32,
    channel: u8,
    number: u8,
    duration: u32,
}

impl MidiNote {
    /// Create a note, rejecting note numbers above 127.
    pub fn new(start_time: u32, channel: u8, number: u8, duration: u32) -> Result<Self, SheetError> {
        if number > 127 {
            return Err(SheetError::InvalidNote(number as u32));
        }
        Ok(Self { start_time, channel, number, duration })
    }

    /// Pitch must already be known to be <= 127.
    pub(crate) fn from_parts(start_time: u32, channel: u8, number: u8, duration: u32) -> Self {
        debug_assert!(number <= 127);
        Self { start_time, channel, number, duration }
    }

    /// Start time in pulses
    pub fn start_time(&self) -> u32 {
        self.start_time
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// MIDI note number, middle C = 60
    pub fn number(&self) -> u8 {
        self.number
    }

    /// Duration in pulses
    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn end_time(&self) -> u32 {
        self.start_time.saturating_add(self.duration)
    }

    pub fn with_start_time(self, start_time: u32) -> Self {
        Self { start_time, ..self }
    }

    pub fn with_duration(self, duration: u32) -> Self {
        Self { duration, ..self }
    }

    /// Shift the pitch by `amount` semitones, clamped to 0..=127.
    pub fn transposed(self, amount: i32) -> Self {
        let number = (self.number as i32 + amount).clamp(0, 127) as u8;
        Self { number, ..self }
    }

    /// Shift the start by `amount` pulses, clamped at zero.
    pub fn shifted(self, amount: i32) -> Self {
        let start = (self.start_time as i64 + amount as i64).max(0) as u32;
        Self { start_time: start, ..self }
    }

    /// Order by start time, then by note number.
    pub fn cmp_by_time(a: &MidiNote, b: &MidiNote) -> Ordering {
        a.start_time
            .cmp(&b.start_time)
            .then(a.number.cmp(&b.number))
    }

    /// Order by note number, then by start time.
    pub fn cmp_by_number(a: &MidiNote, b: &MidiNote) -> Ordering {
        a.number
            .cmp(&b.number)
            .then(a.start_time.cmp(&b.start_time))
    }
}

/// A lyric syllable attached to a time in a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricEvent {
    pub start_time: u32,
    pub text: String,
}
