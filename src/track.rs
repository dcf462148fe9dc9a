//! Track builder: turns the time-ordered events of one track into notes.
//!
//! A NoteOn opens a pending note keyed by (channel, pitch). A NoteOff, or a
//! NoteOn with velocity 0, closes the earliest still-open note of that key.
//! Notes still open when the events run out are closed at the track end.

use std::collections::{HashMap, VecDeque};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::model::{EventKind, LyricEvent, MetaEvent, MidiEvent, MidiNote};

/// Channel reserved for percussion in General MIDI (0-based).
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Instrument number used for percussion tracks.
pub const PERCUSSION_INSTRUMENT: u8 = 128;

/// The notes, instrument and lyrics of one MIDI track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiTrack {
    number: usize,
    notes: Vec<MidiNote>,
    instrument: u8,
    lyrics: Vec<LyricEvent>,
}

impl MidiTrack {
    /// An empty track.
    pub fn new(number: usize) -> Self {
        Self {
            number,
            notes: Vec::new(),
            instrument: 0,
            lyrics: Vec::new(),
        }
    }

    /// Build a track from its events using the default builder.
    pub fn from_events(events: &[MidiEvent], number: usize) -> Self {
        TrackBuilder::new().build(events, number)
    }

    /// Wrap an already-built note list, sorting it by time.
    pub fn from_notes(number: usize, mut notes: Vec<MidiNote>) -> Self {
        notes.sort_by(MidiNote::cmp_by_time);
        Self { number, notes, instrument: 0, lyrics: Vec::new() }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    /// Notes ordered by start time, then pitch.
    pub fn notes(&self) -> &[MidiNote] {
        &self.notes
    }

    pub fn instrument(&self) -> u8 {
        self.instrument
    }

    pub fn set_instrument(&mut self, instrument: u8) {
        self.instrument = instrument;
    }

    pub fn instrument_name(&self) -> &'static str {
        instrument_name(self.instrument)
    }

    pub fn lyrics(&self) -> &[LyricEvent] {
        &self.lyrics
    }

    pub fn set_lyrics(&mut self, lyrics: Vec<LyricEvent>) {
        self.lyrics = lyrics;
    }

    /// Append a note, keeping the list ordered by time.
    pub fn add_note(&mut self, note: MidiNote) {
        let pos = self
            .notes
            .partition_point(|n| MidiNote::cmp_by_time(n, &note).is_le());
        self.notes.insert(pos, note);
    }

    /// Replace the note list (used by the transforms).
    pub(crate) fn replace_notes(&mut self, mut notes: Vec<MidiNote>) {
        notes.sort_by(MidiNote::cmp_by_time);
        self.notes = notes;
    }

    /// Time of the last note end, or 0 for an empty track.
    pub fn end_time(&self) -> u32 {
        self.notes.iter().map(|n| n.end_time()).max().unwrap_or(0)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
struct OpenNote {
    start_time: u32,
    channel: u8,
    number: u8,
}

impl OpenNote {
    /// Close the note at `end`; a NoteOff earlier than its NoteOn yields zero duration.
    fn close(self, end: u32) -> MidiNote {
        MidiNote::from_parts(
            self.start_time,
            self.channel,
            self.number,
            end.saturating_sub(self.start_time),
        )
    }
}

/// Configurable note-on/note-off pairing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackBuilder {
    allow_overlapping: bool,
}

impl TrackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow a pitch to be re-struck before its first release. When off
    /// (the default) a second NoteOn for a sounding (channel, pitch) is ignored.
    pub fn allow_overlapping(mut self, allow: bool) -> Self {
        self.allow_overlapping = allow;
        self
    }

    pub fn build(&self, events: &[MidiEvent], number: usize) -> MidiTrack {
        let mut track = MidiTrack::new(number);
        let mut pending: HashMap<(u8, u8), VecDeque<OpenNote>> = HashMap::new();
        let mut notes: Vec<MidiNote> = Vec::new();
        let mut track_end = 0u32;

        for event in events {
            track_end = track_end.max(event.start_time);
            match &event.kind {
                EventKind::NoteOn { note, velocity } if *velocity > 0 => {
                    if *note > 127 {
                        warn!("track {}: ignoring NoteOn with pitch {}", number, note);
                        continue;
                    }
                    let queue = pending.entry((event.channel, *note)).or_default();
                    if !queue.is_empty() && !self.allow_overlapping {
                        debug!(
                            "track {}: ignoring duplicate NoteOn ch={} pitch={} at {}",
                            number, event.channel, note, event.start_time
                        );
                        continue;
                    }
                    queue.push_back(OpenNote {
                        start_time: event.start_time,
                        channel: event.channel,
                        number: *note,
                    });
                }
                EventKind::NoteOn { note, .. } | EventKind::NoteOff { note, .. } => {
                    let open = pending
                        .get_mut(&(event.channel, *note))
                        .and_then(|q| q.pop_front());
                    match open {
                        Some(open) => notes.push(open.close(event.start_time)),
                        None => warn!(
                            "track {}: dropping NoteOff without NoteOn ch={} pitch={} at {}",
                            number, event.channel, note, event.start_time
                        ),
                    }
                }
                EventKind::ProgramChange { instrument } => {
                    track.instrument = *instrument;
                }
                EventKind::Meta(MetaEvent::Lyric { text }) => {
                    track.lyrics.push(LyricEvent {
                        start_time: event.start_time,
                        text: text.clone(),
                    });
                }
                _ => {}
            }
        }

        for open in pending.into_values().flatten() {
            debug!(
                "track {}: closing unterminated note pitch={} at track end {}",
                number, open.number, track_end
            );
            notes.push(open.close(track_end));
        }

        notes.sort_by(MidiNote::cmp_by_time);
        if notes.first().map_or(false, |n| n.channel() == PERCUSSION_CHANNEL) {
            track.instrument = PERCUSSION_INSTRUMENT;
        }
        track.notes = notes;
        track
    }
}

// ═══════════════════════════════════════════════════════════════════════
// General MIDI instrument names
// ═══════════════════════════════════════════════════════════════════════

const INSTRUMENT_NAMES: [&str; 129] = [
    "Acoustic Grand Piano", "Bright Acoustic Piano", "Electric Grand Piano", "Honky-tonk Piano",
    "Electric Piano 1", "Electric Piano 2", "Harpsichord", "Clavi",
    "Celesta", "Glockenspiel", "Music Box", "Vibraphone",
    "Marimba", "Xylophone", "Tubular Bells", "Dulcimer",
    "Drawbar Organ", "Percussive Organ", "Rock Organ", "Church Organ",
    "Reed Organ", "Accordion", "Harmonica", "Tango Accordion",
    "Acoustic Guitar (nylon)", "Acoustic Guitar (steel)", "Electric Guitar (jazz)", "Electric Guitar (clean)",
    "Electric Guitar (muted)", "Overdriven Guitar", "Distortion Guitar", "Guitar harmonics",
    "Acoustic Bass", "Electric Bass (finger)", "Electric Bass (pick)", "Fretless Bass",
    "Slap Bass 1", "Slap Bass 2", "Synth Bass 1", "Synth Bass 2",
    "Violin", "Viola", "Cello", "Contrabass",
    "Tremolo Strings", "Pizzicato Strings", "Orchestral Harp", "Timpani",
    "String Ensemble 1", "String Ensemble 2", "SynthStrings 1", "SynthStrings 2",
    "Choir Aahs", "Voice Oohs", "Synth Voice", "Orchestra Hit",
    "Trumpet", "Trombone", "Tuba", "Muted Trumpet",
    "French Horn", "Brass Section", "SynthBrass 1", "SynthBrass 2",
    "Soprano Sax", "Alto Sax", "Tenor Sax", "Baritone Sax",
    "Oboe", "English Horn", "Bassoon", "Clarinet",
    "Piccolo", "Flute", "Recorder", "Pan Flute",
    "Blown Bottle", "Shakuhachi", "Whistle", "Ocarina",
    "Lead 1 (square)", "Lead 2 (sawtooth)", "Lead 3 (calliope)", "Lead 4 (chiff)",
    "Lead 5 (charang)", "Lead 6 (voice)", "Lead 7 (fifths)", "Lead 8 (bass + lead)",
    "Pad 1 (new age)", "Pad 2 (warm)", "Pad 3 (polysynth)", "Pad 4 (choir)",
    "Pad 5 (bowed)", "Pad 6 (metallic)", "Pad 7 (halo)", "Pad 8 (sweep)",
    "FX 1 (rain)", "FX 2 (soundtrack)", "FX 3 (crystal)", "FX 4 (atmosphere)",
    "FX 5 (brightness)", "FX 6 (goblins)", "FX 7 (echoes)", "FX 8 (sci-fi)",
    "Sitar", "Banjo", "Shamisen", "Koto",
    "Kalimba", "Bag pipe", "Fiddle", "Shanai",
    "Tinkle Bell", "Agogo", "Steel Drums", "Woodblock",
    "Taiko Drum", "Melodic Tom", "Synth Drum", "Reverse Cymbal",
    "Guitar Fret Noise", "Breath Noise", "Seashore", "Bird Tweet",
    "Telephone Ring", "Helicopter", "Applause", "Gunshot",
    "Percussion",
];

/// General MIDI name for an instrument number (128 = percussion).
pub fn instrument_name(instrument: u8) -> &'static str {
    INSTRUMENT_NAMES
        .get(instrument as usize)
        .copied()
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_velocity_note_on_closes_note() {
        let events = vec![
            MidiEvent::note_on(0, 0, 60, 90),
            MidiEvent::note_on(240, 0, 60, 0),
        ];
        let track = MidiTrack::from_events(&events, 0);
        assert_eq!(track.notes().len(), 1);
        assert_eq!(track.notes()[0].duration(), 240);
    }

    #[test]
    fn overlapping_same_pitch_closes_fifo() {
        let events = vec![
            MidiEvent::note_on(0, 0, 60, 90),
            MidiEvent::note_on(100, 0, 60, 90),
            MidiEvent::note_off(200, 0, 60),
            MidiEvent::note_off(400, 0, 60),
        ];
        let track = TrackBuilder::new().allow_overlapping(true).build(&events, 0);
        let durations: Vec<u32> = track.notes().iter().map(|n| n.duration()).collect();
        assert_eq!(durations, vec![200, 300]);
    }

    #[test]
    fn duplicate_note_on_is_ignored_by_default() {
        let events = vec![
            MidiEvent::note_on(0, 0, 60, 90),
            MidiEvent::note_on(100, 0, 60, 90),
            MidiEvent::note_off(200, 0, 60),
            MidiEvent::note_off(400, 0, 60),
        ];
        let track = MidiTrack::from_events(&events, 0);
        assert_eq!(track.notes().len(), 1);
        assert_eq!(track.notes()[0].duration(), 200);
    }

    #[test]
    fn percussion_channel_sets_instrument() {
        let events = vec![
            MidiEvent::note_on(0, PERCUSSION_CHANNEL, 38, 90),
            MidiEvent::note_off(120, PERCUSSION_CHANNEL, 38),
        ];
        let track = MidiTrack::from_events(&events, 0);
        assert_eq!(track.instrument(), PERCUSSION_INSTRUMENT);
        assert_eq!(track.instrument_name(), "Percussion");
    }
}
