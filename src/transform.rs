//! Option-driven rewriting of tracks before layout.

use log::debug;

use crate::model::{LyricEvent, MidiNote};
use crate::options::MidiOptions;
use crate::sheet::time::TimeSignature;
use crate::track::MidiTrack;

/// Lowest note of the treble staff region used as the initial split high.
const SPLIT_HIGH: i32 = 76;
/// Highest note of the bass staff region used as the initial split low.
const SPLIT_LOW: i32 = 45;
const OCTAVE: i32 = 12;

/// Milliseconds to pulses at the time signature's tempo.
pub fn interval_pulses(millis: u32, time: &TimeSignature) -> u32 {
    let pulses = time.quarter() as u64 * millis as u64 * 1000 / time.tempo().max(1) as u64;
    pulses.min(u32::MAX as u64) as u32
}

/// Shift every note by `amount` semitones.
pub fn transpose(tracks: &mut [MidiTrack], amount: i32) {
    for track in tracks {
        let notes = track.notes().iter().map(|n| n.transposed(amount)).collect();
        track.replace_notes(notes);
    }
}

/// Move every note and lyric by `amount` pulses, clamping at zero.
pub fn shift_time(tracks: &mut [MidiTrack], amount: i32) {
    for track in tracks {
        let notes = track.notes().iter().map(|n| n.shifted(amount)).collect();
        track.replace_notes(notes);
        let lyrics = track
            .lyrics()
            .iter()
            .map(|l| LyricEvent {
                start_time: (l.start_time as i64 + amount as i64).max(0) as u32,
                text: l.text.clone(),
            })
            .collect();
        track.set_lyrics(lyrics);
    }
}

/// Snap start times that are within `interval` pulses of an earlier start,
/// across all tracks, so near-simultaneous notes form one chord.
pub fn round_start_times(tracks: &mut [MidiTrack], interval: u32) {
    let interval = interval as i64;
    let mut starts: Vec<i64> = tracks
        .iter()
        .flat_map(|t| t.notes().iter().map(|n| n.start_time() as i64))
        .collect();
    starts.sort_unstable();
    for i in 1..starts.len() {
        if starts[i] - starts[i - 1] <= interval {
            starts[i] = starts[i - 1];
        }
    }

    for track in tracks {
        let mut i = 0;
        let mut notes = Vec::with_capacity(track.notes().len());
        for &note in track.notes() {
            let start = note.start_time() as i64;
            while i + 1 < starts.len() && start - interval > starts[i] {
                i += 1;
            }
            match starts.get(i) {
                Some(&snap) if start > snap && start - snap <= interval => {
                    notes.push(note.with_start_time(snap as u32));
                }
                _ => notes.push(note),
            }
        }
        track.replace_notes(notes);
    }
}

/// Lengthen each note up to the next start time in its track, in steps of
/// a quarter, eighth, triplet or sixteenth. Notes forming an equal-length
/// pair with the previous note keep their duration.
pub fn round_durations(tracks: &mut [MidiTrack], quarter: u32) {
    for track in tracks {
        let mut notes = track.notes().to_vec();
        let mut prev: Option<(u32, u32)> = None;
        for i in 0..notes.len().saturating_sub(1) {
            let note = notes[i];
            let next_start = notes[i + 1..]
                .iter()
                .map(|n| n.start_time())
                .find(|&s| s > note.start_time())
                .unwrap_or(note.start_time());
            let max_duration = next_start - note.start_time();

            let mut duration = [quarter, quarter / 2, quarter / 3, quarter / 4]
                .into_iter()
                .find(|&d| d <= max_duration)
                .unwrap_or(0)
                .max(note.duration());

            let (prev_start, prev_duration) = prev.unwrap_or((note.start_time(), note.duration()));
            if prev_start.saturating_add(prev_duration) == note.start_time() && prev_duration == note.duration() {
                duration = note.duration();
            }
            notes[i] = note.with_duration(duration);

            if prev.is_none() || notes[i + 1].start_time() != note.start_time() {
                prev = Some((note.start_time(), duration));
            }
        }
        track.replace_notes(notes);
    }
}

/// Merge all tracks into one, dropping repeated (start, pitch) pairs and
/// keeping the longest duration.
pub fn combine_to_single_track(tracks: &[MidiTrack]) -> MidiTrack {
    let mut all: Vec<MidiNote> = tracks.iter().flat_map(|t| t.notes().iter().copied()).collect();
    all.sort_by(MidiNote::cmp_by_time);

    let mut notes: Vec<MidiNote> = Vec::with_capacity(all.len());
    for note in all {
        match notes.last_mut() {
            Some(prev) if prev.start_time() == note.start_time() && prev.number() == note.number() => {
                if note.duration() > prev.duration() {
                    *prev = prev.with_duration(note.duration());
                }
            }
            _ => notes.push(note),
        }
    }

    let mut track = MidiTrack::from_notes(0, notes);
    if let Some(first) = tracks.first() {
        track.set_instrument(first.instrument());
    }
    track
}

/// Highest and lowest pitch sounding between `start` and `end`, looking at
/// most one measure ahead. Seeds `high` and `low` with the note itself.
fn high_low_notes(notes: &[MidiNote], measure: u32, from: usize, start: u32, end: u32, seed: i32) -> (i32, i32) {
    let end = end.min(start.saturating_add(measure));
    let (mut high, mut low) = (seed, seed);
    for note in notes[from..].iter().take_while(|n| n.start_time() < end) {
        if note.end_time() < start || note.start_time().saturating_add(measure) < start {
            continue;
        }
        high = high.max(note.number() as i32);
        low = low.min(note.number() as i32);
    }
    (high, low)
}

/// Highest and lowest pitch starting exactly at `start`.
fn exact_high_low_notes(notes: &[MidiNote], from: usize, start: u32, seed: i32) -> (i32, i32) {
    let (mut high, mut low) = (seed, seed);
    for note in notes[from..]
        .iter()
        .skip_while(|n| n.start_time() < start)
        .take_while(|n| n.start_time() == start)
    {
        high = high.max(note.number() as i32);
        low = low.min(note.number() as i32);
    }
    (high, low)
}

/// Split one track into a top (treble) and bottom (bass) track by looking
/// at which neighbouring notes each note is closer to.
pub fn split_track(track: &MidiTrack, measure: u32) -> (MidiTrack, MidiTrack) {
    let notes = track.notes();
    let mut top = Vec::new();
    let mut bottom = Vec::new();
    let (mut prev_high, mut prev_low) = (SPLIT_HIGH, SPLIT_LOW);
    let mut from = 0;

    for &note in notes {
        let number = note.number() as i32;
        while notes[from].end_time() < note.start_time() {
            from += 1;
        }
        let (high, low) = high_low_notes(notes, measure, from, note.start_time(), note.end_time(), number);
        let (high_exact, low_exact) = exact_high_low_notes(notes, from, note.start_time(), number);

        let (upper, lower) = if high_exact - number > OCTAVE || number - low_exact > OCTAVE {
            (high_exact, low_exact)
        } else if high - number > OCTAVE || number - low > OCTAVE {
            (high, low)
        } else if high_exact - low_exact > OCTAVE {
            (high_exact, low_exact)
        } else if high - low > OCTAVE {
            (high, low)
        } else {
            (prev_high, prev_low)
        };
        if upper - number <= number - lower {
            top.push(note);
        } else {
            bottom.push(note);
        }

        if high - low > OCTAVE {
            prev_high = high;
            prev_low = low;
        }
    }

    let mut top = MidiTrack::from_notes(0, top);
    let mut bottom = MidiTrack::from_notes(1, bottom);
    top.set_instrument(track.instrument());
    bottom.set_instrument(track.instrument());
    (top, bottom)
}

/// Merge the tracks and split the result into a treble and a bass track.
/// All lyrics go to the top track.
pub fn combine_to_two_tracks(tracks: &[MidiTrack], measure: u32) -> Vec<MidiTrack> {
    let single = combine_to_single_track(tracks);
    let (mut top, bottom) = split_track(&single, measure);

    let mut lyrics: Vec<LyricEvent> = tracks.iter().flat_map(|t| t.lyrics().iter().cloned()).collect();
    lyrics.sort_by_key(|l| l.start_time);
    top.set_lyrics(lyrics);

    debug!(
        "two-staff split: {} treble notes, {} bass notes",
        top.notes().len(),
        bottom.notes().len()
    );
    vec![top, bottom]
}

/// Apply every option that rewrites notes, in order: track selection,
/// start-time rounding, duration rounding, two-staff mode, time shift,
/// transposition.
pub fn apply_options(tracks: &[MidiTrack], options: &MidiOptions, time: &TimeSignature) -> Vec<MidiTrack> {
    let mut tracks: Vec<MidiTrack> = tracks
        .iter()
        .enumerate()
        .filter(|(i, _)| options.shows_track(*i))
        .map(|(_, t)| t.clone())
        .collect();

    round_start_times(&mut tracks, interval_pulses(options.combine_interval, time));
    round_durations(&mut tracks, time.quarter());
    if options.two_staffs {
        tracks = combine_to_two_tracks(&tracks, time.measure());
    }
    if options.shift_time != 0 {
        shift_time(&mut tracks, options.shift_time);
    }
    if options.transpose != 0 {
        transpose(&mut tracks, options.transpose);
    }
    tracks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn note(start: u32, number: u8, duration: u32) -> MidiNote {
        MidiNote::new(start, 0, number, duration).unwrap()
    }

    fn starts(track: &MidiTrack) -> Vec<u32> {
        track.notes().iter().map(|n| n.start_time()).collect()
    }

    #[test]
    fn interval_converts_millis_to_pulses() {
        let time = TimeSignature::common(480).unwrap();
        // 500ms per quarter at the default tempo
        assert_eq!(interval_pulses(40, &time), 38);
        assert_eq!(interval_pulses(500, &time), 480);
    }

    #[test]
    fn near_starts_snap_together() {
        let mut tracks = vec![
            MidiTrack::from_notes(0, vec![note(0, 60, 480), note(10, 64, 480), note(480, 67, 480)]),
            MidiTrack::from_notes(1, vec![note(15, 48, 480)]),
        ];
        round_start_times(&mut tracks, 20);
        assert_eq!(starts(&tracks[0]), vec![0, 0, 480]);
        assert_eq!(starts(&tracks[1]), vec![0]);
    }

    #[test]
    fn durations_extend_to_next_start() {
        let mut tracks = vec![MidiTrack::from_notes(
            0,
            vec![note(0, 60, 100), note(480, 62, 100), note(720, 64, 100)],
        )];
        round_durations(&mut tracks, 480);
        let durations: Vec<u32> = tracks[0].notes().iter().map(|n| n.duration()).collect();
        assert_eq!(durations, vec![480, 240, 100]);
    }

    #[test]
    fn combine_keeps_longest_duplicate() {
        let tracks = vec![
            MidiTrack::from_notes(0, vec![note(0, 60, 240)]),
            MidiTrack::from_notes(1, vec![note(0, 60, 480), note(0, 48, 480)]),
        ];
        let single = combine_to_single_track(&tracks);
        let shape: Vec<_> = single.notes().iter().map(|n| (n.number(), n.duration())).collect();
        assert_eq!(shape, vec![(48, 480), (60, 480)]);
    }

    #[test]
    fn wide_chords_split_by_register() {
        let track = MidiTrack::from_notes(
            0,
            vec![note(0, 36, 480), note(0, 72, 480), note(480, 40, 480), note(480, 76, 480)],
        );
        let (top, bottom) = split_track(&track, 1920);
        let pitches = |t: &MidiTrack| t.notes().iter().map(|n| n.number()).collect::<Vec<_>>();
        assert_eq!(pitches(&top), vec![72, 76]);
        assert_eq!(pitches(&bottom), vec![36, 40]);
    }

    #[test]
    fn shift_and_transpose_clamp() {
        let mut tracks = vec![MidiTrack::from_notes(0, vec![note(100, 120, 10)])];
        shift_time(&mut tracks, -500);
        transpose(&mut tracks, 20);
        assert_eq!(tracks[0].notes()[0].start_time(), 0);
        assert_eq!(tracks[0].notes()[0].number(), 127);
    }
}
