//! Integration tests for the track builder and the option transforms.

use midisheet::transform::{apply_options, combine_to_two_tracks};
use midisheet::{EventKind, MidiEvent, MidiOptions, MidiTrack, TimeSignature, TrackBuilder};
use pretty_assertions::assert_eq;

fn shape(track: &MidiTrack) -> Vec<(u32, u8, u32)> {
    track
        .notes()
        .iter()
        .map(|n| (n.start_time(), n.number(), n.duration()))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Track builder
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn builder_pairs_drops_and_clamps() {
    let events = vec![
        MidiEvent::note_off(0, 0, 50),
        MidiEvent::note_on(0, 0, 60, 90),
        MidiEvent::note_on(480, 0, 60, 0),
        MidiEvent::note_on(480, 0, 64, 80),
        MidiEvent::end_of_track(960),
    ];
    let track = MidiTrack::from_events(&events, 0);

    // orphan NoteOff ignored, velocity 0 closes, unclosed runs to track end
    assert_eq!(shape(&track), vec![(0, 60, 480), (480, 64, 480)]);
}

#[test]
fn builder_keeps_instrument_and_lyrics() {
    let events = vec![
        MidiEvent::new(0, 0, EventKind::ProgramChange { instrument: 40 }),
        MidiEvent::lyric(0, "Hel"),
        MidiEvent::note_on(0, 0, 67, 90),
        MidiEvent::lyric(240, "lo"),
        MidiEvent::note_off(240, 0, 67),
    ];
    let track = TrackBuilder::new().build(&events, 3);
    assert_eq!(track.number(), 3);
    assert_eq!(track.instrument_name(), "Violin");
    let lyrics: Vec<&str> = track.lyrics().iter().map(|l| l.text.as_str()).collect();
    assert_eq!(lyrics, vec!["Hel", "lo"]);
}

#[test]
fn channel_ten_is_percussion() {
    let events = vec![MidiEvent::note_on(0, 9, 36, 100), MidiEvent::note_off(120, 9, 36)];
    let track = MidiTrack::from_events(&events, 0);
    assert_eq!(track.instrument_name(), "Percussion");
}

#[test]
fn overlapping_restrike_needs_opt_in() {
    let events = vec![
        MidiEvent::note_on(0, 0, 60, 90),
        MidiEvent::note_on(100, 0, 60, 90),
        MidiEvent::note_off(200, 0, 60),
        MidiEvent::note_off(300, 0, 60),
    ];
    let strict = TrackBuilder::new().build(&events, 0);
    assert_eq!(shape(&strict), vec![(0, 60, 200)]);

    let overlapping = TrackBuilder::new().allow_overlapping(true).build(&events, 0);
    assert_eq!(shape(&overlapping), vec![(0, 60, 200), (100, 60, 200)]);
}

// ═══════════════════════════════════════════════════════════════════════
// Transforms
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn options_filter_tracks_and_transpose() {
    let time = TimeSignature::common(480).unwrap();
    let tracks = vec![
        MidiTrack::from_events(&[MidiEvent::note_on(0, 0, 60, 90), MidiEvent::note_off(480, 0, 60)], 0),
        MidiTrack::from_events(&[MidiEvent::note_on(0, 1, 40, 90), MidiEvent::note_off(480, 1, 40)], 1),
    ];
    let options = MidiOptions {
        tracks: vec![false, true],
        transpose: 12,
        ..MidiOptions::default()
    };
    let result = apply_options(&tracks, &options, &time);
    assert_eq!(result.len(), 1);
    assert_eq!(shape(&result[0]), vec![(0, 52, 480)]);
}

#[test]
fn two_staff_mode_moves_lyrics_to_top() {
    let low = MidiTrack::from_events(
        &[
            MidiEvent::lyric(0, "la"),
            MidiEvent::note_on(0, 0, 36, 90),
            MidiEvent::note_off(480, 0, 36),
        ],
        0,
    );
    let high = MidiTrack::from_events(&[MidiEvent::note_on(0, 0, 72, 90), MidiEvent::note_off(480, 0, 72)], 1);
    let tracks = combine_to_two_tracks(&[low, high], 1920);
    assert_eq!(tracks.len(), 2);
    assert_eq!(shape(&tracks[0]), vec![(0, 72, 480)]);
    assert_eq!(shape(&tracks[1]), vec![(0, 36, 480)]);
    assert_eq!(tracks[0].lyrics().len(), 1);
    assert!(tracks[1].lyrics().is_empty());
}
