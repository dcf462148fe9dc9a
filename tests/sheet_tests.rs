//! Integration tests for the layout pipeline: chords, stems, beams and staffs.

use midisheet::sheet::chord::{group_notes, stem_direction, ChordSymbol};
use midisheet::sheet::clef::ClefMeasures;
use midisheet::sheet::staff::Staff;
use midisheet::sheet::stem::StemDirection;
use midisheet::sheet::symbols::{MusicSymbol, Symbol};
use midisheet::sheet::white_note::Letter;
use midisheet::{
    Clef, KeySignature, MidiEvent, MidiNote, MidiOptions, SheetMusic, TimeSignature, WhiteNote,
};
use pretty_assertions::assert_eq;

/// Events for (start, pitch, duration) notes, releases ordered before
/// attacks at the same time.
fn events(notes: &[(u32, u8, u32)]) -> Vec<MidiEvent> {
    let mut timed: Vec<(u32, bool, MidiEvent)> = Vec::new();
    for &(start, pitch, duration) in notes {
        timed.push((start, true, MidiEvent::note_on(start, 0, pitch, 90)));
        timed.push((start + duration, false, MidiEvent::note_off(start + duration, 0, pitch)));
    }
    timed.sort_by_key(|(t, on, _)| (*t, *on));
    timed.into_iter().map(|(_, _, e)| e).collect()
}

fn time() -> TimeSignature {
    TimeSignature::common(480).unwrap()
}

fn sheet(notes: &[(u32, u8, u32)], options: &MidiOptions) -> SheetMusic {
    SheetMusic::from_events(&[events(notes)], time(), options)
}

fn chords(staff: &Staff) -> Vec<&ChordSymbol> {
    staff.symbols().iter().filter_map(Symbol::as_chord).collect()
}

// ═══════════════════════════════════════════════════════════════════════
// Chords and stems
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn two_note_chord_in_c_major() {
    let sheet = sheet(&[(0, 60, 480), (0, 64, 480)], &MidiOptions::default());
    assert_eq!(sheet.key(), &KeySignature::default());
    assert_eq!(sheet.staffs().len(), 1);

    let staff = &sheet.staffs()[0];
    let chords = chords(staff);
    assert_eq!(chords.len(), 1);
    let chord = chords[0];
    let pitches: Vec<u8> = chord.notes().iter().map(|n| n.number).collect();
    assert_eq!(pitches, vec![60, 64]);
    assert_eq!(chord.clef(), Clef::Treble);
    assert!(chord.accid_symbols().is_empty());
    assert!(!chord.has_two_stems());
    assert_eq!(chord.stems().count(), 1);
    assert_eq!(chord.end_time(), 480);
    assert_eq!(chord.stem().map(|s| s.direction()), Some(StemDirection::Up));

    // the rest of the measure is a half rest and a quarter rest
    let rests = staff.symbols().iter().filter(|s| matches!(s, Symbol::Rest(_))).count();
    assert_eq!(rests, 2);
}

#[test]
fn grouping_is_idempotent() {
    let notes = vec![
        MidiNote::new(0, 0, 60, 100).unwrap(),
        MidiNote::new(10, 0, 64, 100).unwrap(),
        MidiNote::new(500, 0, 67, 100).unwrap(),
    ];
    let clefs = ClefMeasures::new(&notes, 1920);
    let once = group_notes(&notes, &clefs, 20);
    assert_eq!(once.len(), 2);

    let flat: Vec<MidiNote> = once.iter().flatten().copied().collect();
    let twice = group_notes(&flat, &clefs, 20);
    assert_eq!(once, twice);
}

#[test]
fn stem_direction_depends_only_on_notes() {
    let e4 = WhiteNote::new(Letter::E, 4);
    let g4 = WhiteNote::new(Letter::G, 4);
    let c6 = WhiteNote::new(Letter::C, 6);
    let e6 = WhiteNote::new(Letter::E, 6);
    for _ in 0..2 {
        assert_eq!(stem_direction(e4, g4, Clef::Treble), StemDirection::Up);
        assert_eq!(stem_direction(c6, e6, Clef::Treble), StemDirection::Down);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Beams
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn four_eighths_share_one_beam() {
    let sheet = sheet(
        &[(0, 60, 240), (240, 62, 240), (480, 64, 240), (720, 65, 240)],
        &MidiOptions::default(),
    );
    let chords = chords(&sheet.staffs()[0]);
    assert_eq!(chords.len(), 4);

    let first = chords[0].stem().and_then(|s| s.beam()).map(|b| b.span);
    assert_eq!(first, Some(4));
    for chord in &chords[1..] {
        assert!(chord.stem().map_or(false, |s| s.is_receiver()));
    }
    let directions: Vec<_> = chords.iter().filter_map(|c| c.stem()).map(|s| s.direction()).collect();
    assert!(directions.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn beams_never_cross_a_bar() {
    let sheet = sheet(&[(1680, 60, 240), (1920, 62, 240)], &MidiOptions::default());
    for staff in sheet.staffs() {
        for chord in chords(staff) {
            assert!(!chord.stem().map_or(false, |s| s.is_beam()));
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Staffs
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn staffs_fill_the_page_exactly() {
    let notes: Vec<(u32, u8, u32)> = (0..32u32).map(|i| (i * 480, 60 + (i % 12) as u8, 480)).collect();
    let sheet = sheet(&notes, &MidiOptions::default());
    assert!(!sheet.staffs().is_empty());
    for staff in sheet.staffs() {
        assert_eq!(staff.width(), sheet.config().page_width);
        assert_eq!(staff.content_width(), sheet.config().page_width);
        assert!(staff.start_time() <= staff.end_time());
    }
    for pair in sheet.staffs().windows(2) {
        assert_eq!(pair[0].end_time(), pair[1].start_time());
    }
}

#[test]
fn horizontal_scroll_uses_natural_width() {
    let options = MidiOptions { scroll_vert: false, ..MidiOptions::default() };
    let sheet = sheet(&[(0, 60, 480), (480, 62, 480)], &options);
    assert_eq!(sheet.staffs().len(), 1);
    let staff = &sheet.staffs()[0];
    assert_eq!(staff.width(), staff.content_width());
}

#[test]
fn empty_track_still_has_a_staff() {
    let sheet = SheetMusic::from_events(&[Vec::new()], time(), &MidiOptions::default());
    assert_eq!(sheet.staffs().len(), 1);
    let symbols = sheet.staffs()[0].symbols();
    assert!(matches!(symbols[0], Symbol::TimeSig(_)));
    assert!(symbols[1].is_bar());
    assert!(sheet.height() >= sheet.config().note_height * 5);
}

#[test]
fn two_staff_option_splits_by_register() {
    let options = MidiOptions { two_staffs: true, ..MidiOptions::default() };
    let sheet = sheet(&[(0, 36, 480), (0, 72, 480)], &options);
    assert_eq!(sheet.track_count(), 2);
    let clefs: Vec<Clef> = sheet.staffs().iter().map(Staff::clef).collect();
    assert_eq!(clefs, vec![Clef::Treble, Clef::Bass]);
}

#[test]
fn explicit_key_and_transpose_apply() {
    let options = MidiOptions {
        key: Some(KeySignature::new(2, 0).unwrap()),
        transpose: 2,
        ..MidiOptions::default()
    };
    let sheet = sheet(&[(0, 60, 480)], &options);
    assert_eq!(sheet.key().sharps(), 2);
    let pitches: Vec<u8> = chords(&sheet.staffs()[0])
        .iter()
        .flat_map(|c| c.notes().iter().map(|n| n.number))
        .collect();
    assert_eq!(pitches, vec![62]);
}

#[test]
fn lyrics_sit_under_their_symbols() {
    let mut track = events(&[(0, 60, 480), (480, 62, 480)]);
    track.insert(0, MidiEvent::lyric(0, "la"));
    let sheet = SheetMusic::from_events(&[track.clone()], time(), &MidiOptions::default());
    let lyrics = sheet.staffs()[0].lyrics();
    assert_eq!(lyrics.len(), 1);
    assert_eq!(lyrics[0].text, "la");
    assert_eq!(lyrics[0].x, 0);

    let hidden = MidiOptions { show_lyrics: false, ..MidiOptions::default() };
    let sheet = SheetMusic::from_events(&[track], time(), &hidden);
    assert!(sheet.staffs()[0].lyrics().is_empty());
}

#[test]
fn lyric_at_a_staff_break_is_drawn_once() {
    let notes: Vec<(u32, u8, u32)> = (0..64u32).map(|i| (i * 480, 60, 480)).collect();
    let mut track = events(&notes);
    track.extend((0..64u32).map(|i| MidiEvent::lyric(i * 480, "la")));
    track.sort_by_key(|e| e.start_time);
    let sheet = SheetMusic::from_events(&[track], time(), &MidiOptions::default());
    assert!(sheet.staffs().len() > 1);

    let mut starts: Vec<u32> = sheet
        .staffs()
        .iter()
        .flat_map(|staff| staff.lyrics().iter().map(|l| l.start_time))
        .collect();
    starts.sort_unstable();
    let expected: Vec<u32> = (0..64u32).map(|i| i * 480).collect();
    assert_eq!(starts, expected);

    // the second staff owns the lyric at its own start
    let second = &sheet.staffs()[1];
    assert_eq!(second.lyrics().first().map(|l| l.start_time), Some(second.start_time()));
}

#[test]
fn shading_finds_the_sounding_chord() {
    let sheet = sheet(&[(0, 60, 480)], &MidiOptions::default());
    let shades = sheet.shade_notes(0, None);
    assert_eq!(shades.len(), 1);
    let spans: Vec<u32> = shades[0].result.shade.iter().map(|s| s.start_time).collect();
    assert_eq!(spans, vec![0]);

    let staff = &sheet.staffs()[0];
    let chord_x: i32 = staff.keysig_width()
        + staff
            .symbols()
            .iter()
            .take_while(|s| s.as_chord().is_none())
            .map(|s| s.width())
            .sum::<i32>();
    assert_eq!(shades[0].result.x_shade, Some(chord_x));
}

#[test]
fn bass_staff_shades_with_second_color() {
    let options = MidiOptions {
        two_staffs: true,
        shade_color: Some("#ffcc00".to_string()),
        ..MidiOptions::default()
    };
    let sheet = sheet(&[(0, 36, 480), (0, 72, 480)], &options);
    let colors: Vec<(usize, String)> = sheet
        .shade_notes(0, None)
        .into_iter()
        .map(|s| (sheet.staffs()[s.staff].track(), s.color))
        .collect();
    assert_eq!(
        colors,
        vec![(0, "#ffcc00".to_string()), (1, "#50d250".to_string())]
    );
}
