//! Beaming: joining runs of consecutive short chords with a shared beam.
//!
//! Runs are searched in decreasing preference: six eighths (only in 3/4,
//! 6/8 and 6/4), three (triplets, or eighths in 12/8), four, two starting
//! on a beat, and finally any two. A chord joins at most one beam.

use log::debug;

use super::chord::{notes_overlap, stem_direction, ChordSymbol};
use super::stem::{Stem, StemDirection};
use super::symbols::{MusicSymbol, Symbol};
use super::time::{NoteDuration, TimeSignature};

/// Stems further apart than this (in staff steps) are not beamed.
const MAX_BEAM_DISTANCE: i32 = 11;

/// Whether `chords` (consecutive, in time order) can share a beam.
///
/// `on_beat` requires a two-chord run to start on a quarter-note boundary.
pub fn can_create_beams(chords: &[&ChordSymbol], time: &TimeSignature, on_beat: bool) -> bool {
    let (Some(first), Some(last)) = (chords.first(), chords.last()) else {
        return false;
    };
    let (Some(first_stem), Some(last_stem)) = (first.stem(), last.stem()) else {
        return false;
    };

    let measure = time.measure_of(first.start_time());
    let dur = first_stem.duration();
    let dotted8_to_16 = chords.len() == 2
        && dur == NoteDuration::DottedEighth
        && last_stem.duration() == NoteDuration::Sixteenth;

    if dur >= NoteDuration::Quarter || (dur == NoteDuration::DottedEighth && !dotted8_to_16) {
        return false;
    }

    let quarter = time.quarter();
    let off_beat = |beat: u32| beat > 0 && first.start_time() % beat > quarter / 6;
    let sig = (time.numerator(), time.denominator());

    match chords.len() {
        6 => {
            if dur != NoteDuration::Eighth || !matches!(sig, (3, 4) | (6, 8) | (6, 4)) {
                return false;
            }
            // in 6/4 the run starts on the first or fourth beat
            if sig == (6, 4) && off_beat(quarter * 3) {
                return false;
            }
        }
        4 => {
            if sig == (3, 8) {
                return false;
            }
            if !matches!(time.numerator(), 2 | 4 | 8) && dur != NoteDuration::Sixteenth {
                return false;
            }
            let beat = match dur {
                NoteDuration::Eighth => quarter * 2,
                NoteDuration::ThirtySecond => quarter / 2,
                _ => quarter,
            };
            if off_beat(beat) {
                return false;
            }
        }
        3 => {
            let twelve_eight = sig == (12, 8);
            if dur != NoteDuration::Triplet && !(dur == NoteDuration::Eighth && twelve_eight) {
                return false;
            }
            let beat = if twelve_eight { quarter / 2 * 3 } else { quarter };
            if off_beat(beat) {
                return false;
            }
        }
        2 => {
            if on_beat && off_beat(quarter) {
                return false;
            }
        }
        _ => {}
    }

    let next_bar = measure.saturating_add(1).saturating_mul(time.measure());
    for chord in chords {
        if time.measure_of(chord.start_time()) != measure {
            return false;
        }
        // a note still sounding at the next bar line
        if notes_overlap(chord.notes(), next_bar, next_bar.saturating_add(1)) {
            return false;
        }
        let Some(stem) = chord.stem() else {
            return false;
        };
        if stem.duration() != dur && !dotted8_to_16 {
            return false;
        }
        if stem.is_beam() {
            return false;
        }
    }

    // two-stem chords fix the direction; they must all agree
    let mut forced: Option<StemDirection> = None;
    for chord in chords.iter().filter(|c| c.has_two_stems()) {
        let Some(stem) = chord.stem() else { continue };
        match forced {
            Some(direction) if direction != stem.direction() => return false,
            _ => forced = Some(stem.direction()),
        }
    }
    let direction = forced.unwrap_or_else(|| beam_direction(chords));

    let distance = match direction {
        StemDirection::Up => first_stem.top().dist(&last_stem.top()),
        StemDirection::Down => first_stem.bottom().dist(&last_stem.bottom()),
    };
    distance.abs() < MAX_BEAM_DISTANCE
}

/// Common direction from the outer notes of the first and last stems.
fn beam_direction(chords: &[&ChordSymbol]) -> StemDirection {
    let (Some(first), Some(last)) = (chords.first(), chords.last()) else {
        return StemDirection::Up;
    };
    let (Some(first_stem), Some(last_stem)) = (first.stem(), last.stem()) else {
        return StemDirection::Up;
    };
    let outer = |stem: &Stem| match stem.direction() {
        StemDirection::Up => stem.top(),
        StemDirection::Down => stem.bottom(),
    };
    stem_direction(outer(first_stem), outer(last_stem), first.clef())
}

/// Join `chords` with one beam. `spacing` is the horizontal distance in
/// pixels from the first stem to the last.
///
/// Only stem geometry changes; callers check `can_create_beams` first.
pub fn create_beam(chords: &mut [&mut ChordSymbol], spacing: i32) {
    if chords.len() < 2 {
        return;
    }
    let direction = chords
        .iter()
        .find(|c| c.has_two_stems())
        .and_then(|c| c.stem())
        .map(|s| s.direction())
        .unwrap_or_else(|| {
            let shared: Vec<&ChordSymbol> = chords.iter().map(|c| &**c).collect();
            beam_direction(&shared)
        });

    for chord in chords.iter_mut() {
        if let Some(stem) = chord.stem_mut() {
            stem.set_direction(direction);
        }
    }

    if chords.len() == 2 {
        bring_stems_closer(chords);
    } else {
        line_up_stem_ends(chords);
    }

    let span = chords.len();
    let Some(last_stem) = chords.last().and_then(|c| c.stem()).cloned() else {
        return;
    };
    if let Some(first_stem) = chords[0].stem_mut() {
        first_stem.set_pair(&last_stem, spacing, span);
    }
    for chord in chords.iter_mut().skip(1) {
        if let Some(stem) = chord.stem_mut() {
            stem.set_receiver(true);
        }
    }
}

/// For a two-chord beam: meet halfway between the two stem ends.
pub fn bring_stems_closer(chords: &mut [&mut ChordSymbol]) {
    let [first, last] = chords else { return };
    let (Some(first_stem), Some(last_stem)) = (first.stem_mut(), last.stem_mut()) else {
        return;
    };

    let up = first_stem.direction() == StemDirection::Up;
    // a dotted eighth beamed to a sixteenth gets a longer stem
    if first_stem.duration() == NoteDuration::DottedEighth
        && last_stem.duration() == NoteDuration::Sixteenth
    {
        first_stem.set_end(first_stem.end().add(if up { 2 } else { -2 }));
    }

    let distance = first_stem.end().dist(&last_stem.end()).abs();
    let half = distance / 2;
    if up {
        if first_stem.end() >= last_stem.end() {
            last_stem.set_end(last_stem.end().add(half));
        } else {
            first_stem.set_end(first_stem.end().add(half));
        }
    } else if first_stem.end() <= last_stem.end() {
        last_stem.set_end(last_stem.end().add(-half));
    } else {
        first_stem.set_end(first_stem.end().add(-half));
    }
}

/// For three or more chords: make the beam level, or slant it by one
/// step per chord when the outer stem ends differ by two steps or more.
pub fn line_up_stem_ends(chords: &mut [&mut ChordSymbol]) {
    let ends: Vec<_> = chords.iter().filter_map(|c| c.stem().map(|s| s.end())).collect();
    if ends.len() != chords.len() || ends.len() < 3 {
        return;
    }
    let (first_end, last_end) = (ends[0], ends[ends.len() - 1]);
    let up = chords[0].stem().map(|s| s.direction()) == Some(StemDirection::Up);

    let (first, middle, last) = if up {
        let top = ends.iter().copied().max().unwrap_or(first_end);
        if top == first_end && top.dist(&last_end) >= 2 {
            (top, top.add(-1), top.add(-2))
        } else if top == last_end && top.dist(&first_end) >= 2 {
            (top.add(-2), top.add(-1), top)
        } else {
            (top, top, top)
        }
    } else {
        let bottom = ends.iter().copied().min().unwrap_or(first_end);
        if bottom == first_end && last_end.dist(&bottom) >= 2 {
            (bottom, bottom.add(1), bottom.add(2))
        } else if bottom == last_end && first_end.dist(&bottom) >= 2 {
            (bottom.add(2), bottom.add(1), bottom)
        } else {
            (bottom, bottom, bottom)
        }
    };

    let count = chords.len();
    for (i, chord) in chords.iter_mut().enumerate() {
        let end = match i {
            0 => first,
            i if i == count - 1 => last,
            _ => middle,
        };
        if let Some(stem) = chord.stem_mut() {
            stem.set_end(end);
        }
    }
}

/// Find `count` chords with stems starting at or after `start`, separated
/// only by blank symbols. Returns their indexes and the horizontal distance
/// from the first chord to the last.
pub fn find_consecutive_chords(symbols: &[Symbol], start: usize, count: usize) -> Option<(Vec<usize>, i32)> {
    if count == 0 {
        return None;
    }
    let mut i = start;
    loop {
        // first chord with a stem
        while i + count <= symbols.len() {
            if symbols[i].as_chord().map_or(false, |c| c.stem().is_some()) {
                break;
            }
            i += 1;
        }
        if i + count > symbols.len() {
            return None;
        }

        let mut indexes = vec![i];
        let mut distance = 0;
        let mut found = true;
        for n in 1..count {
            i += 1;
            let remaining = count - 1 - n;
            while i + remaining < symbols.len() && symbols[i].is_blank() {
                distance += symbols[i].width();
                i += 1;
            }
            if i + remaining >= symbols.len() {
                return None;
            }
            if symbols[i].as_chord().is_none() {
                found = false;
                break;
            }
            indexes.push(i);
            distance += symbols[i].width();
        }
        if found {
            return Some((indexes, distance));
        }
    }
}

/// Mutable references to the chords at `indexes` (which must be ascending).
fn chords_at<'a>(symbols: &'a mut [Symbol], indexes: &[usize]) -> Vec<&'a mut ChordSymbol> {
    symbols
        .iter_mut()
        .enumerate()
        .filter(|(i, _)| indexes.binary_search(i).is_ok())
        .filter_map(|(_, s)| s.as_chord_mut())
        .collect()
}

/// Beam every eligible run of `count` chords in one staff's symbols.
pub fn create_beamed_chords(symbols: &mut [Symbol], time: &TimeSignature, count: usize, on_beat: bool) {
    let mut start = 0;
    while let Some((indexes, distance)) = find_consecutive_chords(symbols, start, count) {
        let eligible = {
            let chords: Vec<&ChordSymbol> = indexes.iter().filter_map(|&i| symbols[i].as_chord()).collect();
            can_create_beams(&chords, time, on_beat)
        };
        let (Some(&first), Some(&last)) = (indexes.first(), indexes.last()) else {
            break;
        };
        if eligible {
            debug!("beaming {} chords from {}", count, symbols[first].start_time());
            let mut chords = chords_at(symbols, &indexes);
            create_beam(&mut chords, distance);
            start = last + 1;
        } else {
            start = first + 1;
        }
    }
}

/// Run every beam pass in order of preference.
pub fn create_all_beamed_chords(symbols: &mut [Symbol], time: &TimeSignature) {
    if matches!((time.numerator(), time.denominator()), (3, 4) | (6, 8) | (6, 4)) {
        create_beamed_chords(symbols, time, 6, true);
    }
    create_beamed_chords(symbols, time, 3, true);
    create_beamed_chords(symbols, time, 4, true);
    create_beamed_chords(symbols, time, 2, true);
    create_beamed_chords(symbols, time, 2, false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MidiNote;
    use crate::sheet::config::SheetConfig;
    use crate::sheet::key::{AccidentalTracker, KeySignature};
    use crate::sheet::white_note::Clef;

    fn chords(specs: &[(u32, u8, u32)]) -> Vec<ChordSymbol> {
        let time = TimeSignature::common(480).unwrap();
        let cfg = SheetConfig::default();
        let mut tracker = AccidentalTracker::new(KeySignature::default());
        specs
            .iter()
            .filter_map(|&(start, pitch, dur)| {
                let note = MidiNote::new(start, 0, pitch, dur).unwrap();
                ChordSymbol::new(&[note], &mut tracker, &time, Clef::Treble, &cfg)
            })
            .collect()
    }

    #[test]
    fn two_eighths_on_beat_beam() {
        let time = TimeSignature::common(480).unwrap();
        let mut run = chords(&[(0, 67, 240), (240, 69, 240)]);
        let refs: Vec<&ChordSymbol> = run.iter().collect();
        assert!(can_create_beams(&refs, &time, true));

        let mut muts: Vec<&mut ChordSymbol> = run.iter_mut().collect();
        create_beam(&mut muts, 30);
        let first = run[0].stem().unwrap();
        assert_eq!(first.beam().map(|b| (b.span, b.width_to_pair)), Some((2, 30)));
        assert!(run[1].stem().unwrap().is_receiver());
    }

    #[test]
    fn off_beat_pair_waits_for_second_pass() {
        let time = TimeSignature::common(480).unwrap();
        let run = chords(&[(240, 67, 240), (480, 69, 240)]);
        let refs: Vec<&ChordSymbol> = run.iter().collect();
        assert!(!can_create_beams(&refs, &time, true));
        assert!(can_create_beams(&refs, &time, false));
    }

    #[test]
    fn quarters_are_never_beamed() {
        let time = TimeSignature::common(480).unwrap();
        let run = chords(&[(0, 67, 480), (480, 69, 480)]);
        let refs: Vec<&ChordSymbol> = run.iter().collect();
        assert!(!can_create_beams(&refs, &time, false));
    }

    #[test]
    fn distant_stems_are_not_beamed() {
        let time = TimeSignature::common(480).unwrap();
        let run = chords(&[(0, 60, 240), (240, 84, 240)]);
        let refs: Vec<&ChordSymbol> = run.iter().collect();
        assert!(!can_create_beams(&refs, &time, true));
    }

    #[test]
    fn rising_run_slants_one_step_per_chord() {
        let mut run = chords(&[(0, 64, 240), (240, 67, 240), (480, 71, 240), (720, 72, 240)]);
        let mut muts: Vec<&mut ChordSymbol> = run.iter_mut().collect();
        create_beam(&mut muts, 60);
        let ends: Vec<_> = run.iter().map(|c| c.stem().unwrap().end()).collect();
        assert_eq!(ends[1], ends[2]);
        assert_eq!(ends[3].dist(&ends[0]), 2);
        assert_eq!(ends[3].dist(&ends[1]), 1);
    }

    /// A chord of (pitch, duration) notes all starting at `start`.
    fn chord_at(start: u32, notes: &[(u8, u32)]) -> ChordSymbol {
        let time = TimeSignature::common(480).unwrap();
        let cfg = SheetConfig::default();
        let mut tracker = AccidentalTracker::new(KeySignature::default());
        let notes: Vec<MidiNote> = notes
            .iter()
            .map(|&(pitch, dur)| MidiNote::new(start, 0, pitch, dur).unwrap())
            .collect();
        ChordSymbol::new(&notes, &mut tracker, &time, Clef::Treble, &cfg).unwrap()
    }

    #[test]
    fn two_stem_chords_pulling_apart_are_not_beamed() {
        let time = TimeSignature::common(480).unwrap();
        // eighth on top (stem up), then eighth at the bottom (stem down)
        let up = chord_at(0, &[(60, 480), (72, 240)]);
        let down = chord_at(240, &[(60, 240), (72, 480)]);
        assert!(up.has_two_stems() && down.has_two_stems());
        assert_eq!(up.stem().map(|s| s.direction()), Some(StemDirection::Up));
        assert_eq!(down.stem().map(|s| s.direction()), Some(StemDirection::Down));

        assert!(!can_create_beams(&[&up, &down], &time, true));
        assert!(!can_create_beams(&[&up, &down], &time, false));

        let mut symbols = vec![Symbol::Chord(up), Symbol::Chord(down)];
        create_all_beamed_chords(&mut symbols, &time);
        for chord in symbols.iter().filter_map(Symbol::as_chord) {
            assert!(chord.stems().all(|s| !s.is_beam()));
        }
    }

    #[test]
    fn four_eighths_off_the_half_bar_beam_in_pairs() {
        let time = TimeSignature::common(480).unwrap();
        let run = chords(&[(480, 67, 240), (720, 69, 240), (960, 71, 240), (1200, 72, 240)]);
        let refs: Vec<&ChordSymbol> = run.iter().collect();
        assert!(!can_create_beams(&refs, &time, true));

        let mut symbols: Vec<Symbol> = run.into_iter().map(Symbol::Chord).collect();
        create_all_beamed_chords(&mut symbols, &time);
        let spans: Vec<Option<usize>> = symbols
            .iter()
            .filter_map(Symbol::as_chord)
            .map(|c| c.stem().and_then(|s| s.beam()).map(|b| b.span))
            .collect();
        assert_eq!(spans, vec![Some(2), None, Some(2), None]);
    }

    #[test]
    fn dotted_eighth_pairs_with_sixteenth() {
        let time = TimeSignature::common(480).unwrap();
        let run = chords(&[(0, 67, 360), (360, 67, 120)]);
        let refs: Vec<&ChordSymbol> = run.iter().collect();
        assert!(can_create_beams(&refs, &time, true));
    }
}
