//! Chord symbols: notes drawn together on one or two stems.

use log::trace;
use serde::Serialize;

use super::clef::ClefMeasures;
use super::config::{SheetConfig, NOTE_COLOR};
use super::key::{Accidental, AccidentalTracker, KeySignature};
use super::stem::{Stem, StemDirection};
use super::symbols::{AccidSymbol, MusicSymbol};
use super::time::{NoteDuration, TimeSignature};
use super::white_note::{Clef, WhiteNote};
use crate::model::MidiNote;
use crate::options::NoteNameDisplay;
use crate::renderer::Canvas;

/// Width a note-name label adds to a chord.
const NOTE_LETTER_WIDTH: i32 = 8;

/// Staff-step spread from which a chord reaching across the middle line is
/// split onto two stems.
const TWO_STEM_SPREAD: i32 = 12;

const DO_RE_MI: [&str; 12] = ["Do", "Di", "Re", "Ri", "Mi", "Fa", "Fi", "So", "Si", "La", "Li", "Ti"];

/// One note of a chord, as drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteDatum {
    /// MIDI note number
    pub number: u8,
    pub white_note: WhiteNote,
    pub duration: NoteDuration,
    /// Drawn on the left of the stem. Adjacent notes alternate sides.
    pub left_side: bool,
    pub accidental: Option<Accidental>,
    pub start_time: u32,
    pub end_time: u32,
}

/// True if any note in `notes` sounds during `[start, end)`.
pub fn notes_overlap(notes: &[NoteDatum], start: u32, end: u32) -> bool {
    notes
        .iter()
        .any(|n| n.start_time < end && start < n.end_time)
}

/// True if some notehead in the group is pushed to the right of the stem.
fn has_right_side_notes(notes: &[NoteDatum]) -> bool {
    notes.iter().any(|n| !n.left_side)
}

/// Stem direction for a chord spanning `bottom..=top`: up when the chord
/// sits on or below the middle staff line on average.
pub fn stem_direction(bottom: WhiteNote, top: WhiteNote, clef: Clef) -> StemDirection {
    let middle = WhiteNote::middle(clef);
    let dist = middle.dist(&bottom) + middle.dist(&top);
    if dist >= 0 {
        StemDirection::Up
    } else {
        StemDirection::Down
    }
}

/// Label printed next to a note for the given display mode.
pub fn note_name(number: u8, display: NoteNameDisplay, key: &KeySignature) -> String {
    let class = (number % 12) as usize;
    let movable = (class + 12 - key.tonic() as usize) % 12;
    match display {
        NoteNameDisplay::None => String::new(),
        NoteNameDisplay::Letter => {
            let (white, alter) = key.spell(number);
            let suffix = match alter {
                1 => "#",
                -1 => "b",
                _ => "",
            };
            format!("{}{}", white.letter.name(), suffix)
        }
        NoteNameDisplay::FixedDoReMi => DO_RE_MI[class].to_string(),
        NoteNameDisplay::MovableDoReMi => DO_RE_MI[movable].to_string(),
        NoteNameDisplay::FixedNumber => (class + 1).to_string(),
        NoteNameDisplay::MovableNumber => (movable + 1).to_string(),
    }
}

/// A group of notes sharing a start time and a clef.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChordSymbol {
    clef: Clef,
    start_time: u32,
    end_time: u32,
    notes: Vec<NoteDatum>,
    accid_symbols: Vec<AccidSymbol>,
    width: i32,
    stem1: Option<Stem>,
    stem2: Option<Stem>,
    has_two_stems: bool,
}

impl ChordSymbol {
    /// Build a chord from notes that start together. Returns `None` for an
    /// empty group. Accidentals are decided through `tracker`, so chords of
    /// one track must be built in time order.
    pub fn new(
        notes: &[MidiNote],
        tracker: &mut AccidentalTracker,
        time: &TimeSignature,
        clef: Clef,
        cfg: &SheetConfig,
    ) -> Option<Self> {
        let start_time = notes.iter().map(|n| n.start_time()).min()?;
        let end_time = start_time
            .saturating_add(notes.iter().map(|n| n.duration()).max().unwrap_or(0));

        let mut sorted = notes.to_vec();
        sorted.sort_by(MidiNote::cmp_by_number);

        let mut data: Vec<NoteDatum> = Vec::with_capacity(sorted.len());
        for note in &sorted {
            let white_note = tracker.key().white_note(note.number());
            let left_side = match data.last() {
                Some(prev) if white_note.dist(&prev.white_note) <= 1 => !prev.left_side,
                _ => true,
            };
            data.push(NoteDatum {
                number: note.number(),
                white_note,
                duration: time.note_duration(note.duration()),
                left_side,
                accidental: tracker.accidental(note.number(), time.measure_of(note.start_time())),
                start_time: note.start_time(),
                end_time: note.end_time(),
            });
        }

        let accid_symbols = data
            .iter()
            .filter_map(|n| n.accidental.map(|a| AccidSymbol::new(a, n.white_note, clef)))
            .collect();

        let (stem1, stem2, has_two_stems) = Self::create_stems(&data, clef);

        let mut chord = Self {
            clef,
            start_time,
            end_time,
            notes: data,
            accid_symbols,
            width: 0,
            stem1,
            stem2,
            has_two_stems,
        };
        chord.width = chord.min_width(cfg);
        trace!(
            "chord at {}: {} notes, two stems: {}",
            chord.start_time,
            chord.notes.len(),
            chord.has_two_stems
        );
        Some(chord)
    }

    fn create_stems(notes: &[NoteDatum], clef: Clef) -> (Option<Stem>, Option<Stem>, bool) {
        let (Some(first), Some(last)) = (notes.first(), notes.last()) else {
            return (None, None, false);
        };
        let group_stem = |range: std::ops::Range<usize>, direction: StemDirection| {
            let group = &notes[range];
            let bottom = group.first().map_or(first.white_note, |n| n.white_note);
            let top = group.last().map_or(last.white_note, |n| n.white_note);
            let duration = group.first().map_or(first.duration, |n| n.duration);
            Stem::new(bottom, top, duration, direction, has_right_side_notes(group))
        };
        let no_whole = |stem: Stem| (stem.duration() != NoteDuration::Whole).then_some(stem);

        // Split where the duration first changes, or at the widest gap of a
        // wide chord reaching across the middle line.
        let split = notes
            .iter()
            .position(|n| n.duration != first.duration)
            .or_else(|| {
                let middle = WhiteNote::middle(clef);
                let wide = middle.dist(&first.white_note) >= 0
                    && middle.dist(&last.white_note) < 0
                    && last.white_note.dist(&first.white_note) >= TWO_STEM_SPREAD;
                if !wide {
                    return None;
                }
                (1..notes.len()).max_by_key(|&i| {
                    // first of equal gaps wins
                    (notes[i].white_note.dist(&notes[i - 1].white_note), -(i as i32))
                })
            });

        match split {
            Some(change) => {
                let low = group_stem(0..change, StemDirection::Down);
                let high = group_stem(change..notes.len(), StemDirection::Up);
                (no_whole(low), no_whole(high), true)
            }
            None => {
                let direction = stem_direction(first.white_note, last.white_note, clef);
                (no_whole(group_stem(0..notes.len(), direction)), None, false)
            }
        }
    }

    pub fn clef(&self) -> Clef {
        self.clef
    }

    /// Start time plus the longest note's duration.
    pub fn end_time(&self) -> u32 {
        self.end_time
    }

    /// Notes in ascending pitch order.
    pub fn notes(&self) -> &[NoteDatum] {
        &self.notes
    }

    pub fn accid_symbols(&self) -> &[AccidSymbol] {
        &self.accid_symbols
    }

    pub fn has_two_stems(&self) -> bool {
        self.has_two_stems
    }

    pub fn stems(&self) -> impl Iterator<Item = &Stem> {
        self.stem1.iter().chain(self.stem2.iter())
    }

    /// The stem that beaming works with: the shorter-duration one when
    /// there are two.
    pub fn stem(&self) -> Option<&Stem> {
        match (&self.stem1, &self.stem2) {
            (None, s) | (s, None) => s.as_ref(),
            (Some(s1), Some(s2)) => Some(if s1.duration() < s2.duration() { s1 } else { s2 }),
        }
    }

    pub fn stem_mut(&mut self) -> Option<&mut Stem> {
        match (&mut self.stem1, &mut self.stem2) {
            (None, s) | (s, None) => s.as_mut(),
            (Some(s1), Some(s2)) => Some(if s1.duration() < s2.duration() { s1 } else { s2 }),
        }
    }

    fn draw_accid(&self, canvas: &mut dyn Canvas, x: i32, ytop: i32, cfg: &SheetConfig) -> i32 {
        let mut xpos = 0;
        let mut prev: Option<&AccidSymbol> = None;
        for symbol in &self.accid_symbols {
            if let Some(prev) = prev {
                if symbol.note().dist(&prev.note()) < 6 {
                    xpos += symbol.min_width(cfg);
                }
            }
            symbol.draw(canvas, x + xpos, ytop, cfg);
            prev = Some(symbol);
        }
        if let Some(prev) = prev {
            xpos += prev.min_width(cfg);
        }
        xpos
    }

    fn draw_notes(&self, canvas: &mut dyn Canvas, x: i32, ytop: i32, top_staff: WhiteNote, cfg: &SheetConfig) {
        let (nh, nw, ls, lw) = (cfg.note_height, cfg.note_width, cfg.line_space, cfg.line_width);

        for note in &self.notes {
            let ynote = ytop + top_staff.dist(&note.white_note) * nh / 2;
            let mut xnote = x + ls / 4;
            if !note.left_side {
                xnote += nw;
            }
            let color = cfg.note_color(note.number);
            canvas.notehead(
                (xnote + nw / 2) as f64,
                (ynote + nh / 2) as f64,
                nw as f64 / 2.0,
                nh as f64 / 2.0,
                !note.duration.is_hollow(),
                color,
            );
            if note.duration.is_dotted() {
                canvas.notehead(
                    (xnote + nw + ls / 3 + 2) as f64,
                    (ynote + ls / 3 + 2) as f64,
                    2.0,
                    2.0,
                    true,
                    color,
                );
            }

            // ledger lines above the staff
            let top = top_staff.add(1);
            let dist = note.white_note.dist(&top);
            let mut y = ytop - lw;
            for _ in (2..=dist).step_by(2) {
                y -= nh;
                canvas.line((xnote - ls / 4) as f64, y as f64, (xnote + nw + ls / 4) as f64, y as f64, NOTE_COLOR, lw as f64);
            }

            // and below it
            let bottom = top.add(-8);
            let dist = bottom.dist(&note.white_note);
            let mut y = ytop + (ls + lw) * 4 - 1;
            for _ in (2..=dist).step_by(2) {
                y += nh;
                canvas.line((xnote - ls / 4) as f64, y as f64, (xnote + nw + ls / 4) as f64, y as f64, NOTE_COLOR, lw as f64);
            }
        }
    }

    fn draw_note_letters(&self, canvas: &mut dyn Canvas, x: i32, ytop: i32, top_staff: WhiteNote, cfg: &SheetConfig) {
        let (nh, nw) = (cfg.note_height, cfg.note_width);
        let overlap = has_right_side_notes(&self.notes);
        for note in &self.notes {
            let mut xnote = x + nw + nw / 2;
            if overlap {
                xnote += nw / 2;
            }
            let ynote = ytop + top_staff.dist(&note.white_note) * nh / 2 + nh;
            let label = note_name(note.number, cfg.show_note_letters, &cfg.key);
            canvas.text(xnote as f64, ynote as f64, &label, nh as f64 + 2.0, NOTE_COLOR);
        }
    }
}

impl MusicSymbol for ChordSymbol {
    fn start_time(&self) -> u32 {
        self.start_time
    }

    fn min_width(&self, cfg: &SheetConfig) -> i32 {
        let nh = cfg.note_height;
        let mut result = 2 * nh + nh * 3 / 4;

        if let Some(first) = self.accid_symbols.first() {
            result += first.min_width(cfg);
            for pair in self.accid_symbols.windows(2) {
                if pair[1].note().dist(&pair[0].note()) < 6 {
                    result += pair[1].min_width(cfg);
                }
            }
        }
        if cfg.show_note_letters != NoteNameDisplay::None {
            result += NOTE_LETTER_WIDTH;
        }
        result
    }

    fn width(&self) -> i32 {
        self.width
    }

    fn set_width(&mut self, width: i32) {
        self.width = width;
    }

    fn above_staff(&self, cfg: &SheetConfig) -> i32 {
        let Some(mut top) = self.notes.last().map(|n| n.white_note) else {
            return 0;
        };
        for stem in self.stems() {
            top = top.max(stem.end());
        }
        let dist = top.dist(&WhiteNote::top(self.clef)) * cfg.note_height / 2;
        self.accid_symbols
            .iter()
            .map(|a| a.above_staff(cfg))
            .fold(dist.max(0), i32::max)
    }

    fn below_staff(&self, cfg: &SheetConfig) -> i32 {
        let Some(mut bottom) = self.notes.first().map(|n| n.white_note) else {
            return 0;
        };
        for stem in self.stems() {
            bottom = bottom.min(stem.end());
        }
        let dist = WhiteNote::bottom(self.clef).dist(&bottom) * cfg.note_height / 2;
        self.accid_symbols
            .iter()
            .map(|a| a.below_staff(cfg))
            .fold(dist.max(0), i32::max)
    }

    fn draw(&self, canvas: &mut dyn Canvas, x: i32, ytop: i32, cfg: &SheetConfig) {
        // right-align the chord within its width
        let x = x + self.width - self.min_width(cfg);
        let top_staff = WhiteNote::top(self.clef);
        let xnotes = x + self.draw_accid(canvas, x, ytop, cfg);

        self.draw_notes(canvas, xnotes, ytop, top_staff, cfg);
        if cfg.show_note_letters != NoteNameDisplay::None {
            self.draw_note_letters(canvas, xnotes, ytop, top_staff, cfg);
        }
        for stem in self.stems() {
            stem.draw(canvas, xnotes, ytop, top_staff, cfg);
        }
    }
}

/// Group time-ordered notes into chords: a note joins the current chord
/// when it starts within `interval` pulses of the chord's first note and
/// falls under the same clef. Joined notes take the chord's start time.
/// Each group is sorted by pitch.
pub fn group_notes(notes: &[MidiNote], clefs: &ClefMeasures, interval: u32) -> Vec<Vec<MidiNote>> {
    let mut sorted = notes.to_vec();
    sorted.sort_by(MidiNote::cmp_by_time);

    let mut groups = Vec::new();
    let mut iter = sorted.into_iter().peekable();
    while let Some(first) = iter.next() {
        let start = first.start_time();
        let clef = clefs.clef_at(start);
        let mut group = vec![first];
        while let Some(next) = iter.next_if(|n| {
            n.start_time() - start <= interval && clefs.clef_at(n.start_time()) == clef
        }) {
            group.push(next.with_start_time(start));
        }
        group.sort_by(MidiNote::cmp_by_number);
        groups.push(group);
    }
    groups
}

/// Build the chords of one track.
pub fn create_chords(
    notes: &[MidiNote],
    key: KeySignature,
    time: &TimeSignature,
    clefs: &ClefMeasures,
    interval: u32,
    cfg: &SheetConfig,
) -> Vec<ChordSymbol> {
    let mut tracker = AccidentalTracker::new(key);
    group_notes(notes, clefs, interval)
        .iter()
        .filter_map(|group| {
            let start = group.first()?.start_time();
            ChordSymbol::new(group, &mut tracker, time, clefs.clef_at(start), cfg)
        })
        .collect()
}
