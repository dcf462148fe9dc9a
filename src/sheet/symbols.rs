//! The symbols a staff is made of.
//!
//! Every symbol has a start time, a minimum width, a current width (which
//! alignment and justification may grow), the space it needs above and
//! below the staff, and a draw hook. `Symbol` is the closed set of kinds a
//! staff can hold.

use serde::Serialize;

use super::chord::ChordSymbol;
use super::config::{SheetConfig, NOTE_COLOR};
use super::key::Accidental;
use super::time::{NoteDuration, TimeSignature};
use super::white_note::{Clef, WhiteNote};
use crate::renderer::Canvas;

/// Capability shared by all staff symbols. Widths and heights are in pixels.
pub trait MusicSymbol {
    /// Time in pulses the symbol occurs at; used to order and align symbols.
    fn start_time(&self) -> u32;

    /// Smallest width the symbol can be drawn in.
    fn min_width(&self, cfg: &SheetConfig) -> i32;

    /// Current width; never less than `min_width`.
    fn width(&self) -> i32;

    fn set_width(&mut self, width: i32);

    /// Pixels needed above the top staff line.
    fn above_staff(&self, cfg: &SheetConfig) -> i32;

    /// Pixels needed below the bottom staff line.
    fn below_staff(&self, cfg: &SheetConfig) -> i32;

    /// Draw with the symbol's left edge at `x` and the top staff line at `ytop`.
    fn draw(&self, canvas: &mut dyn Canvas, x: i32, ytop: i32, cfg: &SheetConfig);
}

// ═══════════════════════════════════════════════════════════════════════
// Bar
// ═══════════════════════════════════════════════════════════════════════

/// Vertical line at the start of a measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSymbol {
    start_time: u32,
    width: i32,
}

impl BarSymbol {
    pub fn new(start_time: u32, cfg: &SheetConfig) -> Self {
        let mut bar = Self { start_time, width: 0 };
        bar.width = bar.min_width(cfg);
        bar
    }
}

impl MusicSymbol for BarSymbol {
    fn start_time(&self) -> u32 {
        self.start_time
    }

    fn min_width(&self, cfg: &SheetConfig) -> i32 {
        2 * cfg.line_space
    }

    fn width(&self) -> i32 {
        self.width
    }

    fn set_width(&mut self, width: i32) {
        self.width = width;
    }

    fn above_staff(&self, _cfg: &SheetConfig) -> i32 {
        0
    }

    fn below_staff(&self, _cfg: &SheetConfig) -> i32 {
        0
    }

    fn draw(&self, canvas: &mut dyn Canvas, x: i32, ytop: i32, cfg: &SheetConfig) {
        let xbar = (x + cfg.note_width / 2) as f64;
        let yend = ytop + cfg.line_space * 4 + cfg.line_width * 4;
        canvas.line(xbar, ytop as f64, xbar, yend as f64, NOTE_COLOR, cfg.line_width as f64);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Rest
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestSymbol {
    start_time: u32,
    duration: NoteDuration,
    width: i32,
}

impl RestSymbol {
    pub fn new(start_time: u32, duration: NoteDuration, cfg: &SheetConfig) -> Self {
        let mut rest = Self { start_time, duration, width: 0 };
        rest.width = rest.min_width(cfg);
        rest
    }

    pub fn duration(&self) -> NoteDuration {
        self.duration
    }
}

impl MusicSymbol for RestSymbol {
    fn start_time(&self) -> u32 {
        self.start_time
    }

    fn min_width(&self, cfg: &SheetConfig) -> i32 {
        2 * cfg.note_height + cfg.note_height / 2
    }

    fn width(&self) -> i32 {
        self.width
    }

    fn set_width(&mut self, width: i32) {
        self.width = width;
    }

    fn above_staff(&self, _cfg: &SheetConfig) -> i32 {
        0
    }

    fn below_staff(&self, _cfg: &SheetConfig) -> i32 {
        0
    }

    fn draw(&self, canvas: &mut dyn Canvas, x: i32, ytop: i32, cfg: &SheetConfig) {
        let nh = cfg.note_height;
        let ls = cfg.line_space;
        // right-aligned within the width
        let x = (x + self.width - self.min_width(cfg) + nh / 2) as f64;
        let ytop = ytop as f64;
        let (nh, ls, nw) = (nh as f64, ls as f64, cfg.note_width as f64);

        match self.duration {
            NoteDuration::Whole => canvas.rect(x, ytop + nh, nw, nh / 2.0, NOTE_COLOR),
            NoteDuration::Half => canvas.rect(x, ytop + nh + nh / 2.0, nw, nh / 2.0, NOTE_COLOR),
            NoteDuration::Quarter => {
                let y = ytop + nh / 2.0;
                let xend = x + 2.0 + 2.0 * nh / 3.0;
                let points = [
                    (x + 2.0, y),
                    (xend - 1.0, y + nh - 1.0),
                    (x + 3.0, y + 2.0 * nh - 2.0),
                    (xend, y + 2.0 * nh + nh / 2.0),
                ];
                for pair in points.windows(2) {
                    canvas.line(pair[0].0, pair[0].1, pair[1].0, pair[1].1, NOTE_COLOR, (ls / 2.0).max(1.0));
                }
            }
            NoteDuration::Eighth => {
                let y = ytop + nh - 1.0;
                canvas.notehead(x + ls / 2.0, y + ls / 2.0, ls / 2.0, ls / 2.0, true, NOTE_COLOR);
                canvas.line(x + (ls - 2.0) / 2.0, y + ls - 1.0, x + 3.0 * ls / 2.0, y + ls / 2.0, NOTE_COLOR, 1.0);
                canvas.line(x + 3.0 * ls / 2.0, y + ls / 2.0, x + 3.0 * ls / 4.0, y + nh * 2.0, NOTE_COLOR, 1.0);
            }
            _ => {}
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Clef
// ═══════════════════════════════════════════════════════════════════════

/// A clef, either at the start of a staff or (small) at a clef change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClefSymbol {
    start_time: u32,
    clef: Clef,
    small: bool,
    width: i32,
}

impl ClefSymbol {
    pub fn new(clef: Clef, start_time: u32, small: bool, cfg: &SheetConfig) -> Self {
        let mut sym = Self { start_time, clef, small, width: 0 };
        sym.width = sym.min_width(cfg);
        sym
    }

    pub fn clef(&self) -> Clef {
        self.clef
    }

    pub fn is_small(&self) -> bool {
        self.small
    }
}

impl MusicSymbol for ClefSymbol {
    fn start_time(&self) -> u32 {
        self.start_time
    }

    fn min_width(&self, cfg: &SheetConfig) -> i32 {
        if self.small {
            cfg.note_width * 2
        } else {
            cfg.note_width * 3
        }
    }

    fn width(&self) -> i32 {
        self.width
    }

    fn set_width(&mut self, width: i32) {
        self.width = width;
    }

    fn above_staff(&self, cfg: &SheetConfig) -> i32 {
        if self.clef == Clef::Treble && !self.small {
            cfg.note_height * 2
        } else {
            0
        }
    }

    fn below_staff(&self, cfg: &SheetConfig) -> i32 {
        match (self.clef, self.small) {
            (Clef::Treble, false) => cfg.note_height * 2,
            (Clef::Treble, true) => cfg.note_height,
            _ => 0,
        }
    }

    fn draw(&self, canvas: &mut dyn Canvas, x: i32, ytop: i32, cfg: &SheetConfig) {
        let x = x + self.width - self.min_width(cfg);
        canvas.clef(self.clef, x as f64, ytop as f64, cfg.line_space as f64, self.small);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Time signature
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSigSymbol {
    numerator: u32,
    denominator: u32,
    width: i32,
}

impl TimeSigSymbol {
    pub fn new(time: &TimeSignature, cfg: &SheetConfig) -> Self {
        let mut sym = Self {
            numerator: time.numerator(),
            denominator: time.denominator(),
            width: 0,
        };
        sym.width = sym.min_width(cfg);
        sym
    }
}

impl MusicSymbol for TimeSigSymbol {
    fn start_time(&self) -> u32 {
        0
    }

    fn min_width(&self, cfg: &SheetConfig) -> i32 {
        2 * cfg.note_height
    }

    fn width(&self) -> i32 {
        self.width
    }

    fn set_width(&mut self, width: i32) {
        self.width = width;
    }

    fn above_staff(&self, _cfg: &SheetConfig) -> i32 {
        0
    }

    fn below_staff(&self, _cfg: &SheetConfig) -> i32 {
        0
    }

    fn draw(&self, canvas: &mut dyn Canvas, x: i32, ytop: i32, cfg: &SheetConfig) {
        let nh = cfg.note_height as f64;
        let x = (x + self.width - self.min_width(cfg)) as f64 + nh / 2.0;
        let ytop = ytop as f64;
        canvas.text(x, ytop + 2.0 * nh, &self.numerator.to_string(), 2.0 * nh, NOTE_COLOR);
        canvas.text(x, ytop + 4.0 * nh, &self.denominator.to_string(), 2.0 * nh, NOTE_COLOR);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Blank
// ═══════════════════════════════════════════════════════════════════════

/// Invisible spacer keeping simultaneous symbols of different tracks aligned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlankSymbol {
    start_time: u32,
    width: i32,
}

impl BlankSymbol {
    pub fn new(start_time: u32, width: i32) -> Self {
        Self { start_time, width }
    }
}

impl MusicSymbol for BlankSymbol {
    fn start_time(&self) -> u32 {
        self.start_time
    }

    fn min_width(&self, _cfg: &SheetConfig) -> i32 {
        0
    }

    fn width(&self) -> i32 {
        self.width
    }

    fn set_width(&mut self, width: i32) {
        self.width = width;
    }

    fn above_staff(&self, _cfg: &SheetConfig) -> i32 {
        0
    }

    fn below_staff(&self, _cfg: &SheetConfig) -> i32 {
        0
    }

    fn draw(&self, _canvas: &mut dyn Canvas, _x: i32, _ytop: i32, _cfg: &SheetConfig) {}
}

// ═══════════════════════════════════════════════════════════════════════
// Accidental
// ═══════════════════════════════════════════════════════════════════════

/// A sharp, flat or natural, either in a chord or in the key signature.
/// Not a staff symbol on its own: chords and staffs own and draw these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccidSymbol {
    accid: Accidental,
    note: WhiteNote,
    clef: Clef,
}

impl AccidSymbol {
    pub fn new(accid: Accidental, note: WhiteNote, clef: Clef) -> Self {
        Self { accid, note, clef }
    }

    pub fn accid(&self) -> Accidental {
        self.accid
    }

    pub fn note(&self) -> WhiteNote {
        self.note
    }

    pub fn min_width(&self, cfg: &SheetConfig) -> i32 {
        3 * cfg.note_height / 2
    }

    pub fn above_staff(&self, cfg: &SheetConfig) -> i32 {
        let mut dist = WhiteNote::top(self.clef).dist(&self.note) * cfg.note_height / 2;
        dist -= match self.accid {
            Accidental::Sharp | Accidental::Natural => cfg.note_height,
            Accidental::Flat => 3 * cfg.note_height / 2,
        };
        (-dist).max(0)
    }

    pub fn below_staff(&self, cfg: &SheetConfig) -> i32 {
        let mut dist = WhiteNote::bottom(self.clef).dist(&self.note) * cfg.note_height / 2 + cfg.note_height;
        if matches!(self.accid, Accidental::Sharp | Accidental::Natural) {
            dist += cfg.note_height;
        }
        dist.max(0)
    }

    pub fn draw(&self, canvas: &mut dyn Canvas, x: i32, ytop: i32, cfg: &SheetConfig) {
        let ynote = ytop + WhiteNote::top(self.clef).dist(&self.note) * cfg.note_height / 2;
        match self.accid {
            Accidental::Sharp => draw_sharp(canvas, x, ynote, cfg),
            Accidental::Flat => draw_flat(canvas, x, ynote, cfg),
            Accidental::Natural => draw_natural(canvas, x, ynote, cfg),
        }
    }
}

fn draw_sharp(canvas: &mut dyn Canvas, x: i32, ynote: i32, cfg: &SheetConfig) {
    let nh = cfg.note_height;
    let ls = cfg.line_space;
    let lw = cfg.line_width;

    let ystart = ynote - nh;
    let yend = ynote + 2 * nh;
    let x1 = x + nh / 2;
    canvas.line(x1 as f64, (ystart + 2) as f64, x1 as f64, yend as f64, NOTE_COLOR, 1.0);
    let x2 = x1 + nh / 2;
    canvas.line(x2 as f64, ystart as f64, x2 as f64, (yend - 2) as f64, NOTE_COLOR, 1.0);

    let xstart = x + nh / 2 - nh / 4;
    let xend = x + nh + nh / 4;
    let mut y1 = ynote + lw;
    let mut y2 = y1 - lw - ls / 4;
    for _ in 0..2 {
        canvas.line(xstart as f64, y1 as f64, xend as f64, y2 as f64, NOTE_COLOR, (ls / 2) as f64);
        y1 += ls;
        y2 += ls;
    }
}

fn draw_flat(canvas: &mut dyn Canvas, x: i32, ynote: i32, cfg: &SheetConfig) {
    let nh = cfg.note_height;
    let ls = cfg.line_space;
    let x1 = x + ls / 4;

    canvas.line(x1 as f64, (ynote - nh - nh / 2) as f64, x1 as f64, (ynote + nh) as f64, NOTE_COLOR, 1.0);
    let bowl = [
        (x1, ynote + ls / 4),
        (x1 + ls / 2, ynote - ls / 4),
        (x1 + ls, ynote + ls / 3),
        (x1, ynote + ls + cfg.line_width + 1),
    ];
    for pair in bowl.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        canvas.line(a.0 as f64, a.1 as f64, b.0 as f64, b.1 as f64, NOTE_COLOR, 1.0);
    }
}

fn draw_natural(canvas: &mut dyn Canvas, x: i32, ynote: i32, cfg: &SheetConfig) {
    let ls = cfg.line_space;
    let lw = cfg.line_width;

    let x1 = x + ls / 2;
    canvas.line(x1 as f64, (ynote - ls - lw) as f64, x1 as f64, (ynote + ls + lw) as f64, NOTE_COLOR, 1.0);
    let x2 = x1 + ls - ls / 4;
    let ystart = ynote - ls / 4;
    let yend = ynote + 2 * ls + lw - ls / 4;
    canvas.line(x2 as f64, ystart as f64, x2 as f64, yend as f64, NOTE_COLOR, 1.0);

    let mut y1 = ynote + lw;
    let mut y2 = y1 - lw - ls / 4;
    for _ in 0..2 {
        canvas.line(x1 as f64, y1 as f64, x2 as f64, y2 as f64, NOTE_COLOR, (ls / 2) as f64);
        y1 += ls;
        y2 += ls;
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Lyric
// ═══════════════════════════════════════════════════════════════════════

pub const LYRIC_FONT_SIZE: f64 = 12.0;
const LYRIC_CHAR_WIDTH_FACTOR: f64 = 0.55;

/// Rough rendered width of a string.
pub fn estimate_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * LYRIC_CHAR_WIDTH_FACTOR
}

/// A lyric syllable placed under a staff. `x` is relative to the end of
/// the key signature and is set when the lyric is attached to a staff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LyricSymbol {
    pub start_time: u32,
    pub text: String,
    pub x: i32,
}

impl LyricSymbol {
    pub fn new(start_time: u32, text: impl Into<String>) -> Self {
        Self { start_time, text: text.into(), x: 0 }
    }

    pub fn min_width(&self) -> i32 {
        estimate_text_width(&self.text, LYRIC_FONT_SIZE).ceil() as i32
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Symbol
// ═══════════════════════════════════════════════════════════════════════

/// Every kind of symbol a staff holds, in drawing order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Symbol {
    Chord(ChordSymbol),
    Bar(BarSymbol),
    Rest(RestSymbol),
    Clef(ClefSymbol),
    TimeSig(TimeSigSymbol),
    Blank(BlankSymbol),
}

macro_rules! dispatch {
    ($self:expr, $sym:ident => $body:expr) => {
        match $self {
            Symbol::Chord($sym) => $body,
            Symbol::Bar($sym) => $body,
            Symbol::Rest($sym) => $body,
            Symbol::Clef($sym) => $body,
            Symbol::TimeSig($sym) => $body,
            Symbol::Blank($sym) => $body,
        }
    };
}

impl Symbol {
    pub fn is_bar(&self) -> bool {
        matches!(self, Symbol::Bar(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Symbol::Blank(_))
    }

    pub fn as_chord(&self) -> Option<&ChordSymbol> {
        match self {
            Symbol::Chord(chord) => Some(chord),
            _ => None,
        }
    }

    pub fn as_chord_mut(&mut self) -> Option<&mut ChordSymbol> {
        match self {
            Symbol::Chord(chord) => Some(chord),
            _ => None,
        }
    }

    /// End of the symbol in pulses: the chord end for chords, the start otherwise.
    pub fn end_time(&self) -> u32 {
        match self {
            Symbol::Chord(chord) => chord.end_time(),
            other => other.start_time(),
        }
    }
}

impl MusicSymbol for Symbol {
    fn start_time(&self) -> u32 {
        dispatch!(self, s => s.start_time())
    }

    fn min_width(&self, cfg: &SheetConfig) -> i32 {
        dispatch!(self, s => s.min_width(cfg))
    }

    fn width(&self) -> i32 {
        dispatch!(self, s => s.width())
    }

    fn set_width(&mut self, width: i32) {
        dispatch!(self, s => s.set_width(width))
    }

    fn above_staff(&self, cfg: &SheetConfig) -> i32 {
        dispatch!(self, s => s.above_staff(cfg))
    }

    fn below_staff(&self, cfg: &SheetConfig) -> i32 {
        dispatch!(self, s => s.below_staff(cfg))
    }

    fn draw(&self, canvas: &mut dyn Canvas, x: i32, ytop: i32, cfg: &SheetConfig) {
        dispatch!(self, s => s.draw(canvas, x, ytop, cfg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::white_note::Letter;

    #[test]
    fn widths_follow_metrics() {
        let cfg = SheetConfig::default();
        assert_eq!(BarSymbol::new(0, &cfg).width(), 10);
        assert_eq!(RestSymbol::new(0, NoteDuration::Quarter, &cfg).width(), 15);
        assert_eq!(ClefSymbol::new(Clef::Treble, 0, false, &cfg).width(), 21);
        assert_eq!(ClefSymbol::new(Clef::Bass, 0, true, &cfg).width(), 14);
    }

    #[test]
    fn treble_clef_extends_past_staff() {
        let cfg = SheetConfig::default();
        let clef = ClefSymbol::new(Clef::Treble, 0, false, &cfg);
        assert_eq!(clef.above_staff(&cfg), 12);
        assert_eq!(clef.below_staff(&cfg), 12);
        assert_eq!(ClefSymbol::new(Clef::Bass, 0, false, &cfg).above_staff(&cfg), 0);
    }

    #[test]
    fn accidental_above_staff_only_when_high() {
        let cfg = SheetConfig::default();
        let low = AccidSymbol::new(Accidental::Sharp, WhiteNote::new(Letter::C, 5), Clef::Treble);
        assert_eq!(low.above_staff(&cfg), 0);
        let high = AccidSymbol::new(Accidental::Sharp, WhiteNote::new(Letter::C, 6), Clef::Treble);
        assert_eq!(high.above_staff(&cfg), 21);
    }
}
