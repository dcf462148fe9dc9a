//! Stems, flags and beams.

use serde::Serialize;

use super::config::{SheetConfig, NOTE_COLOR};
use super::time::NoteDuration;
use super::white_note::WhiteNote;
use crate::renderer::Canvas;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StemDirection {
    Up,
    Down,
}

/// Which side of the noteheads the stem is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StemSide {
    Left,
    Right,
}

/// Link from the first stem of a beamed run to the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BeamLink {
    /// Horizontal distance to the last stem, in pixels
    pub width_to_pair: i32,
    pub pair_end: WhiteNote,
    pub pair_side: StemSide,
    /// Number of chords under the beam
    pub span: usize,
}

/// The stem of a chord (or of one voice of a two-stem chord).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stem {
    duration: NoteDuration,
    direction: StemDirection,
    top: WhiteNote,
    bottom: WhiteNote,
    end: WhiteNote,
    notes_overlap: bool,
    side: StemSide,
    beam: Option<BeamLink>,
    receiver: bool,
}

impl Stem {
    /// `notes_overlap` is true when some notehead sits on the right of the
    /// stem, which forces the stem to the right side.
    pub fn new(
        bottom: WhiteNote,
        top: WhiteNote,
        duration: NoteDuration,
        direction: StemDirection,
        notes_overlap: bool,
    ) -> Self {
        let mut stem = Self {
            duration,
            direction,
            top,
            bottom,
            end: top,
            notes_overlap,
            side: StemSide::Left,
            beam: None,
            receiver: false,
        };
        stem.set_direction(direction);
        stem
    }

    pub fn duration(&self) -> NoteDuration {
        self.duration
    }

    pub fn direction(&self) -> StemDirection {
        self.direction
    }

    /// Change direction, recomputing the side and the default end.
    pub fn set_direction(&mut self, direction: StemDirection) {
        self.direction = direction;
        self.side = if direction == StemDirection::Up || self.notes_overlap {
            StemSide::Right
        } else {
            StemSide::Left
        };
        self.end = self.default_end();
    }

    pub fn top(&self) -> WhiteNote {
        self.top
    }

    pub fn bottom(&self) -> WhiteNote {
        self.bottom
    }

    /// Staff position where the stem ends.
    pub fn end(&self) -> WhiteNote {
        self.end
    }

    pub fn set_end(&mut self, end: WhiteNote) {
        self.end = end;
    }

    pub fn side(&self) -> StemSide {
        self.side
    }

    pub fn beam(&self) -> Option<&BeamLink> {
        self.beam.as_ref()
    }

    /// Part of a beam, either as its first stem or as a receiver.
    pub fn is_beam(&self) -> bool {
        self.receiver || self.beam.is_some()
    }

    pub fn is_receiver(&self) -> bool {
        self.receiver
    }

    pub(crate) fn set_receiver(&mut self, receiver: bool) {
        self.receiver = receiver;
    }

    /// Make this the first stem of a beam ending at `pair`.
    pub(crate) fn set_pair(&mut self, pair: &Stem, width_to_pair: i32, span: usize) {
        self.beam = Some(BeamLink {
            width_to_pair,
            pair_end: pair.end,
            pair_side: pair.side,
            span,
        });
    }

    /// An octave less a step from the outer note, longer for extra flags.
    fn default_end(&self) -> WhiteNote {
        let extra = match self.duration {
            NoteDuration::Sixteenth => 2,
            NoteDuration::ThirtySecond => 4,
            _ => 0,
        };
        match self.direction {
            StemDirection::Up => self.top.add(6 + extra),
            StemDirection::Down => self.bottom.add(-6 - extra),
        }
    }

    fn x_offset(side: StemSide, cfg: &SheetConfig) -> i32 {
        match side {
            StemSide::Left => cfg.line_space / 4 + 1,
            StemSide::Right => cfg.line_space / 4 + cfg.note_width,
        }
    }

    /// Draw the stem. `x` is the left edge of the noteheads, `top_staff`
    /// the white note of the top staff line.
    pub fn draw(&self, canvas: &mut dyn Canvas, x: i32, ytop: i32, top_staff: WhiteNote, cfg: &SheetConfig) {
        if self.duration == NoteDuration::Whole {
            return;
        }
        self.draw_vertical_line(canvas, x, ytop, top_staff, cfg);
        if !self.duration.is_flagged() || self.receiver {
            return;
        }
        if self.beam.is_some() {
            self.draw_beam(canvas, x, ytop, top_staff, cfg);
        } else {
            self.draw_flags(canvas, x, ytop, top_staff, cfg);
        }
    }

    fn draw_vertical_line(&self, canvas: &mut dyn Canvas, x: i32, ytop: i32, top_staff: WhiteNote, cfg: &SheetConfig) {
        let nh = cfg.note_height;
        let xstem = x + Self::x_offset(self.side, cfg);
        let (y1, y2) = match self.direction {
            StemDirection::Up => (
                ytop + top_staff.dist(&self.bottom) * nh / 2 + nh / 4,
                ytop + top_staff.dist(&self.end) * nh / 2,
            ),
            StemDirection::Down => {
                let mut y1 = ytop + top_staff.dist(&self.top) * nh / 2 + nh;
                y1 -= if self.side == StemSide::Left { nh / 4 } else { nh / 2 };
                (y1, ytop + top_staff.dist(&self.end) * nh / 2 + nh)
            }
        };
        canvas.line(xstem as f64, y1 as f64, xstem as f64, y2 as f64, NOTE_COLOR, cfg.line_width as f64);
    }

    fn draw_flags(&self, canvas: &mut dyn Canvas, x: i32, ytop: i32, top_staff: WhiteNote, cfg: &SheetConfig) {
        let nh = cfg.note_height;
        let xstem = (x + Self::x_offset(self.side, cfg)) as f64;
        let reach = (cfg.line_space + cfg.note_width / 2) as f64;
        let (mut y, step) = match self.direction {
            StemDirection::Up => (ytop + top_staff.dist(&self.end) * nh / 2, nh),
            StemDirection::Down => (ytop + top_staff.dist(&self.end) * nh / 2 + nh, -nh),
        };
        for _ in 0..self.duration.flag_count() {
            let y0 = y as f64;
            let y1 = (y + 2 * step) as f64;
            canvas.line(xstem, y0, xstem + reach, y1, NOTE_COLOR, (cfg.line_space / 2).max(1) as f64);
            y += step;
        }
    }

    fn draw_beam(&self, canvas: &mut dyn Canvas, x: i32, ytop: i32, top_staff: WhiteNote, cfg: &SheetConfig) {
        let Some(beam) = self.beam else { return };
        let nh = cfg.note_height;
        let thickness = (nh / 2) as f64;
        let xstart = x + Self::x_offset(self.side, cfg);
        let xend = x + beam.width_to_pair + Self::x_offset(beam.pair_side, cfg);

        let (mut ystart, mut yend, step) = match self.direction {
            StemDirection::Up => (
                ytop + top_staff.dist(&self.end) * nh / 2,
                ytop + top_staff.dist(&beam.pair_end) * nh / 2,
                nh,
            ),
            StemDirection::Down => (
                ytop + top_staff.dist(&self.end) * nh / 2 + nh,
                ytop + top_staff.dist(&beam.pair_end) * nh / 2 + nh,
                -nh,
            ),
        };

        canvas.beam(xstart as f64, ystart as f64, xend as f64, yend as f64, thickness, NOTE_COLOR);
        ystart += step;
        yend += step;

        // dotted eighth to sixteenth: a partial second beam on the sixteenth
        if self.duration == NoteDuration::DottedEighth && xend > xstart {
            let xpart = xend - nh;
            let slope = (yend - ystart) as f64 / (xend - xstart) as f64;
            let ypart = slope * (xpart - xend) as f64 + yend as f64;
            canvas.beam(xpart as f64, ypart, xend as f64, yend as f64, thickness, NOTE_COLOR);
        }
        for _ in 1..self.duration.flag_count() {
            canvas.beam(xstart as f64, ystart as f64, xend as f64, yend as f64, thickness, NOTE_COLOR);
            ystart += step;
            yend += step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::white_note::Letter;

    #[test]
    fn up_stem_ends_six_steps_above_top() {
        let stem = Stem::new(
            WhiteNote::new(Letter::C, 4),
            WhiteNote::new(Letter::E, 4),
            NoteDuration::Quarter,
            StemDirection::Up,
            false,
        );
        assert_eq!(stem.end(), WhiteNote::new(Letter::D, 5));
        assert_eq!(stem.side(), StemSide::Right);
    }

    #[test]
    fn short_notes_get_longer_stems() {
        let bottom = WhiteNote::new(Letter::C, 5);
        let stem = Stem::new(bottom, bottom, NoteDuration::ThirtySecond, StemDirection::Down, false);
        assert_eq!(stem.end(), bottom.add(-10));
        assert_eq!(stem.side(), StemSide::Left);
    }

    #[test]
    fn changing_direction_recomputes_end() {
        let note = WhiteNote::new(Letter::G, 4);
        let mut stem = Stem::new(note, note, NoteDuration::Eighth, StemDirection::Up, true);
        stem.set_direction(StemDirection::Down);
        assert_eq!(stem.end(), note.add(-6));
        assert_eq!(stem.side(), StemSide::Right);
    }
}
