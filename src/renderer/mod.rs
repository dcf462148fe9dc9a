//! Drawing surface for laid-out sheet music, with an SVG implementation.
//!
//! Symbols draw themselves through [`Canvas`]; [`render_sheet_to_svg`]
//! walks the staffs top to bottom and produces a self-contained SVG.

mod svg_builder;

pub use svg_builder::SvgBuilder;

use crate::sheet::config::NOTE_COLOR;
use crate::sheet::white_note::Clef;
use crate::sheet::SheetMusic;

/// Primitive drawing operations used by symbols and staffs. Coordinates are
/// pixels with y growing downwards.
pub trait Canvas {
    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: &str, width: f64);

    /// Filled rectangle.
    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: &str);

    /// Note head centered on (cx, cy); hollow heads are outlined only.
    fn notehead(&mut self, cx: f64, cy: f64, rx: f64, ry: f64, filled: bool, color: &str);

    /// Text with its baseline at `y`.
    fn text(&mut self, x: f64, y: f64, content: &str, size: f64, color: &str);

    /// Beam from one stem end to another.
    fn beam(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, thickness: f64, color: &str) {
        self.line(x1, y1, x2, y2, color, thickness);
    }

    /// Clef glyph at `x`, for a staff whose top line is at `ytop`.
    fn clef(&mut self, clef: Clef, x: f64, ytop: f64, line_space: f64, small: bool) {
        let size = if small { line_space * 3.0 } else { line_space * 4.0 };
        let label = match clef {
            Clef::Treble => "G",
            Clef::Bass => "F",
        };
        self.text(x, ytop + line_space * 3.0, label, size, NOTE_COLOR);
    }
}

/// Render every staff of `sheet` into an SVG string.
pub fn render_sheet_to_svg(sheet: &SheetMusic) -> String {
    let cfg = sheet.config();
    let width = sheet.width().max(cfg.page_width);
    let mut svg = SvgBuilder::new(width as f64, sheet.height().max(1) as f64);
    svg.background("white");

    let mut y = 0;
    for staff in sheet.staffs() {
        staff.draw(&mut svg, y, cfg);
        y += staff.height();
    }
    svg.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        lines: usize,
        texts: Vec<String>,
    }

    impl Canvas for Recorder {
        fn line(&mut self, _: f64, _: f64, _: f64, _: f64, _: &str, _: f64) {
            self.lines += 1;
        }
        fn rect(&mut self, _: f64, _: f64, _: f64, _: f64, _: &str) {}
        fn notehead(&mut self, _: f64, _: f64, _: f64, _: f64, _: bool, _: &str) {}
        fn text(&mut self, _: f64, _: f64, content: &str, _: f64, _: &str) {
            self.texts.push(content.to_string());
        }
    }

    #[test]
    fn default_methods_fall_back_to_primitives() {
        let mut canvas = Recorder::default();
        canvas.beam(0.0, 0.0, 10.0, 2.0, 3.0, "#000000");
        canvas.clef(Clef::Bass, 0.0, 0.0, 5.0, false);
        assert_eq!(canvas.lines, 1);
        assert_eq!(canvas.texts, vec!["F".to_string()]);
    }
}
