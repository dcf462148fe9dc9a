//! SVG builder: accumulates SVG elements and produces the final string.

use super::Canvas;
use crate::sheet::config::NOTE_COLOR;
use crate::sheet::white_note::Clef;

/// Treble clef (U+1D11E) and bass clef (U+1D122) glyphs.
const TREBLE_GLYPH: &str = "\u{1D11E}";
const BASS_GLYPH: &str = "\u{1D122}";

pub struct SvgBuilder {
    elements: Vec<String>,
    width: f64,
    height: f64,
}

fn escape(content: &str) -> String {
    content
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl SvgBuilder {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            elements: Vec::new(),
            width,
            height,
        }
    }

    /// Fill the whole drawing area.
    pub fn background(&mut self, color: &str) {
        let (w, h) = (self.width, self.height);
        self.rect(0.0, 0.0, w, h, color);
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn build(self) -> String {
        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}" style="font-family: 'Georgia', 'Times New Roman', serif;">"#,
            self.width, self.height, self.width, self.height
        );
        svg.push('\n');
        for el in &self.elements {
            svg.push_str("  ");
            svg.push_str(el);
            svg.push('\n');
        }
        svg.push_str("</svg>\n");
        svg
    }
}

impl Canvas for SvgBuilder {
    fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: &str, width: f64) {
        self.elements.push(format!(
            r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="{:.1}"/>"#,
            x1, y1, x2, y2, color, width
        ));
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: &str) {
        self.elements.push(format!(
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"/>"#,
            x, y, width, height, color
        ));
    }

    fn notehead(&mut self, cx: f64, cy: f64, rx: f64, ry: f64, filled: bool, color: &str) {
        let (fill, stroke, sw) = if filled { (color, "none", 0.0) } else { ("none", color, 1.0) };
        self.elements.push(format!(
            r#"<ellipse cx="{:.1}" cy="{:.1}" rx="{:.1}" ry="{:.1}" fill="{}" stroke="{}" stroke-width="{:.1}" transform="rotate(-15,{:.1},{:.1})"/>"#,
            cx,
            cy,
            rx - sw / 2.0,
            ry - sw / 2.0,
            fill,
            stroke,
            sw,
            cx,
            cy
        ));
    }

    fn text(&mut self, x: f64, y: f64, content: &str, size: f64, color: &str) {
        self.elements.push(format!(
            r#"<text x="{:.1}" y="{:.1}" font-size="{:.0}" fill="{}">{}</text>"#,
            x,
            y,
            size,
            color,
            escape(content)
        ));
    }

    /// Beam drawn as a filled parallelogram so the thickness stays vertical.
    fn beam(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, thickness: f64, color: &str) {
        let half = thickness / 2.0;
        self.elements.push(format!(
            r#"<path d="M{:.1},{:.1} L{:.1},{:.1} L{:.1},{:.1} L{:.1},{:.1} Z" fill="{}"/>"#,
            x1,
            y1 - half,
            x2,
            y2 - half,
            x2,
            y2 + half,
            x1,
            y1 + half,
            color
        ));
    }

    fn clef(&mut self, clef: Clef, x: f64, ytop: f64, line_space: f64, small: bool) {
        let scale = if small { 0.75 } else { 1.0 };
        // glyph origin sits on the G line (treble) or F line (bass)
        let (glyph, size, baseline) = match clef {
            Clef::Treble => (TREBLE_GLYPH, line_space * 8.0, ytop + line_space * 3.0),
            Clef::Bass => (BASS_GLYPH, line_space * 4.0, ytop + line_space),
        };
        self.elements.push(format!(
            r#"<text x="{:.1}" y="{:.1}" font-size="{:.0}" font-family="'Bravura Text', 'Noto Music', serif" fill="{}">{}</text>"#,
            x,
            baseline,
            size * scale,
            NOTE_COLOR,
            glyph
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_escaped() {
        let mut svg = SvgBuilder::new(100.0, 50.0);
        svg.text(0.0, 10.0, "a<b & c", 12.0, "#000000");
        let out = svg.build();
        assert!(out.contains("a&lt;b &amp; c"));
        assert!(out.starts_with("<svg"));
        assert!(out.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn hollow_noteheads_are_outlined() {
        let mut svg = SvgBuilder::new(100.0, 50.0);
        svg.notehead(10.0, 10.0, 4.0, 3.0, false, "#ff0000");
        let out = svg.build();
        assert!(out.contains(r##"fill="none" stroke="#ff0000""##));
    }
}
