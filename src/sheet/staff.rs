//! One horizontal line of music for one track.

use log::debug;
use serde::Serialize;

use super::config::{SheetConfig, MEASURE_NUMBER_COLOR, NOTE_COLOR, STAFF_COLOR};
use super::key::KeySignature;
use super::symbols::{AccidSymbol, ClefSymbol, LyricSymbol, MusicSymbol, Symbol, LYRIC_FONT_SIZE};
use super::white_note::Clef;
use crate::renderer::Canvas;

/// A horizontal range of a staff, in pixels from the staff's left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShadeSpan {
    pub x: i32,
    pub width: i32,
    pub start_time: u32,
}

/// Result of [`Staff::shade_notes`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShadeResult {
    /// Symbols sounding at the current time
    pub shade: Vec<ShadeSpan>,
    /// Symbols that were sounding at the previous time and no longer are
    pub unshade: Vec<ShadeSpan>,
    /// Left edge of the current position, for scrolling
    pub x_shade: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Staff {
    symbols: Vec<Symbol>,
    lyrics: Vec<LyricSymbol>,
    ytop: i32,
    clef_symbol: ClefSymbol,
    keys: Vec<AccidSymbol>,
    show_measures: bool,
    keysig_width: i32,
    width: i32,
    height: i32,
    track: usize,
    total_tracks: usize,
    start_time: u32,
    end_time: u32,
    /// End time was extended to the next staff's start, which that staff owns.
    continued: bool,
    measure_length: u32,
}

/// Width of the clef and key signature block at the start of every staff.
pub fn keysig_width(key: &KeySignature, cfg: &SheetConfig) -> i32 {
    let clef = ClefSymbol::new(Clef::Treble, 0, false, cfg);
    let accids: i32 = key
        .symbols(Clef::Treble)
        .iter()
        .map(|a| a.min_width(cfg))
        .sum();
    clef.min_width(cfg) + accids + cfg.left_margin + 5
}

impl Staff {
    /// Lay out `symbols` as one staff. In vertical-scroll mode the staff is
    /// stretched to the page width.
    pub fn new(
        symbols: Vec<Symbol>,
        key: &KeySignature,
        cfg: &SheetConfig,
        track: usize,
        total_tracks: usize,
        measure_length: u32,
    ) -> Self {
        let clef = Self::find_clef(&symbols);
        let mut staff = Self {
            symbols,
            lyrics: Vec::new(),
            ytop: 0,
            clef_symbol: ClefSymbol::new(clef, 0, false, cfg),
            keys: key.symbols(clef),
            show_measures: cfg.show_measures && track == 0,
            keysig_width: keysig_width(key, cfg),
            width: 0,
            height: 0,
            track,
            total_tracks,
            start_time: 0,
            end_time: 0,
            continued: false,
            measure_length: measure_length.max(1),
        };
        staff.calculate_width(cfg.scroll_vert, cfg);
        staff.calculate_height(cfg);
        staff.calculate_start_end_time();
        if cfg.scroll_vert {
            staff.full_justify(cfg.page_width);
        }
        staff
    }

    /// Clef of the first chord, treble if there is none.
    fn find_clef(symbols: &[Symbol]) -> Clef {
        symbols
            .iter()
            .find_map(|s| s.as_chord())
            .map_or(Clef::Treble, |c| c.clef())
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub(crate) fn symbols_mut(&mut self) -> &mut [Symbol] {
        &mut self.symbols
    }

    pub fn lyrics(&self) -> &[LyricSymbol] {
        &self.lyrics
    }

    pub fn clef(&self) -> Clef {
        self.clef_symbol.clef()
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Y of the top staff line, relative to the top of the staff area.
    pub fn ytop(&self) -> i32 {
        self.ytop
    }

    pub fn track(&self) -> usize {
        self.track
    }

    pub fn start_time(&self) -> u32 {
        self.start_time
    }

    pub fn end_time(&self) -> u32 {
        self.end_time
    }

    /// Extend the end to the start of the track's next staff, so playback
    /// times between the two staffs still fall on one of them.
    pub(crate) fn continue_at(&mut self, next_start: u32) {
        self.end_time = next_start;
        self.continued = true;
    }

    pub fn keysig_width(&self) -> i32 {
        self.keysig_width
    }

    pub fn measure_length(&self) -> u32 {
        self.measure_length
    }

    /// Key-signature block plus every symbol's current width.
    pub fn content_width(&self) -> i32 {
        self.keysig_width + self.symbols.iter().map(|s| s.width()).sum::<i32>()
    }

    /// Height from the tallest symbol above and below the staff.
    pub fn calculate_height(&mut self, cfg: &SheetConfig) {
        let nh = cfg.note_height;
        let mut above = self.clef_symbol.above_staff(cfg);
        let mut below = self.clef_symbol.below_staff(cfg);
        for symbol in &self.symbols {
            above = above.max(symbol.above_staff(cfg));
            below = below.max(symbol.below_staff(cfg));
        }
        if self.show_measures {
            above = above.max(nh * 3);
        }
        self.ytop = above + nh;
        self.height = nh * 5 + self.ytop + below;
        if !self.lyrics.is_empty() {
            self.height += nh * 3 / 2;
        }
        // extra room between the last track and the first one of the next row
        if self.track + 1 == self.total_tracks {
            self.height += nh * 3;
        }
    }

    /// Page width when scrolling vertically, otherwise the sum of the widths.
    /// An empty staff has zero width.
    pub fn calculate_width(&mut self, scroll_vert: bool, cfg: &SheetConfig) {
        self.width = if self.symbols.is_empty() {
            0
        } else if scroll_vert {
            cfg.page_width
        } else {
            self.content_width()
        };
    }

    /// First symbol start and last symbol end; (0, 0) for an empty staff.
    pub fn calculate_start_end_time(&mut self) {
        self.start_time = self.symbols.iter().map(|s| s.start_time()).min().unwrap_or(0);
        self.end_time = self
            .symbols
            .iter()
            .map(|s| s.end_time())
            .max()
            .unwrap_or(0)
            .max(self.start_time);
    }

    /// Widen symbols so the staff fills exactly `target` pixels.
    ///
    /// The slack goes to the first symbol of each start time, in proportion
    /// to how long that time lasts; the rounding remainder is handed out one
    /// pixel per column from the left. Does nothing if there is no slack.
    pub fn full_justify(&mut self, target: i32) {
        let slack = target - self.content_width();
        if self.symbols.is_empty() || slack <= 0 {
            return;
        }

        // (index receiving the extra width, start time) per column;
        // the first non-bar symbol of the column, else its first symbol
        let mut columns: Vec<(usize, u32)> = Vec::new();
        for (i, symbol) in self.symbols.iter().enumerate() {
            let start = symbol.start_time();
            match columns.last_mut() {
                Some((index, s)) if *s == start => {
                    if self.symbols[*index].is_bar() && !symbol.is_bar() {
                        *index = i;
                    }
                }
                _ => columns.push((i, start)),
            }
        }

        let durations: Vec<i64> = columns
            .iter()
            .enumerate()
            .map(|(c, &(_, start))| {
                let next = columns.get(c + 1).map_or(self.end_time, |&(_, s)| s);
                next.saturating_sub(start).max(1) as i64
            })
            .collect();
        let total: i64 = durations.iter().sum();

        let mut extras: Vec<i64> = durations.iter().map(|d| slack as i64 * d / total).collect();
        let remainder = slack as i64 - extras.iter().sum::<i64>();
        for extra in extras.iter_mut().take(remainder.max(0) as usize) {
            *extra += 1;
        }

        for (&(index, _), extra) in columns.iter().zip(extras) {
            let symbol = &mut self.symbols[index];
            symbol.set_width(symbol.width() + extra as i32);
        }
        self.width = target;
        debug!(
            "track {}: justified {} columns, slack {}",
            self.track,
            columns.len(),
            slack
        );
    }

    /// Attach the lyrics falling inside this staff's time range, setting
    /// each one's x position from the symbol widths. A lyric at the start
    /// of the next staff belongs to that staff.
    pub fn add_lyrics(&mut self, track_lyrics: &[LyricSymbol], cfg: &SheetConfig) {
        let mut lyrics = Vec::new();
        let mut xpos = 0;
        let mut index = 0;
        for lyric in track_lyrics {
            if lyric.start_time < self.start_time {
                continue;
            }
            let past_end = if self.continued {
                lyric.start_time >= self.end_time
            } else {
                lyric.start_time > self.end_time
            };
            if past_end {
                break;
            }
            while index < self.symbols.len() && self.symbols[index].start_time() < lyric.start_time {
                xpos += self.symbols[index].width();
                index += 1;
            }
            let mut placed = lyric.clone();
            placed.x = xpos;
            if self.symbols.get(index).map_or(false, |s| s.is_bar()) {
                placed.x += cfg.note_width;
            }
            lyrics.push(placed);
        }
        self.lyrics = lyrics;
    }

    /// (x, measure number) of every bar line; x is relative to the staff.
    pub fn measure_numbers(&self) -> Vec<(i32, u32)> {
        let mut xpos = self.keysig_width;
        let mut numbers = Vec::new();
        for symbol in &self.symbols {
            if symbol.is_bar() {
                numbers.push((xpos, 1 + symbol.start_time() / self.measure_length));
            }
            xpos += symbol.width();
        }
        numbers
    }

    /// Which symbols to highlight at `current` and which to clear from
    /// `previous`. A symbol covers its start time up to the next symbol's
    /// start (skipping a bar line). Pure query, nothing is redrawn.
    pub fn shade_notes(&self, current: u32, previous: Option<u32>) -> ShadeResult {
        let mut result = ShadeResult::default();
        let in_staff = |t: u32| self.start_time <= t && t <= self.end_time;
        if !in_staff(current) && !previous.map_or(false, in_staff) {
            return result;
        }

        let mut xpos = self.keysig_width;
        for (i, symbol) in self.symbols.iter().enumerate() {
            let start = symbol.start_time();
            let end = match (self.symbols.get(i + 1), self.symbols.get(i + 2)) {
                (Some(next), Some(after)) if next.is_bar() => after.start_time(),
                (Some(next), _) => next.start_time(),
                _ => self.end_time,
            };
            let holds = |t: u32| start <= t && t < end;
            let span = ShadeSpan {
                x: xpos,
                width: symbol.width(),
                start_time: start,
            };

            if previous.map_or(true, |p| start > p) && start > current {
                result.x_shade.get_or_insert(xpos);
                return result;
            }
            let held_before = previous.map_or(false, holds);
            if holds(current) && held_before {
                result.x_shade = Some(xpos);
                return result;
            }
            if held_before {
                result.unshade.push(span);
            }
            if holds(current) {
                result.x_shade = Some(xpos);
                result.shade.push(span);
            }
            xpos += symbol.width();
        }
        result
    }

    /// Draw the staff with its top edge at `y`.
    pub fn draw(&self, canvas: &mut dyn Canvas, y: i32, cfg: &SheetConfig) {
        let ytop = y + self.ytop;
        let mut xpos = cfg.left_margin + 5;

        self.clef_symbol.draw(canvas, xpos, ytop, cfg);
        xpos += self.clef_symbol.width();
        for key in &self.keys {
            key.draw(canvas, xpos, ytop, cfg);
            xpos += key.min_width(cfg);
        }
        for symbol in &self.symbols {
            symbol.draw(canvas, xpos, ytop, cfg);
            xpos += symbol.width();
        }

        self.draw_horiz_lines(canvas, ytop, cfg);
        self.draw_end_lines(canvas, y, ytop, cfg);
        if self.show_measures {
            for (x, number) in self.measure_numbers() {
                let x = (x + cfg.note_width / 2) as f64;
                let ynum = (ytop - cfg.note_height * 2) as f64;
                canvas.text(x, ynum, &number.to_string(), LYRIC_FONT_SIZE - 2.0, MEASURE_NUMBER_COLOR);
            }
        }
        let ylyric = (y + self.height - cfg.note_height * 2) as f64;
        for lyric in &self.lyrics {
            let x = (self.keysig_width + lyric.x) as f64;
            canvas.text(x, ylyric, &lyric.text, LYRIC_FONT_SIZE, NOTE_COLOR);
        }
    }

    fn draw_horiz_lines(&self, canvas: &mut dyn Canvas, ytop: i32, cfg: &SheetConfig) {
        let mut yline = ytop - cfg.line_width;
        let (x1, x2) = (cfg.left_margin as f64, (self.width - 1) as f64);
        for _ in 0..5 {
            canvas.line(x1, yline as f64, x2, yline as f64, STAFF_COLOR, cfg.line_width as f64);
            yline += cfg.line_width + cfg.line_space;
        }
    }

    fn draw_end_lines(&self, canvas: &mut dyn Canvas, y: i32, ytop: i32, cfg: &SheetConfig) {
        let ystart = if self.track == 0 { ytop - cfg.line_width } else { y };
        let yend = if self.track + 1 == self.total_tracks {
            ytop + 4 * cfg.note_height
        } else {
            y + self.height
        };
        for x in [cfg.left_margin, self.width - 1] {
            canvas.line(x as f64, ystart as f64, x as f64, yend as f64, STAFF_COLOR, cfg.line_width as f64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::symbols::{BarSymbol, BlankSymbol};

    fn bars(times: &[u32], cfg: &SheetConfig) -> Vec<Symbol> {
        times.iter().map(|&t| Symbol::Bar(BarSymbol::new(t, cfg))).collect()
    }

    #[test]
    fn empty_staff_has_no_width_or_time() {
        let cfg = SheetConfig::default();
        let staff = Staff::new(Vec::new(), &KeySignature::default(), &cfg, 0, 1, 1920);
        assert_eq!(staff.width(), 0);
        assert_eq!((staff.start_time(), staff.end_time()), (0, 0));
        assert!(staff.height() >= cfg.note_height * 5);
    }

    #[test]
    fn justify_weights_by_duration() {
        let cfg = SheetConfig { scroll_vert: false, ..SheetConfig::default() };
        let symbols = vec![
            Symbol::Bar(BarSymbol::new(0, &cfg)),
            Symbol::Blank(BlankSymbol::new(0, 10)),
            Symbol::Blank(BlankSymbol::new(300, 10)),
            Symbol::Bar(BarSymbol::new(400, &cfg)),
        ];
        let mut staff = Staff::new(symbols, &KeySignature::default(), &cfg, 0, 1, 400);
        let before = staff.content_width();
        staff.full_justify(before + 41);
        assert_eq!(staff.content_width(), before + 41);
        let widths: Vec<i32> = staff.symbols().iter().map(|s| s.width()).collect();
        // 300 : 100 : 1 pulses, bars keep their width
        assert_eq!(widths, vec![10, 10 + 31, 10 + 10, 10]);
    }

    #[test]
    fn negative_slack_leaves_widths_alone() {
        let cfg = SheetConfig { scroll_vert: false, ..SheetConfig::default() };
        let mut staff = Staff::new(bars(&[0, 1920], &cfg), &KeySignature::default(), &cfg, 0, 1, 1920);
        let before = staff.content_width();
        staff.full_justify(before - 5);
        assert_eq!(staff.content_width(), before);
    }

    #[test]
    fn continued_staff_leaves_boundary_lyric_to_next() {
        let cfg = SheetConfig { scroll_vert: false, ..SheetConfig::default() };
        let lyrics = vec![LyricSymbol::new(0, "a"), LyricSymbol::new(1920, "b")];

        let mut staff = Staff::new(bars(&[0, 1920], &cfg), &KeySignature::default(), &cfg, 0, 1, 1920);
        staff.add_lyrics(&lyrics, &cfg);
        assert_eq!(staff.lyrics().len(), 2);

        staff.continue_at(1920);
        staff.add_lyrics(&lyrics, &cfg);
        let texts: Vec<&str> = staff.lyrics().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["a"]);
    }

    #[test]
    fn measure_numbers_count_from_one() {
        let cfg = SheetConfig { scroll_vert: false, ..SheetConfig::default() };
        let staff = Staff::new(bars(&[1920, 3840], &cfg), &KeySignature::default(), &cfg, 0, 1, 1920);
        let numbers: Vec<u32> = staff.measure_numbers().iter().map(|&(_, n)| n).collect();
        assert_eq!(numbers, vec![2, 3]);
    }

    #[test]
    fn shading_moves_between_symbols() {
        let cfg = SheetConfig { scroll_vert: false, ..SheetConfig::default() };
        let symbols = vec![
            Symbol::Blank(BlankSymbol::new(0, 20)),
            Symbol::Blank(BlankSymbol::new(480, 20)),
            Symbol::Blank(BlankSymbol::new(960, 20)),
        ];
        let staff = Staff::new(symbols, &KeySignature::default(), &cfg, 0, 1, 1920);
        let result = staff.shade_notes(500, Some(100));
        let kw = staff.keysig_width();
        assert_eq!(result.unshade.iter().map(|s| s.x).collect::<Vec<_>>(), vec![kw]);
        assert_eq!(result.shade.iter().map(|s| s.x).collect::<Vec<_>>(), vec![kw + 20]);
        assert_eq!(result.x_shade, Some(kw + 20));
    }
}
