//! Read-only layout metrics and display settings.
//!
//! A `SheetConfig` is built once per sheet from the options and the resolved
//! key, then borrowed by every width, height and draw computation.

use serde::Serialize;

use super::key::KeySignature;
use crate::options::{MidiOptions, NoteNameDisplay};

// ── Metrics (pixels) ────────────────────────────────────────────────
pub const LINE_WIDTH: i32 = 1;
pub const LINE_SPACE_SMALL: i32 = 5;
pub const LINE_SPACE_LARGE: i32 = 7;
pub const PAGE_WIDTH: i32 = 800;
pub const LEFT_MARGIN: i32 = 4;

// ── Colors ──────────────────────────────────────────────────────────
pub const NOTE_COLOR: &str = "#000000";
pub const STAFF_COLOR: &str = "#000000";
pub const MEASURE_NUMBER_COLOR: &str = "#00008b";
pub const DEFAULT_SHADE: &str = "#d2d2d2";
pub const DEFAULT_SHADE2: &str = "#50d250";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetConfig {
    pub line_width: i32,
    pub line_space: i32,
    pub note_height: i32,
    pub note_width: i32,
    pub page_width: i32,
    pub left_margin: i32,
    pub scroll_vert: bool,
    pub show_note_letters: NoteNameDisplay,
    pub show_lyrics: bool,
    pub show_measures: bool,
    /// Track 1 is the bass (left hand) staff.
    pub two_staffs: bool,
    pub key: KeySignature,
    /// One color per pitch class (C = 0); `None` draws every note black.
    pub note_colors: Option<Vec<String>>,
    pub shade_color: String,
    pub shade2_color: String,
}

impl SheetConfig {
    pub fn new(options: &MidiOptions, key: KeySignature) -> Self {
        let line_space = if options.large_note_size {
            LINE_SPACE_LARGE
        } else {
            LINE_SPACE_SMALL
        };
        let note_height = line_space + LINE_WIDTH;

        Self {
            line_width: LINE_WIDTH,
            line_space,
            note_height,
            note_width: 3 * line_space / 2,
            page_width: PAGE_WIDTH,
            left_margin: LEFT_MARGIN,
            scroll_vert: options.scroll_vert,
            show_note_letters: options.show_note_letters,
            show_lyrics: options.show_lyrics,
            show_measures: options.show_measures,
            two_staffs: options.two_staffs,
            key,
            note_colors: options.colors.clone(),
            shade_color: options
                .shade_color
                .clone()
                .unwrap_or_else(|| DEFAULT_SHADE.to_string()),
            shade2_color: options
                .shade2_color
                .clone()
                .unwrap_or_else(|| DEFAULT_SHADE2.to_string()),
        }
    }

    /// Highlight color for the staffs of `track`: the bass staff of a
    /// two-staff sheet uses the second shade.
    pub fn shade_color_for(&self, track: usize) -> &str {
        if self.two_staffs && track == 1 {
            &self.shade2_color
        } else {
            &self.shade_color
        }
    }

    /// Color for a MIDI note number.
    pub fn note_color(&self, number: u8) -> &str {
        self.note_colors
            .as_ref()
            .and_then(|colors| colors.get((number % 12) as usize))
            .map(String::as_str)
            .unwrap_or(NOTE_COLOR)
    }
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self::new(&MidiOptions::default(), KeySignature::default())
    }
}
