//! Display options for building a sheet.

use serde::{Deserialize, Serialize};

use crate::error::SheetError;
use crate::sheet::key::KeySignature;
use crate::sheet::time::TimeSignature;

/// What to print next to each notehead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteNameDisplay {
    #[default]
    None,
    /// Spelled letter name, e.g. "F#"
    Letter,
    /// Do Di Re .. Ti, C = Do
    FixedDoReMi,
    /// Do Di Re .. Ti, tonic of the key = Do
    MovableDoReMi,
    /// 1..12, C = 1
    FixedNumber,
    /// 1..12, tonic of the key = 1
    MovableNumber,
}

/// Options collected from the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiOptions {
    /// Which tracks to display; tracks past the end of the list are shown.
    pub tracks: Vec<bool>,
    pub scroll_vert: bool,
    pub large_note_size: bool,
    /// Merge all displayed tracks and split them into a treble and a bass staff.
    pub two_staffs: bool,
    pub show_note_letters: NoteNameDisplay,
    pub show_lyrics: bool,
    pub show_measures: bool,
    /// Pulses added to every note start (may be negative).
    pub shift_time: i32,
    /// Semitones added to every note.
    pub transpose: i32,
    /// Override for the key; guessed from the notes when absent.
    pub key: Option<KeySignature>,
    /// Override for the time signature.
    pub time: Option<TimeSignature>,
    /// Notes starting within this many milliseconds form one chord.
    pub combine_interval: u32,
    /// Twelve colors, one per pitch class starting at C.
    pub colors: Option<Vec<String>>,
    pub shade_color: Option<String>,
    pub shade2_color: Option<String>,
}

impl Default for MidiOptions {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            scroll_vert: true,
            large_note_size: false,
            two_staffs: false,
            show_note_letters: NoteNameDisplay::None,
            show_lyrics: true,
            show_measures: false,
            shift_time: 0,
            transpose: 0,
            key: None,
            time: None,
            combine_interval: 40,
            colors: None,
            shade_color: None,
            shade2_color: None,
        }
    }
}

impl MidiOptions {
    /// Parse options from JSON and validate them. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SheetError> {
        let options: MidiOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), SheetError> {
        if !(-127..=127).contains(&self.transpose) {
            return Err(SheetError::InvalidOption {
                name: "transpose",
                message: format!("{} is outside -127..=127", self.transpose),
            });
        }
        if self.combine_interval > 10_000 {
            return Err(SheetError::InvalidOption {
                name: "combine_interval",
                message: format!("{} ms is longer than ten seconds", self.combine_interval),
            });
        }
        if let Some(colors) = &self.colors {
            if colors.len() != 12 {
                return Err(SheetError::InvalidOption {
                    name: "colors",
                    message: format!("expected 12 colors, got {}", colors.len()),
                });
            }
        }
        Ok(())
    }

    /// Whether track `index` is displayed.
    pub fn shows_track(&self, index: usize) -> bool {
        self.tracks.get(index).copied().unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let options = MidiOptions::from_json(r#"{"transpose": 2, "show_note_letters": "movable_do_re_mi"}"#).unwrap();
        assert_eq!(options.transpose, 2);
        assert_eq!(options.show_note_letters, NoteNameDisplay::MovableDoReMi);
        assert_eq!(options.combine_interval, 40);
        assert!(options.scroll_vert);
    }

    #[test]
    fn rejects_short_color_list() {
        let err = MidiOptions::from_json(r##"{"colors": ["#ff0000"]}"##).unwrap_err();
        assert!(matches!(err, SheetError::InvalidOption { name: "colors", .. }));
    }

    #[test]
    fn key_override_is_validated() {
        assert!(MidiOptions::from_json(r#"{"key": 9}"#).is_err());
        let options = MidiOptions::from_json(r#"{"key": -3}"#).unwrap();
        assert_eq!(options.key.map(|k| k.flats()), Some(3));
    }

    #[test]
    fn unlisted_tracks_are_shown() {
        let options = MidiOptions { tracks: vec![false], ..Default::default() };
        assert!(!options.shows_track(0));
        assert!(options.shows_track(1));
    }
}
