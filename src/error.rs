//! Error types for midisheet.
//!
//! Only validated constructors and the JSON entry points fail. The layout
//! pipeline itself never does: malformed MIDI degrades to a best-effort
//! sheet instead of an error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetError {
    /// A time signature with a zero field or a denominator that is not a power of two.
    #[error("Invalid time signature {numerator}/{denominator} (quarter = {quarter}): {message}")]
    InvalidTimeSignature {
        numerator: u32,
        denominator: u32,
        quarter: u32,
        message: String,
    },

    /// A key signature with both sharps and flats, or more than seven of either.
    #[error("Invalid key signature ({sharps} sharps, {flats} flats)")]
    InvalidKeySignature { sharps: u32, flats: u32 },

    /// A MIDI note number outside 0..=127.
    #[error("Invalid note number {0}, expected 0..=127")]
    InvalidNote(u32),

    #[error("Invalid option `{name}`: {message}")]
    InvalidOption { name: &'static str, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
