//! Time signature, measure length and note-duration classification.

use serde::{Deserialize, Serialize};

use crate::error::SheetError;

/// Default tempo: 500 000 µs per quarter note (120 bpm).
pub const DEFAULT_TEMPO: u32 = 500_000;

/// Largest pulses-per-quarter a MIDI header can carry (15 bits).
pub const MAX_QUARTER: u32 = 0x7FFF;

/// Display duration of a note, shortest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NoteDuration {
    ThirtySecond,
    Sixteenth,
    Triplet,
    Eighth,
    DottedEighth,
    Quarter,
    DottedQuarter,
    Half,
    DottedHalf,
    Whole,
}

impl NoteDuration {
    pub fn is_dotted(self) -> bool {
        matches!(
            self,
            NoteDuration::DottedEighth | NoteDuration::DottedQuarter | NoteDuration::DottedHalf
        )
    }

    /// Drawn with a hollow notehead.
    pub fn is_hollow(self) -> bool {
        matches!(
            self,
            NoteDuration::Half | NoteDuration::DottedHalf | NoteDuration::Whole
        )
    }

    /// Durations whose stem carries a flag or beam.
    pub fn is_flagged(self) -> bool {
        self < NoteDuration::Quarter
    }

    /// Number of flags / beam lines.
    pub fn flag_count(self) -> u32 {
        match self {
            NoteDuration::ThirtySecond => 3,
            NoteDuration::Sixteenth => 2,
            NoteDuration::Triplet | NoteDuration::Eighth | NoteDuration::DottedEighth => 1,
            _ => 0,
        }
    }
}

/// Numerator/denominator, pulses per quarter note and tempo.
///
/// `measure` is derived in the constructor and always equals
/// `numerator * pulses-per-beat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSignature {
    numerator: u32,
    denominator: u32,
    quarter: u32,
    measure: u32,
    tempo: u32,
}

#[derive(Deserialize)]
struct RawTimeSignature {
    numerator: u32,
    denominator: u32,
    quarter: u32,
    #[serde(default = "default_tempo")]
    tempo: u32,
}

fn default_tempo() -> u32 {
    DEFAULT_TEMPO
}

impl<'de> Deserialize<'de> for TimeSignature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawTimeSignature::deserialize(deserializer)?;
        TimeSignature::new(raw.numerator, raw.denominator, raw.quarter, raw.tempo)
            .map_err(serde::de::Error::custom)
    }
}

impl TimeSignature {
    /// Validate and build a time signature. `tempo` is microseconds per quarter note.
    pub fn new(numerator: u32, denominator: u32, quarter: u32, tempo: u32) -> Result<Self, SheetError> {
        let invalid = |message: &str| SheetError::InvalidTimeSignature {
            numerator,
            denominator,
            quarter,
            message: message.to_string(),
        };
        if numerator == 0 {
            return Err(invalid("numerator must be positive"));
        }
        if denominator == 0 || !denominator.is_power_of_two() {
            return Err(invalid("denominator must be a power of two"));
        }
        if quarter == 0 || quarter > MAX_QUARTER {
            return Err(invalid("pulses per quarter note must be in 1..=32767"));
        }
        if tempo == 0 {
            return Err(invalid("tempo must be positive"));
        }

        let beat = if denominator < 4 {
            quarter * 2
        } else {
            (quarter / (denominator / 4)).max(1)
        };

        let measure = numerator
            .checked_mul(beat)
            .ok_or_else(|| invalid("measure length does not fit in 32 bits"))?;

        Ok(Self {
            numerator,
            denominator,
            quarter,
            measure,
            tempo,
        })
    }

    /// 4/4 at the default tempo.
    pub fn common(quarter: u32) -> Result<Self, SheetError> {
        Self::new(4, 4, quarter, DEFAULT_TEMPO)
    }

    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    /// Pulses per quarter note.
    pub fn quarter(&self) -> u32 {
        self.quarter
    }

    /// Pulses per measure.
    pub fn measure(&self) -> u32 {
        self.measure
    }

    /// Microseconds per quarter note.
    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    /// Zero-based measure index of a pulse time.
    pub fn measure_of(&self, time: u32) -> u32 {
        time / self.measure
    }

    /// Classify a duration in pulses.
    pub fn note_duration(&self, duration: u32) -> NoteDuration {
        let whole = self.quarter * 4;

        if duration >= 28 * whole / 32 {
            NoteDuration::Whole
        } else if duration >= 20 * whole / 32 {
            NoteDuration::DottedHalf
        } else if duration >= 14 * whole / 32 {
            NoteDuration::Half
        } else if duration >= 10 * whole / 32 {
            NoteDuration::DottedQuarter
        } else if duration >= 7 * whole / 32 {
            NoteDuration::Quarter
        } else if duration >= 5 * whole / 32 {
            NoteDuration::DottedEighth
        } else if duration >= 6 * whole / 64 {
            NoteDuration::Eighth
        } else if duration >= 5 * whole / 64 {
            NoteDuration::Triplet
        } else if duration >= 3 * whole / 64 {
            NoteDuration::Sixteenth
        } else {
            NoteDuration::ThirtySecond
        }
    }

    /// Nominal length in pulses of a display duration.
    pub fn duration_to_time(&self, duration: NoteDuration) -> u32 {
        let eighth = self.quarter / 2;
        let sixteenth = eighth / 2;

        match duration {
            NoteDuration::Whole => self.quarter * 4,
            NoteDuration::DottedHalf => self.quarter * 3,
            NoteDuration::Half => self.quarter * 2,
            NoteDuration::DottedQuarter => eighth * 3,
            NoteDuration::Quarter => self.quarter,
            NoteDuration::DottedEighth => sixteenth * 3,
            NoteDuration::Eighth => eighth,
            NoteDuration::Triplet => self.quarter / 3,
            NoteDuration::Sixteenth => sixteenth,
            NoteDuration::ThirtySecond => sixteenth / 2,
        }
    }
}
