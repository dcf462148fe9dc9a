//! Key signatures, pitch spelling and measure-scoped accidentals.

use serde::{Deserialize, Serialize};

use super::symbols::AccidSymbol;
use super::white_note::{Clef, Letter, WhiteNote};
use crate::error::SheetError;
use crate::model::MidiNote;

/// An accidental drawn in front of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accidental {
    Sharp,
    Flat,
    Natural,
}

impl Accidental {
    fn from_alter(alter: i8) -> Accidental {
        match alter {
            a if a > 0 => Accidental::Sharp,
            a if a < 0 => Accidental::Flat,
            _ => Accidental::Natural,
        }
    }
}

/// Order in which sharps are added to a key signature.
const SHARP_ORDER: [Letter; 7] = [
    Letter::F,
    Letter::C,
    Letter::G,
    Letter::D,
    Letter::A,
    Letter::E,
    Letter::B,
];

/// Order in which flats are added to a key signature.
const FLAT_ORDER: [Letter; 7] = [
    Letter::B,
    Letter::E,
    Letter::A,
    Letter::D,
    Letter::G,
    Letter::C,
    Letter::F,
];

/// Pitch-class spelling with sharps: (letter, alteration).
const SHARP_SPELLING: [(Letter, i8); 12] = [
    (Letter::C, 0),
    (Letter::C, 1),
    (Letter::D, 0),
    (Letter::D, 1),
    (Letter::E, 0),
    (Letter::F, 0),
    (Letter::F, 1),
    (Letter::G, 0),
    (Letter::G, 1),
    (Letter::A, 0),
    (Letter::A, 1),
    (Letter::B, 0),
];

/// Pitch-class spelling with flats: (letter, alteration).
const FLAT_SPELLING: [(Letter, i8); 12] = [
    (Letter::C, 0),
    (Letter::D, -1),
    (Letter::D, 0),
    (Letter::E, -1),
    (Letter::E, 0),
    (Letter::F, 0),
    (Letter::G, -1),
    (Letter::G, 0),
    (Letter::A, -1),
    (Letter::A, 0),
    (Letter::B, -1),
    (Letter::B, 0),
];

// Staff positions of the key-signature accidentals, (letter, octave).
const SHARP_POSITIONS_TREBLE: [(Letter, i32); 7] = [
    (Letter::F, 5),
    (Letter::C, 5),
    (Letter::G, 5),
    (Letter::D, 5),
    (Letter::A, 4),
    (Letter::E, 5),
    (Letter::B, 4),
];
const SHARP_POSITIONS_BASS: [(Letter, i32); 7] = [
    (Letter::F, 3),
    (Letter::C, 3),
    (Letter::G, 3),
    (Letter::D, 3),
    (Letter::A, 2),
    (Letter::E, 3),
    (Letter::B, 2),
];
const FLAT_POSITIONS_TREBLE: [(Letter, i32); 7] = [
    (Letter::B, 4),
    (Letter::E, 5),
    (Letter::A, 4),
    (Letter::D, 5),
    (Letter::G, 4),
    (Letter::C, 5),
    (Letter::F, 4),
];
const FLAT_POSITIONS_BASS: [(Letter, i32); 7] = [
    (Letter::B, 2),
    (Letter::E, 3),
    (Letter::A, 2),
    (Letter::D, 3),
    (Letter::G, 2),
    (Letter::C, 3),
    (Letter::F, 2),
];

/// A major/minor key signature, stored as a position on the circle of
/// fifths: positive = sharps, negative = flats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub struct KeySignature {
    fifths: i8,
}

impl TryFrom<i8> for KeySignature {
    type Error = SheetError;

    fn try_from(fifths: i8) -> Result<Self, Self::Error> {
        KeySignature::from_fifths(fifths)
    }
}

impl From<KeySignature> for i8 {
    fn from(key: KeySignature) -> i8 {
        key.fifths
    }
}

impl KeySignature {
    /// A key with the given number of sharps or flats; at most one may be nonzero.
    pub fn new(sharps: u32, flats: u32) -> Result<Self, SheetError> {
        if (sharps > 0 && flats > 0) || sharps > 7 || flats > 7 {
            return Err(SheetError::InvalidKeySignature { sharps, flats });
        }
        Ok(Self {
            fifths: sharps as i8 - flats as i8,
        })
    }

    /// Build from a circle-of-fifths position in -7..=7.
    pub fn from_fifths(fifths: i8) -> Result<Self, SheetError> {
        if !(-7..=7).contains(&fifths) {
            let (sharps, flats) = if fifths > 0 {
                (fifths as u32, 0)
            } else {
                (0, fifths.unsigned_abs() as u32)
            };
            return Err(SheetError::InvalidKeySignature { sharps, flats });
        }
        Ok(Self { fifths })
    }

    pub fn fifths(&self) -> i8 {
        self.fifths
    }

    pub fn sharps(&self) -> u32 {
        self.fifths.max(0) as u32
    }

    pub fn flats(&self) -> u32 {
        (-self.fifths).max(0) as u32
    }

    /// Pitch class (C = 0) of the major tonic, used for movable note names.
    pub fn tonic(&self) -> u8 {
        (self.fifths as i32 * 7).rem_euclid(12) as u8
    }

    /// Alteration the key applies to a letter.
    pub fn default_alter(&self, letter: Letter) -> i8 {
        if self.fifths > 0 {
            if SHARP_ORDER[..self.sharps() as usize].contains(&letter) {
                return 1;
            }
        } else if self.fifths < 0 && FLAT_ORDER[..self.flats() as usize].contains(&letter) {
            return -1;
        }
        0
    }

    /// Staff position and alteration used to write `pitch` in this key.
    pub fn spell(&self, pitch: u8) -> (WhiteNote, i8) {
        let class = (pitch % 12) as usize;
        let mut octave = pitch as i32 / 12 - 1;

        let (letter, alter) = if self.fifths >= 0 {
            match class {
                5 if self.sharps() >= 6 => (Letter::E, 1),
                0 if self.sharps() == 7 => {
                    octave -= 1;
                    (Letter::B, 1)
                }
                _ => SHARP_SPELLING[class],
            }
        } else {
            match class {
                11 if self.flats() >= 6 => {
                    octave += 1;
                    (Letter::C, -1)
                }
                4 if self.flats() == 7 => (Letter::F, -1),
                _ => FLAT_SPELLING[class],
            }
        };
        (WhiteNote::new(letter, octave), alter)
    }

    /// Staff position only.
    pub fn white_note(&self, pitch: u8) -> WhiteNote {
        self.spell(pitch).0
    }

    /// Accidental symbols of the key signature itself, in drawing order.
    pub fn symbols(&self, clef: Clef) -> Vec<AccidSymbol> {
        let (positions, count, accid) = match (self.fifths >= 0, clef) {
            (true, Clef::Treble) => (&SHARP_POSITIONS_TREBLE, self.sharps(), Accidental::Sharp),
            (true, Clef::Bass) => (&SHARP_POSITIONS_BASS, self.sharps(), Accidental::Sharp),
            (false, Clef::Treble) => (&FLAT_POSITIONS_TREBLE, self.flats(), Accidental::Flat),
            (false, Clef::Bass) => (&FLAT_POSITIONS_BASS, self.flats(), Accidental::Flat),
        };
        positions[..count as usize]
            .iter()
            .map(|&(letter, octave)| AccidSymbol::new(accid, WhiteNote::new(letter, octave), clef))
            .collect()
    }

    /// Number of notes that would need an accidental in this key.
    fn accidental_count(&self, class_counts: &[usize; 12]) -> usize {
        class_counts
            .iter()
            .enumerate()
            .filter(|&(class, _)| {
                let (white, alter) = self.spell(class as u8 + 60);
                alter != self.default_alter(white.letter)
            })
            .map(|(_, count)| *count)
            .sum()
    }

    /// Pick the key that needs the fewest accidentals for `notes`.
    /// Ties prefer fewer sharps/flats, and sharps before flats.
    pub fn guess(notes: &[MidiNote]) -> KeySignature {
        let mut class_counts = [0usize; 12];
        for note in notes {
            class_counts[(note.number() % 12) as usize] += 1;
        }

        let mut best = KeySignature::default();
        let mut best_count = best.accidental_count(&class_counts);
        for n in 1..=7i8 {
            for fifths in [n, -n] {
                let key = KeySignature { fifths };
                let count = key.accidental_count(&class_counts);
                if count < best_count {
                    best = key;
                    best_count = count;
                }
            }
        }
        best
    }

    /// Display name of the major key, e.g. "D major", "Bb major".
    pub fn name(&self) -> String {
        let (white, alter) = self.spell(60 + self.tonic());
        let suffix = match alter {
            1 => "#",
            -1 => "b",
            _ => "",
        };
        format!("{}{} major", white.letter.name(), suffix)
    }
}

/// Tracks which alteration is in force for each letter within the current
/// measure. Built per track; reset whenever the measure number changes.
#[derive(Debug, Clone)]
pub struct AccidentalTracker {
    key: KeySignature,
    state: [i8; 7],
    measure: Option<u32>,
}

impl AccidentalTracker {
    pub fn new(key: KeySignature) -> Self {
        let mut tracker = Self {
            key,
            state: [0; 7],
            measure: None,
        };
        tracker.reset();
        tracker
    }

    pub fn key(&self) -> &KeySignature {
        &self.key
    }

    fn reset(&mut self) {
        for letter in Letter::ALL {
            self.state[letter.index()] = self.key.default_alter(letter);
        }
    }

    /// Accidental to draw for `pitch` in `measure`, if any, and remember it
    /// for the rest of the measure.
    pub fn accidental(&mut self, pitch: u8, measure: u32) -> Option<Accidental> {
        if self.measure != Some(measure) {
            self.reset();
            self.measure = Some(measure);
        }

        let (white, alter) = self.key.spell(pitch);
        let slot = &mut self.state[white.letter.index()];
        if *slot == alter {
            return None;
        }
        *slot = alter;
        Some(Accidental::from_alter(alter))
    }
}
