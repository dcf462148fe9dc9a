//! Diatonic staff positions.
//!
//! A `WhiteNote` is a letter plus an octave (middle C = C4). Every note on
//! the staff is drawn at the position of a white note; sharps and flats are
//! drawn as accidental symbols next to it.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// The two clefs a staff can be drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clef {
    Treble,
    Bass,
}

/// Note letter, ordered by staff position within an octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    /// Step index within the octave (C = 0 .. B = 6).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Letter {
        Letter::ALL[index % 7]
    }

    /// Semitones above C of the natural (white key) note.
    pub fn semitone(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Letter::C => "C",
            Letter::D => "D",
            Letter::E => "E",
            Letter::F => "F",
            Letter::G => "G",
            Letter::A => "A",
            Letter::B => "B",
        }
    }
}

/// A staff position: letter and octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WhiteNote {
    pub letter: Letter,
    pub octave: i32,
}

impl WhiteNote {
    pub const fn new(letter: Letter, octave: i32) -> Self {
        Self { letter, octave }
    }

    /// Middle C.
    pub const MIDDLE_C: WhiteNote = WhiteNote::new(Letter::C, 4);

    /// Inverse of [`WhiteNote::number`].
    pub fn from_number(number: i32) -> Self {
        Self {
            letter: Letter::from_index(number.rem_euclid(7) as usize),
            octave: number.div_euclid(7),
        }
    }

    /// Linear diatonic index: one step per line or space.
    pub fn number(&self) -> i32 {
        self.octave * 7 + self.letter.index() as i32
    }

    /// Distance in staff steps from `other` up to `self`.
    pub fn dist(&self, other: &WhiteNote) -> i32 {
        self.number() - other.number()
    }

    /// The white note `amount` steps above (or below, when negative).
    pub fn add(&self, amount: i32) -> WhiteNote {
        WhiteNote::from_number(self.number() + amount)
    }

    /// MIDI number of the unaltered note.
    pub fn natural_pitch(&self) -> i32 {
        (self.octave + 1) * 12 + self.letter.semitone()
    }

    /// Top line of the staff.
    pub fn top(clef: Clef) -> WhiteNote {
        match clef {
            Clef::Treble => WhiteNote::new(Letter::E, 5),
            Clef::Bass => WhiteNote::new(Letter::G, 3),
        }
    }

    /// Bottom line of the staff.
    pub fn bottom(clef: Clef) -> WhiteNote {
        match clef {
            Clef::Treble => WhiteNote::new(Letter::F, 4),
            Clef::Bass => WhiteNote::new(Letter::A, 2),
        }
    }

    /// Middle line of the staff.
    pub fn middle(clef: Clef) -> WhiteNote {
        match clef {
            Clef::Treble => WhiteNote::new(Letter::B, 4),
            Clef::Bass => WhiteNote::new(Letter::D, 3),
        }
    }
}

impl Ord for WhiteNote {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number().cmp(&other.number())
    }
}

impl PartialOrd for WhiteNote {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
