//! Per-measure clef assignment for a track.

use log::trace;

use super::white_note::Clef;
use crate::model::MidiNote;

/// Pitches at or above middle C count towards the treble clef.
const TREBLE_THRESHOLD: u8 = 60;

/// The clef used in each measure of a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClefMeasures {
    clefs: Vec<Clef>,
    measure: u32,
}

/// Majority rule: treble unless more notes lie below middle C. Ties favor treble.
fn majority_clef<'a>(notes: impl IntoIterator<Item = &'a MidiNote>) -> Option<Clef> {
    let (mut high, mut low) = (0usize, 0usize);
    for note in notes {
        if note.number() >= TREBLE_THRESHOLD {
            high += 1;
        } else {
            low += 1;
        }
    }
    match (high, low) {
        (0, 0) => None,
        (h, l) if h >= l => Some(Clef::Treble),
        _ => Some(Clef::Bass),
    }
}

impl ClefMeasures {
    /// `notes` must be ordered by start time; `measure` is the measure length in pulses.
    pub fn new(notes: &[MidiNote], measure: u32) -> Self {
        let measure = measure.max(1);
        let main = majority_clef(notes).unwrap_or(Clef::Treble);

        let mut clefs = Vec::new();
        let mut clef = main;
        let mut pos = 0;
        let mut next_measure = u64::from(measure);
        while pos < notes.len() {
            let start = pos;
            while pos < notes.len() && u64::from(notes[pos].start_time()) < next_measure {
                pos += 1;
            }
            // an empty measure keeps the previous clef
            if let Some(found) = majority_clef(&notes[start..pos]) {
                clef = found;
            }
            trace!("measure {}: {:?}", clefs.len(), clef);
            clefs.push(clef);
            next_measure += u64::from(measure);
        }
        clefs.push(clef);

        Self { clefs, measure }
    }

    /// Clef in force at `start_time`. Times past the last note use the last clef.
    pub fn clef_at(&self, start_time: u32) -> Clef {
        let index = (start_time / self.measure) as usize;
        self.clefs
            .get(index)
            .or_else(|| self.clefs.last())
            .copied()
            .unwrap_or(Clef::Treble)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(start: u32, pitch: u8) -> MidiNote {
        MidiNote::new(start, 0, pitch, 100).unwrap()
    }

    #[test]
    fn majority_per_measure() {
        let notes = vec![note(0, 72), note(100, 40), note(1920, 40), note(2000, 45), note(2100, 64)];
        let clefs = ClefMeasures::new(&notes, 1920);
        assert_eq!(clefs.clef_at(0), Clef::Treble);
        assert_eq!(clefs.clef_at(1920), Clef::Bass);
        assert_eq!(clefs.clef_at(100_000), Clef::Bass);
    }

    #[test]
    fn empty_measure_keeps_previous_clef() {
        let notes = vec![note(0, 40), note(3840, 40)];
        let clefs = ClefMeasures::new(&notes, 1920);
        assert_eq!(clefs.clef_at(1920), Clef::Bass);
    }

    #[test]
    fn empty_track_is_treble() {
        assert_eq!(ClefMeasures::new(&[], 1920).clef_at(0), Clef::Treble);
    }
}
