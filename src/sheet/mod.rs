//! Sheet-music layout: from MIDI tracks to positioned staffs of symbols.
//!
//! [`SheetMusic::new`] runs the whole pipeline:
//!
//! 1. option transforms (track selection, rounding, two-staff split, shift, transpose)
//! 2. key resolution (explicit or guessed) and per-measure clefs
//! 3. chord grouping with accidentals and stems
//! 4. bars, rests and clef changes per track
//! 5. cross-track alignment and staff splitting with full justification
//! 6. beaming, lyrics and final staff heights

pub mod beam;
pub mod chord;
pub mod clef;
pub mod config;
pub mod key;
pub mod layout;
pub mod staff;
pub mod stem;
pub mod symbols;
pub mod time;
pub mod white_note;

use log::{debug, info};
use serde::Serialize;

use crate::model::{MidiEvent, MidiNote};
use crate::options::MidiOptions;
use crate::track::{MidiTrack, TrackBuilder};
use crate::transform;

use self::clef::ClefMeasures;
use self::config::SheetConfig;
use self::key::KeySignature;
use self::layout::SymbolWidths;
use self::staff::{ShadeResult, Staff};
use self::symbols::LyricSymbol;
use self::time::TimeSignature;

/// Shading of one staff, with the staff's vertical offset on the sheet
/// and the color to highlight it with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaffShade {
    pub staff: usize,
    pub y: i32,
    pub color: String,
    pub result: ShadeResult,
}

/// Fully laid-out sheet music.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetMusic {
    staffs: Vec<Staff>,
    time: TimeSignature,
    key: KeySignature,
    config: SheetConfig,
    track_count: usize,
    width: i32,
    height: i32,
}

impl SheetMusic {
    /// Lay out `tracks`. `time` is the file's time signature; an explicit
    /// time in `options` takes precedence.
    pub fn new(tracks: &[MidiTrack], time: TimeSignature, options: &MidiOptions) -> Self {
        let time = options.time.unwrap_or(time);
        let tracks = transform::apply_options(tracks, options, &time);

        let key = options.key.unwrap_or_else(|| {
            let all: Vec<MidiNote> = tracks.iter().flat_map(|t| t.notes().iter().copied()).collect();
            KeySignature::guess(&all)
        });
        let cfg = SheetConfig::new(options, key);
        let interval = transform::interval_pulses(options.combine_interval, &time);
        let last_start = tracks.iter().map(MidiTrack::end_time).max().unwrap_or(0);
        info!(
            "laying out {} tracks in {} ({}/{})",
            tracks.len(),
            key.name(),
            time.numerator(),
            time.denominator()
        );

        let mut symbols: Vec<_> = tracks
            .iter()
            .map(|track| {
                let clefs = ClefMeasures::new(track.notes(), time.measure());
                let chords = chord::create_chords(track.notes(), key, &time, &clefs, interval, &cfg);
                debug!("track {}: {} chords", track.number(), chords.len());
                layout::create_symbols(chords, &clefs, &time, last_start, &cfg)
            })
            .collect();

        let lyrics = if cfg.show_lyrics { Self::lyrics(&tracks) } else { None };
        let widths = SymbolWidths::new(&symbols, lyrics.as_deref(), &cfg);
        layout::align_symbols(&mut symbols, &widths, &cfg);

        let mut staffs = layout::create_staffs(symbols, &key, time.measure(), &cfg);
        for staff in &mut staffs {
            beam::create_all_beamed_chords(staff.symbols_mut(), &time);
        }
        if let Some(lyrics) = &lyrics {
            for staff in &mut staffs {
                if let Some(track_lyrics) = lyrics.get(staff.track()) {
                    staff.add_lyrics(track_lyrics, &cfg);
                }
            }
        }
        for staff in &mut staffs {
            staff.calculate_height(&cfg);
        }

        let width = staffs.iter().map(Staff::width).max().unwrap_or(0);
        let height = staffs.iter().map(Staff::height).sum();
        Self {
            staffs,
            time,
            key,
            config: cfg,
            track_count: tracks.len(),
            width,
            height,
        }
    }

    /// Build every track from its raw events, then lay them out.
    pub fn from_events(tracks: &[Vec<MidiEvent>], time: TimeSignature, options: &MidiOptions) -> Self {
        let builder = TrackBuilder::new();
        let tracks: Vec<MidiTrack> = tracks
            .iter()
            .enumerate()
            .map(|(number, events)| builder.build(events, number))
            .collect();
        Self::new(&tracks, time, options)
    }

    /// Lyric symbols per track, or `None` when no track has any.
    fn lyrics(tracks: &[MidiTrack]) -> Option<Vec<Vec<LyricSymbol>>> {
        if tracks.iter().all(|t| t.lyrics().is_empty()) {
            return None;
        }
        Some(
            tracks
                .iter()
                .map(|t| {
                    t.lyrics()
                        .iter()
                        .map(|l| LyricSymbol::new(l.start_time, l.text.clone()))
                        .collect()
                })
                .collect(),
        )
    }

    /// Staffs in display order: one per track for each row of the sheet.
    pub fn staffs(&self) -> &[Staff] {
        &self.staffs
    }

    pub fn time(&self) -> &TimeSignature {
        &self.time
    }

    pub fn key(&self) -> &KeySignature {
        &self.key
    }

    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    /// Number of tracks after the option transforms.
    pub fn track_count(&self) -> usize {
        self.track_count
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Shading of every staff touched by moving playback from `previous`
    /// to `current`.
    pub fn shade_notes(&self, current: u32, previous: Option<u32>) -> Vec<StaffShade> {
        let mut y = 0;
        let mut shades = Vec::new();
        for (index, staff) in self.staffs.iter().enumerate() {
            let result = staff.shade_notes(current, previous);
            if result.x_shade.is_some() || !result.unshade.is_empty() {
                shades.push(StaffShade {
                    staff: index,
                    y,
                    color: self.config.shade_color_for(staff.track()).to_string(),
                    result,
                });
            }
            y += staff.height();
        }
        shades
    }
}
