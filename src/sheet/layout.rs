//! Turning each track's chords into a symbol stream and breaking the
//! streams into vertically aligned staffs.

use std::collections::BTreeMap;

use log::{debug, trace};

use super::chord::ChordSymbol;
use super::clef::ClefMeasures;
use super::config::SheetConfig;
use super::key::KeySignature;
use super::staff::{keysig_width, Staff};
use super::symbols::{
    BarSymbol, BlankSymbol, ClefSymbol, LyricSymbol, MusicSymbol, RestSymbol, Symbol,
    TimeSigSymbol,
};
use super::time::{NoteDuration, TimeSignature};

/// Time signature first, then the chords with a bar before each measure.
/// Bars continue until `last_start`, followed by one closing bar.
pub fn add_bars(
    chords: Vec<ChordSymbol>,
    time: &TimeSignature,
    last_start: u32,
    cfg: &SheetConfig,
) -> Vec<Symbol> {
    let mut symbols = Vec::with_capacity(chords.len() * 2 + 2);
    symbols.push(Symbol::TimeSig(TimeSigSymbol::new(time, cfg)));

    // u64 so the closing bar after a start near u32::MAX cannot wrap
    let measure = u64::from(time.measure());
    let bar = |at: u64| Symbol::Bar(BarSymbol::new(u32::try_from(at).unwrap_or(u32::MAX), cfg));
    let mut measure_time: u64 = 0;
    let mut chords = chords.into_iter().peekable();
    while let Some(chord) = chords.peek() {
        if measure_time <= u64::from(chord.start_time()) {
            symbols.push(bar(measure_time));
            measure_time += measure;
        } else if let Some(chord) = chords.next() {
            symbols.push(Symbol::Chord(chord));
        }
    }

    while measure_time < u64::from(last_start) {
        symbols.push(bar(measure_time));
        measure_time += measure;
    }
    symbols.push(bar(measure_time));
    symbols
}

/// Rests filling the silence between `start` and `end`. Only gaps that map
/// to a single rest or a dotted rest are filled.
pub fn get_rests(time: &TimeSignature, start: u32, end: u32, cfg: &SheetConfig) -> Vec<RestSymbol> {
    if end <= start {
        return Vec::new();
    }
    let quarter = time.quarter();
    let rest = |at: u32, duration: NoteDuration| RestSymbol::new(at, duration, cfg);
    match time.note_duration(end - start) {
        d @ (NoteDuration::Whole | NoteDuration::Half | NoteDuration::Quarter | NoteDuration::Eighth) => {
            vec![rest(start, d)]
        }
        NoteDuration::DottedHalf => vec![
            rest(start, NoteDuration::Half),
            rest(start + quarter * 2, NoteDuration::Quarter),
        ],
        NoteDuration::DottedQuarter => vec![
            rest(start, NoteDuration::Quarter),
            rest(start + quarter, NoteDuration::Eighth),
        ],
        NoteDuration::DottedEighth => vec![
            rest(start, NoteDuration::Eighth),
            rest(start + quarter / 2, NoteDuration::Sixteenth),
        ],
        _ => Vec::new(),
    }
}

/// Insert rests wherever nothing sounds before the next symbol.
pub fn add_rests(symbols: Vec<Symbol>, time: &TimeSignature, cfg: &SheetConfig) -> Vec<Symbol> {
    let mut result = Vec::with_capacity(symbols.len());
    let mut prev_time = 0;
    for symbol in symbols {
        let start = symbol.start_time();
        result.extend(get_rests(time, prev_time, start, cfg).into_iter().map(Symbol::Rest));
        prev_time = match &symbol {
            Symbol::Chord(chord) => prev_time.max(chord.end_time()),
            _ => prev_time.max(start),
        };
        result.push(symbol);
    }
    result
}

/// Put a small clef just before each bar where the clef changes.
pub fn add_clef_changes(symbols: Vec<Symbol>, clefs: &ClefMeasures, cfg: &SheetConfig) -> Vec<Symbol> {
    let mut result = Vec::with_capacity(symbols.len());
    let mut prev_clef = clefs.clef_at(0);
    for symbol in symbols {
        if symbol.is_bar() {
            let clef = clefs.clef_at(symbol.start_time());
            if clef != prev_clef {
                trace!("clef change to {:?} at {}", clef, symbol.start_time());
                let at = symbol.start_time().saturating_sub(1);
                result.push(Symbol::Clef(ClefSymbol::new(clef, at, true, cfg)));
            }
            prev_clef = clef;
        }
        result.push(symbol);
    }
    result
}

/// Full symbol stream for one track: bars, rests and clef changes added.
pub fn create_symbols(
    chords: Vec<ChordSymbol>,
    clefs: &ClefMeasures,
    time: &TimeSignature,
    last_start: u32,
    cfg: &SheetConfig,
) -> Vec<Symbol> {
    let symbols = add_bars(chords, time, last_start, cfg);
    let symbols = add_rests(symbols, time, cfg);
    add_clef_changes(symbols, clefs, cfg)
}

/// Width needed at every start time, per track and across all tracks.
#[derive(Debug, Clone, Default)]
pub struct SymbolWidths {
    widths: Vec<BTreeMap<u32, i32>>,
    max_widths: BTreeMap<u32, i32>,
}

impl SymbolWidths {
    pub fn new(tracks: &[Vec<Symbol>], lyrics: Option<&[Vec<LyricSymbol>]>, cfg: &SheetConfig) -> Self {
        let widths: Vec<BTreeMap<u32, i32>> = tracks
            .iter()
            .map(|symbols| {
                let mut map = BTreeMap::new();
                for symbol in symbols.iter().filter(|s| !s.is_bar()) {
                    *map.entry(symbol.start_time()).or_insert(0) += symbol.min_width(cfg);
                }
                map
            })
            .collect();

        let mut max_widths: BTreeMap<u32, i32> = BTreeMap::new();
        for map in &widths {
            for (&time, &width) in map {
                let entry = max_widths.entry(time).or_insert(width);
                *entry = (*entry).max(width);
            }
        }
        for lyric in lyrics.into_iter().flatten().flatten() {
            let entry = max_widths.entry(lyric.start_time).or_insert(0);
            *entry = (*entry).max(lyric.min_width());
        }
        Self { widths, max_widths }
    }

    /// Width `track` must add at `start` to line up with the widest track.
    pub fn extra_width(&self, track: usize, start: u32) -> i32 {
        let max = self.max_widths.get(&start).copied().unwrap_or(0);
        let own = self
            .widths
            .get(track)
            .and_then(|m| m.get(&start))
            .copied()
            .unwrap_or(0);
        max - own
    }

    /// Every start time used by any track, ascending.
    pub fn start_times(&self) -> impl Iterator<Item = u32> + '_ {
        self.max_widths.keys().copied()
    }
}

/// Give every track a symbol at every start time and pad the widths so
/// that symbols with the same start line up across tracks.
pub fn align_symbols(tracks: &mut [Vec<Symbol>], widths: &SymbolWidths, cfg: &SheetConfig) {
    if cfg.show_measures {
        for symbol in tracks.iter_mut().flatten().filter(|s| s.is_bar()) {
            symbol.set_width(symbol.width() + cfg.note_width);
        }
    }

    for (track, symbols) in tracks.iter_mut().enumerate() {
        let mut aligned = Vec::with_capacity(symbols.len());
        let mut pending = std::mem::take(symbols).into_iter().peekable();

        for start in widths.start_times() {
            while let Some(bar) = pending.next_if(|s| s.is_bar() && s.start_time() <= start) {
                aligned.push(bar);
            }
            let before = aligned.len();
            while let Some(symbol) = pending.next_if(|s| s.start_time() == start) {
                aligned.push(symbol);
            }
            if aligned[before..].iter().all(Symbol::is_bar) {
                aligned.push(Symbol::Blank(BlankSymbol::new(start, 0)));
            }

            let extra = widths.extra_width(track, start);
            if extra > 0 {
                if let Some(first) = aligned[before..].iter_mut().find(|s| !s.is_bar()) {
                    first.set_width(first.width() + extra);
                }
            }
        }
        // closing bars after the last start time
        aligned.extend(pending);
        *symbols = aligned;
    }
}

/// Symbol counts for each staff of one track, breaking at a measure
/// boundary when one fits.
fn staff_breaks(symbols: &[Symbol], keysig: i32, measure_length: u32, cfg: &SheetConfig) -> Vec<usize> {
    let max_width = if cfg.scroll_vert { cfg.page_width } else { i32::MAX };
    let measure = |i: usize| symbols[i].start_time() / measure_length;

    let mut counts = Vec::new();
    let mut start = 0;
    while start < symbols.len() {
        let mut end = start;
        let mut width = keysig;
        while end < symbols.len() && width.saturating_add(symbols[end].width()) < max_width {
            width += symbols[end].width();
            end += 1;
        }

        if end == start {
            end = start + 1;
        } else if end < symbols.len() && measure(start) != measure(end - 1) {
            let next_measure = measure(end);
            let mut last = end - 1;
            while last > start && measure(last) == next_measure {
                last -= 1;
            }
            end = last + 1;
        }
        counts.push(end - start);
        start = end;
    }
    counts
}

/// Split one track's symbols into staffs.
pub fn create_staffs_for_track(
    symbols: Vec<Symbol>,
    key: &KeySignature,
    measure_length: u32,
    cfg: &SheetConfig,
    track: usize,
    total_tracks: usize,
) -> Vec<Staff> {
    let measure_length = measure_length.max(1);
    let keysig = keysig_width(key, cfg);
    let counts = staff_breaks(&symbols, keysig, measure_length, cfg);

    let mut staffs = Vec::with_capacity(counts.len());
    let mut rest = symbols;
    for count in counts {
        let tail = rest.split_off(count);
        staffs.push(Staff::new(rest, key, cfg, track, total_tracks, measure_length));
        rest = tail;
    }
    staffs
}

/// Staffs for every track, interleaved row by row: track 0 then track 1
/// and so on for each line of the sheet.
pub fn create_staffs(
    tracks: Vec<Vec<Symbol>>,
    key: &KeySignature,
    measure_length: u32,
    cfg: &SheetConfig,
) -> Vec<Staff> {
    let total = tracks.len();
    let per_track: Vec<Vec<Staff>> = tracks
        .into_iter()
        .enumerate()
        .map(|(track, symbols)| {
            let mut staffs = create_staffs_for_track(symbols, key, measure_length, cfg, track, total);
            for i in 1..staffs.len() {
                let next_start = staffs[i].start_time();
                staffs[i - 1].continue_at(next_start);
            }
            staffs
        })
        .collect();

    let rows = per_track.iter().map(Vec::len).max().unwrap_or(0);
    debug!("{} tracks laid out in {} rows", total, rows);

    let mut iters: Vec<_> = per_track.into_iter().map(Vec::into_iter).collect();
    let mut staffs = Vec::new();
    for _ in 0..rows {
        staffs.extend(iters.iter_mut().filter_map(Iterator::next));
    }
    staffs
}
