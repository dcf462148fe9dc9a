//! midisheet lays out MIDI tracks as sheet music.
//!
//! Raw note events are turned into tracks, grouped into chords with stems,
//! beams and accidentals, and broken into justified staffs that can be
//! drawn through the [`renderer::Canvas`] interface.
//!
//! # Example
//! ```
//! use midisheet::{MidiEvent, MidiOptions, SheetMusic, TimeSignature};
//!
//! let events = vec![
//!     MidiEvent::note_on(0, 0, 60, 90),
//!     MidiEvent::note_off(480, 0, 60),
//! ];
//! let time = TimeSignature::common(480).unwrap();
//! let sheet = SheetMusic::from_events(&[events], time, &MidiOptions::default());
//! println!("Staffs: {}", sheet.staffs().len());
//! ```

pub mod error;
pub mod model;
pub mod options;
pub mod renderer;
pub mod sheet;
pub mod track;
pub mod transform;

use serde::Deserialize;

pub use error::SheetError;
pub use model::*;
pub use options::{MidiOptions, NoteNameDisplay};
pub use renderer::{render_sheet_to_svg, Canvas, SvgBuilder};
pub use sheet::key::{Accidental, KeySignature};
pub use sheet::time::{NoteDuration, TimeSignature};
pub use sheet::white_note::{Clef, WhiteNote};
pub use sheet::SheetMusic;
pub use track::{MidiTrack, TrackBuilder};

/// Input accepted by the JSON entry points.
#[derive(Debug, Deserialize)]
struct LayoutRequest {
    tracks: Vec<Vec<MidiEvent>>,
    time: TimeSignature,
    #[serde(default)]
    options: MidiOptions,
}

/// Lay out a JSON request of the form
/// `{"tracks": [[event, ...], ...], "time": {...}, "options": {...}}`.
pub fn layout_json(json: &str) -> Result<SheetMusic, SheetError> {
    let request: LayoutRequest = serde_json::from_str(json)?;
    request.options.validate()?;
    Ok(SheetMusic::from_events(&request.tracks, request.time, &request.options))
}

/// Convert a laid-out sheet to a JSON string.
/// Useful for passing data across FFI boundaries.
pub fn sheet_to_json(sheet: &SheetMusic) -> Result<String, SheetError> {
    Ok(serde_json::to_string_pretty(sheet)?)
}

/// Lay out a JSON request and render it directly to SVG.
pub fn render_json_to_svg(json: &str) -> Result<String, SheetError> {
    let sheet = layout_json(json)?;
    Ok(render_sheet_to_svg(&sheet))
}

// ═══════════════════════════════════════════════════════════════════════
// C FFI for iOS (static library) and Android (shared library)
// ═══════════════════════════════════════════════════════════════════════

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

/// Read a borrowed C string, `None` for null or invalid UTF-8.
///
/// # Safety
/// `ptr` must be null or a valid null-terminated C string.
unsafe fn borrow_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

fn into_c_string(result: Result<String, SheetError>) -> *mut c_char {
    match result {
        Ok(s) => CString::new(s).unwrap_or_default().into_raw(),
        Err(e) => {
            log::warn!("midisheet FFI call failed: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Lay out a JSON request and return SVG as a C string.
/// The caller must free the returned string with `midisheet_free_string`.
///
/// # Safety
/// `json` must be a valid null-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn midisheet_render_json(json: *const c_char) -> *mut c_char {
    match unsafe { borrow_str(json) } {
        Some(json) => into_c_string(render_json_to_svg(json)),
        None => std::ptr::null_mut(),
    }
}

/// Lay out a JSON request and return the layout as JSON.
/// The caller must free the returned string with `midisheet_free_string`.
///
/// # Safety
/// `json` must be a valid null-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn midisheet_layout_json(json: *const c_char) -> *mut c_char {
    match unsafe { borrow_str(json) } {
        Some(json) => into_c_string(layout_json(json).and_then(|sheet| sheet_to_json(&sheet))),
        None => std::ptr::null_mut(),
    }
}

/// Free a string previously returned by midisheet functions.
///
/// # Safety
/// `ptr` must be a string previously returned by a midisheet function, or null.
#[no_mangle]
pub unsafe extern "C" fn midisheet_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            let _ = CString::from_raw(ptr);
        }
    }
}
