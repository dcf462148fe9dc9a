//! Integration tests for the JSON entry points and SVG output.

use midisheet::{layout_json, render_json_to_svg, sheet_to_json, MidiOptions, SheetError};

const REQUEST: &str = r#"{
    "tracks": [[
        {"start_time": 0, "kind": {"type": "note_on", "note": 60, "velocity": 90}},
        {"start_time": 0, "kind": {"type": "meta", "meta": "lyric", "text": "do"}},
        {"start_time": 240, "kind": {"type": "note_off", "note": 60, "velocity": 0}},
        {"start_time": 240, "kind": {"type": "note_on", "note": 62, "velocity": 90}},
        {"start_time": 480, "kind": {"type": "note_off", "note": 62, "velocity": 0}}
    ]],
    "time": {"numerator": 4, "denominator": 4, "quarter": 480},
    "options": {"show_measures": true, "show_note_letters": "letter"}
}"#;

#[test]
fn json_request_renders_svg() {
    let svg = render_json_to_svg(REQUEST).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.trim_end().ends_with("</svg>"));
    assert!(svg.contains("<ellipse"), "noteheads are drawn");
    assert!(svg.contains(">do</text>"), "lyrics are drawn");
}

#[test]
fn layout_serializes_to_json() {
    let sheet = layout_json(REQUEST).unwrap();
    let json = sheet_to_json(&sheet).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let staffs = value["staffs"].as_array().unwrap();
    assert_eq!(staffs.len(), sheet.staffs().len());
    assert_eq!(staffs[0]["symbols"][0]["kind"], "time_sig");
}

#[test]
fn invalid_options_are_rejected() {
    let request = r#"{"tracks": [], "time": {"numerator": 4, "denominator": 4, "quarter": 480},
                      "options": {"transpose": 500}}"#;
    assert!(matches!(
        layout_json(request),
        Err(SheetError::InvalidOption { name: "transpose", .. })
    ));
}

#[test]
fn invalid_time_signature_is_rejected() {
    let request = r#"{"tracks": [], "time": {"numerator": 4, "denominator": 3, "quarter": 480}}"#;
    assert!(matches!(layout_json(request), Err(SheetError::Json(_))));
}

#[test]
fn oversized_time_signatures_are_rejected() {
    let request = r#"{"tracks": [[
        {"start_time": 0, "kind": {"type": "note_on", "note": 60, "velocity": 90}},
        {"start_time": 480, "kind": {"type": "note_off", "note": 60, "velocity": 0}}
    ]], "time": {"numerator": 4, "denominator": 4, "quarter": 100000000}}"#;
    assert!(matches!(render_json_to_svg(request), Err(SheetError::Json(_))));

    let request = r#"{"tracks": [], "time": {"numerator": 2147483647, "denominator": 4, "quarter": 480}}"#;
    assert!(matches!(layout_json(request), Err(SheetError::Json(_))));
}

#[test]
fn options_json_round_trips_defaults() {
    let options = MidiOptions::from_json("{}").unwrap();
    assert_eq!(options, MidiOptions::default());
}
