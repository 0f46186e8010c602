//! End-to-end ingestion tests over whole ICS feeds.

use ics_ingest::{
    ingest, ingest_with_options, normalize_timezone, preprocess, to_zoned_instant, CalendarTime,
    CanonicalEvent, Diagnostic, IngestOptions, NullSink, Severity,
};
use proptest::prelude::*;

fn calendar(events: &[&str]) -> String {
    let mut ics = String::from("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//ics-ingest//tests//EN\r\n");
    for body in events {
        ics.push_str("BEGIN:VEVENT\r\n");
        ics.push_str(body);
        ics.push_str("END:VEVENT\r\n");
    }
    ics.push_str("END:VCALENDAR\r\n");
    ics
}

fn run(ics: &str) -> (Vec<CanonicalEvent>, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let events = ingest(ics, &mut diagnostics);
    (events, diagnostics)
}

// ── Feed-level behaviour ────────────────────────────────────────────────────

#[test]
fn test_all_day_multi_day_event() {
    let ics = calendar(&["UID:trip\r\nSUMMARY:Trip\r\nDTSTART;VALUE=DATE:20240110\r\nDTEND;VALUE=DATE:20240112\r\n"]);
    let (events, diagnostics) = run(&ics);
    assert!(diagnostics.is_empty(), "got: {diagnostics:?}");
    let e = events[0].as_single().unwrap();
    assert_eq!(e.date, "2024-01-10");
    assert_eq!(e.end_date.as_deref(), Some("2024-01-11"));
    assert!(e.all_day);
}

#[test]
fn test_series_with_exdate_and_override() {
    let ics = calendar(&[
        "UID:weekly\r\nSUMMARY:Sync\r\nDTSTART;VALUE=DATE:20240226\r\nRRULE:FREQ=WEEKLY;COUNT=6\r\nEXDATE;VALUE=DATE:20240304\r\n",
        "UID:weekly\r\nSUMMARY:Sync (moved)\r\nRECURRENCE-ID;VALUE=DATE:20240311\r\nDTSTART;VALUE=DATE:20240312\r\n",
    ]);
    let (events, _) = run(&ics);
    assert_eq!(events.len(), 1);
    let series = events[0].as_recurring().unwrap();
    // The override moved 2024-03-11 to 2024-03-12; its own date is skipped.
    assert_eq!(series.skip_dates, vec!["2024-03-04", "2024-03-12"]);
    assert_eq!(series.id, "ics::weekly::2024-02-26::recurring");
}

#[test]
fn test_folded_override_retained_on_request() {
    let ics = calendar(&[
        "UID:weekly\r\nDTSTART;VALUE=DATE:20240226\r\nRRULE:FREQ=WEEKLY\r\n",
        "UID:weekly\r\nSUMMARY:Moved\r\nRECURRENCE-ID;VALUE=DATE:20240311\r\nDTSTART;VALUE=DATE:20240312\r\n",
    ]);
    let options = IngestOptions {
        retain_folded_exceptions: true,
        ..IngestOptions::default()
    };
    let events = ingest_with_options(&ics, &options, &mut NullSink);
    assert_eq!(events.len(), 2);
    assert!(events[0].is_recurring());
    assert_eq!(events[1].as_single().unwrap().date, "2024-03-12");
}

#[test]
fn test_unmatched_override_kept_as_single() {
    let ics = calendar(&[
        "UID:lonely\r\nSUMMARY:Orphan\r\nRECURRENCE-ID:20240311T090000Z\r\nDTSTART:20240311T100000Z\r\nDTEND:20240311T110000Z\r\n",
    ]);
    let (events, diagnostics) = run(&ics);
    assert_eq!(events.len(), 1);
    let e = events[0].as_single().unwrap();
    assert_eq!(e.title, "Orphan");
    assert_eq!(e.time.as_ref().unwrap().start_time, "10:00");
    assert!(diagnostics
        .iter()
        .any(|d| d.severity == Severity::Info && d.uid.as_deref() == Some("lonely")));
}

#[test]
fn test_unconvertible_start_yields_one_diagnostic() {
    let ics = calendar(&[
        "UID:good\r\nDTSTART;VALUE=DATE:20240110\r\n",
        "UID:bad\r\nSUMMARY:Broken\r\nDTSTART:20241345T100000\r\n",
    ]);
    let (events, diagnostics) = run(&ics);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].uid(), "good");
    let about_bad: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.uid.as_deref() == Some("bad"))
        .collect();
    assert_eq!(about_bad.len(), 1, "got: {diagnostics:?}");
    assert_eq!(about_bad[0].severity, Severity::Warning);
}

#[test]
fn test_windows_zone_event() {
    let ics = calendar(&[
        "UID:w\r\nDTSTART;TZID=Pacific Standard Time:20240710T090000\r\nDTEND;TZID=Pacific Standard Time:20240710T100000\r\n",
    ]);
    let (events, _) = run(&ics);
    let e = events[0].as_single().unwrap();
    assert_eq!(e.timezone.as_deref(), Some("America/Los_Angeles"));
    assert_eq!(e.time.as_ref().unwrap().start_time, "09:00");
    assert_eq!(e.time.as_ref().unwrap().end_time, "10:00");
}

#[test]
fn test_vendor_prefixed_zone() {
    let ics = calendar(&[
        "UID:m\r\nDTSTART;TZID=/mozilla.org/20070129_1/Europe/Paris:20240110T090000\r\n",
    ]);
    let (events, _) = run(&ics);
    let e = events[0].as_single().unwrap();
    assert_eq!(e.timezone.as_deref(), Some("Europe/Paris"));
}

#[test]
fn test_end_of_day_marker() {
    let ics = calendar(&["UID:eod\r\nDTSTART:20240110T220000Z\r\nDTEND:20240110T240000Z\r\n"]);
    let (events, _) = run(&ics);
    let e = events[0].as_single().unwrap();
    assert_eq!(e.end_date.as_deref(), Some("2024-01-11"));
    assert_eq!(e.time.as_ref().unwrap().end_time, "00:00");
}

#[test]
fn test_json_shape() {
    let ics = calendar(&[
        "UID:j\r\nSUMMARY:Call\r\nDTSTART:20240110T090000Z\r\nDTEND:20240110T093000Z\r\nLOCATION:https://meet.example.com/abc\r\n",
    ]);
    let (events, _) = run(&ics);
    let json = serde_json::to_value(&events).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{
            "type": "single",
            "uid": "j",
            "title": "Call",
            "date": "2024-01-10",
            "endDate": null,
            "timezone": "utc",
            "allDay": false,
            "startTime": "09:00",
            "endTime": "09:30",
            "description": "",
            "url": "https://meet.example.com/abc"
        }])
    );
}

#[test]
fn test_ingestion_is_idempotent() {
    let ics = calendar(&[
        "UID:a\r\nDTSTART:20240110\r\nDTEND:20240112\r\n",
        "UID:b\r\nDTSTART;TZID=W. Europe Standard Time:20240226T090000\r\nRRULE:FREQ=DAILY;COUNT=3\r\nEXDATE;TZID=W. Europe Standard Time:20240227T090000\r\n",
        "UID:b\r\nRECURRENCE-ID;TZID=W. Europe Standard Time:20240228T090000\r\nDTSTART;TZID=W. Europe Standard Time:20240228T110000\r\n",
        "UID:c\r\nDTSTART:garbage\r\n",
    ]);
    let (first, first_diagnostics) = run(&ics);
    let (second, second_diagnostics) = run(&ics);
    assert_eq!(first, second);
    assert_eq!(first_diagnostics, second_diagnostics);
    assert_eq!(
        first[1].as_recurring().unwrap().skip_dates,
        vec!["2024-02-27", "2024-02-28"]
    );
}

#[test]
fn test_garbage_input_never_panics() {
    for input in ["", "hello", "BEGIN:VEVENT", "BEGIN:VCALENDAR\r\n", "END:VCALENDAR\r\n\u{0}"] {
        let _ = ingest(input, &mut NullSink);
    }
}

// ── Quantified properties ───────────────────────────────────────────────────

fn calendar_date() -> impl Strategy<Value = (i32, u32, u32)> {
    (1900i32..2100, 1u32..=12, 1u32..=28)
}

proptest! {
    #[test]
    fn test_preprocess_injects_value_date((y, m, d) in calendar_date(), crlf in any::<bool>()) {
        let eol = if crlf { "\r\n" } else { "\n" };
        let date = format!("{y:04}{m:02}{d:02}");
        let out = preprocess(&format!("DTSTART:{date}{eol}"));
        prop_assert_eq!(out, format!("DTSTART;VALUE=DATE:{date}{eol}"));
    }

    #[test]
    fn test_preprocess_is_idempotent(text in "[A-Z;=:0-9\r\n-]{0,80}") {
        let once = preprocess(&text);
        prop_assert_eq!(preprocess(&once), once);
    }

    #[test]
    fn test_date_only_instant_keeps_calendar_day((y, m, d) in calendar_date()) {
        let raw = format!("{y:04}{m:02}{d:02}");
        let zoned = to_zoned_instant(&CalendarTime::new(&raw, true, Some("Pacific/Kiritimati"))).unwrap();
        prop_assert_eq!(zoned.iso_date(), format!("{y:04}-{m:02}-{d:02}"));
    }

    #[test]
    fn test_unknown_zone_tokens_pass_through(token in "[A-Za-z]{3,12} [A-Za-z]{3,12} Zone") {
        prop_assert_eq!(normalize_timezone(Some(&token)), token);
    }

    #[test]
    fn test_arbitrary_text_never_panics(text in "\\PC{0,300}") {
        let _ = ingest(&text, &mut NullSink);
    }
}

#[test]
fn test_utc_markers_agree() {
    assert_eq!(normalize_timezone(Some("Z")), "utc");
    assert_eq!(normalize_timezone(Some("")), "utc");
    assert_eq!(normalize_timezone(None), "utc");
    assert_eq!(normalize_timezone(Some("W. Europe Standard Time")), "Europe/Berlin");
}
