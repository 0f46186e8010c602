//! Repair of date-only values that omit `VALUE=DATE`.
//!
//! Many exporters write `DTSTART:20240110` instead of
//! `DTSTART;VALUE=DATE:20240110`. Without the parameter the value is read as
//! a malformed DATE-TIME and the all-day nature of the event is lost, so the
//! parameter is injected before tokenizing.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static BARE_DATE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^((?i:DTSTART|DTEND|EXDATE|RECURRENCE-ID))((?:;[^:\r\n]*)?):(\d{8}(?:,\d{8})*)(\r?\n|$)",
    )
    .expect("valid bare-date regex")
});

/// Inject `VALUE=DATE` into `DTSTART`, `DTEND`, `EXDATE` and `RECURRENCE-ID`
/// lines whose value is a bare 8-digit date (or a comma list of them).
///
/// Existing parameters and the original line terminator are preserved. Lines
/// that already carry a `VALUE=` parameter are left alone, so the function is
/// idempotent and a no-op on conformant text.
///
/// # Examples
///
/// ```
/// use ics_ingest::preprocess;
///
/// assert_eq!(preprocess("DTSTART:20240110\r\n"), "DTSTART;VALUE=DATE:20240110\r\n");
/// assert_eq!(
///     preprocess("EXDATE;X-FOO=1:20240304\n"),
///     "EXDATE;X-FOO=1;VALUE=DATE:20240304\n"
/// );
/// ```
pub fn preprocess(text: &str) -> String {
    BARE_DATE_LINE
        .replace_all(text, |caps: &Captures<'_>| {
            let name = &caps[1];
            let params = &caps[2];
            let value = &caps[3];
            let eol = &caps[4];
            if params.to_ascii_uppercase().contains("VALUE=") {
                return caps[0].to_string();
            }
            format!("{name}{params};VALUE=DATE:{value}{eol}")
        })
        .into_owned()
}
