//! Typed boundary over the `ical` tokenizer.
//!
//! `ical` hands back untyped `name`/`params`/`value` triples. Everything the
//! engine needs from a VEVENT is exposed here through narrow accessors that
//! return `Option`s, so the rest of the crate never touches raw properties
//! and nothing in here can panic on malformed input.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use ical::parser::ical::component::IcalEvent;
use ical::property::Property;
use ical::IcalParser;

use crate::error::{IngestError, Result};

// ── Component tree ──────────────────────────────────────────────────────────

/// The VEVENTs of every VCALENDAR in a feed, in document order.
///
/// Tokenizing stops at the first structural error; components read before
/// it are kept and the error is recorded alongside them.
#[derive(Debug, Default)]
pub struct ComponentTree {
    pub events: Vec<CalendarComponent>,
    pub error: Option<IngestError>,
}

/// Tokenize ICS text into a [`ComponentTree`].
pub fn parse(text: &str) -> ComponentTree {
    let mut tree = ComponentTree::default();
    for calendar in IcalParser::new(text.as_bytes()) {
        match calendar {
            Ok(calendar) => tree
                .events
                .extend(calendar.events.into_iter().map(CalendarComponent::from_ical)),
            Err(e) => {
                tree.error = Some(IngestError::Parse(e.to_string()));
                break;
            }
        }
    }
    tree
}

// ── CalendarComponent ───────────────────────────────────────────────────────

/// One VEVENT.
#[derive(Debug, Clone)]
pub struct CalendarComponent {
    properties: Vec<Property>,
}

impl CalendarComponent {
    pub fn from_ical(event: IcalEvent) -> Self {
        Self {
            properties: event.properties,
        }
    }

    /// The `UID`, trimmed. Blank values count as absent.
    pub fn uid(&self) -> Option<&str> {
        self.value("UID")
            .map(str::trim)
            .filter(|uid| !uid.is_empty())
    }

    pub fn summary(&self) -> Option<String> {
        self.text("SUMMARY")
    }

    pub fn description(&self) -> Option<String> {
        self.text("DESCRIPTION")
    }

    pub fn location(&self) -> Option<String> {
        self.text("LOCATION")
    }

    pub fn url(&self) -> Option<String> {
        self.value("URL")
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    }

    pub fn start(&self) -> Option<CalendarTime> {
        self.property("DTSTART").and_then(CalendarTime::from_property)
    }

    /// `DTEND` if present, otherwise `DTSTART` shifted by `DURATION`.
    ///
    /// `None` either when no end is specified or when the duration cannot be
    /// applied; use [`Self::specifies_end`] to tell the two apart.
    pub fn end(&self) -> Option<CalendarTime> {
        if let Some(dtend) = self.property("DTEND") {
            return CalendarTime::from_property(dtend);
        }
        let duration = parse_ical_duration(self.value("DURATION")?).ok()?;
        self.start()?.shifted(duration)
    }

    /// Whether `DTEND` or `DURATION` is present at all, even if it ends up
    /// equal to the start.
    pub fn specifies_end(&self) -> bool {
        self.property("DTEND").is_some() || self.property("DURATION").is_some()
    }

    pub fn recurrence_id(&self) -> Option<CalendarTime> {
        self.property("RECURRENCE-ID")
            .and_then(CalendarTime::from_property)
    }

    /// Whether this component overrides one instance of a series.
    pub fn has_recurrence_marker(&self) -> bool {
        self.property("RECURRENCE-ID").is_some()
    }

    pub fn is_recurring(&self) -> bool {
        self.property("RRULE").is_some() || self.property("RDATE").is_some()
    }

    pub fn rrule(&self) -> Option<&str> {
        self.value("RRULE")
    }

    /// Every value of every `EXDATE` property, comma lists split.
    pub fn exdates(&self) -> Vec<CalendarTime> {
        self.properties
            .iter()
            .filter(|p| p.name.eq_ignore_ascii_case("EXDATE"))
            .flat_map(CalendarTime::all_from_property)
            .collect()
    }

    fn property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.property(name)?.value.as_deref()
    }

    fn text(&self, name: &str) -> Option<String> {
        self.value(name).map(unescape_text)
    }
}

fn param<'a>(property: &'a Property, name: &str) -> Option<&'a str> {
    property
        .params
        .as_ref()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, values)| values.first())
        .map(|v| v.trim().trim_matches('"'))
        .filter(|v| !v.is_empty())
}

/// Undo RFC 5545 TEXT escaping (`\n`, `\,`, `\;`, `\\`).
fn unescape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

// ── CalendarTime ────────────────────────────────────────────────────────────

/// Date and time fields decoded from a strictly formatted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFields {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

/// One timestamp exactly as it appeared in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarTime {
    raw: String,
    is_date: bool,
    fields: Option<TimeFields>,
    zone: Option<String>,
}

/// Result of the tokenizer-level conversion of a [`CalendarTime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeInstant {
    /// `Z` values and values whose `TZID` is already an IANA name.
    Anchored(DateTime<Utc>),
    /// Floating values and values in a zone `chrono-tz` does not know.
    Floating(NaiveDateTime),
}

impl CalendarTime {
    /// Build a timestamp from its raw text.
    ///
    /// `tzid` is the `TZID` parameter, if any. A trailing `Z` on a timed value
    /// overrides it.
    pub fn new(raw: &str, is_date: bool, tzid: Option<&str>) -> Self {
        let raw = raw.trim().to_string();
        let fields = decode_fields(&raw, is_date);
        let zone = if !is_date && raw.ends_with('Z') {
            Some("Z".to_string())
        } else {
            tzid.map(str::to_string)
        };
        Self {
            raw,
            is_date,
            fields,
            zone,
        }
    }

    fn from_property(property: &Property) -> Option<Self> {
        Self::all_from_property(property).into_iter().next()
    }

    fn all_from_property(property: &Property) -> Vec<Self> {
        let is_date = param(property, "VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE"));
        let tzid = param(property, "TZID");
        property
            .value
            .as_deref()
            .map(|value| {
                value
                    .split(',')
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| Self::new(v, is_date, tzid))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_date(&self) -> bool {
        self.is_date
    }

    pub fn fields(&self) -> Option<TimeFields> {
        self.fields
    }

    /// The raw zone token: `Z`, a `TZID` value, or `None` for floating time.
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        let f = self.fields?;
        NaiveDate::from_ymd_opt(f.year, f.month, f.day)
    }

    /// Wall-clock reading of the value, if its fields form a real date/time.
    pub fn naive(&self) -> Option<NaiveDateTime> {
        let f = self.fields?;
        self.date()?.and_hms_opt(f.hour, f.minute, f.second)
    }

    /// Best-effort conversion to an absolute instant.
    ///
    /// `None` when the fields do not form a real date/time, or when the value
    /// falls in a DST gap of its IANA zone. A DST fold resolves to the earlier
    /// instant.
    pub fn to_instant(&self) -> Option<NativeInstant> {
        let naive = self.naive()?;
        match self.zone() {
            Some("Z") => Some(NativeInstant::Anchored(Utc.from_utc_datetime(&naive))),
            Some(zone) => match zone.parse::<Tz>() {
                Ok(tz) => tz
                    .from_local_datetime(&naive)
                    .earliest()
                    .map(|dt| NativeInstant::Anchored(dt.with_timezone(&Utc))),
                Err(_) => Some(NativeInstant::Floating(naive)),
            },
            None => Some(NativeInstant::Floating(naive)),
        }
    }

    /// The same timestamp moved by `duration`, keeping its zone and form.
    pub fn shifted(&self, duration: Duration) -> Option<Self> {
        let moved = self.naive()?.checked_add_signed(duration)?;
        let raw = if self.is_date {
            moved.format("%Y%m%d").to_string()
        } else if self.zone() == Some("Z") {
            moved.format("%Y%m%dT%H%M%SZ").to_string()
        } else {
            moved.format("%Y%m%dT%H%M%S").to_string()
        };
        let tzid = self.zone().filter(|z| *z != "Z");
        Some(Self::new(&raw, self.is_date, tzid))
    }
}

/// Strict structural decode: `YYYYMMDD` for dates, `YYYYMMDDTHHMMSS[Z]` for
/// date-times. Date-only values tolerate a trailing time part.
fn decode_fields(raw: &str, is_date: bool) -> Option<TimeFields> {
    let bytes = raw.as_bytes();
    let digits = |range: std::ops::Range<usize>| -> Option<u32> {
        let slice = bytes.get(range)?;
        if !slice.iter().all(u8::is_ascii_digit) {
            return None;
        }
        std::str::from_utf8(slice).ok()?.parse().ok()
    };

    let year = digits(0..4)? as i32;
    let month = digits(4..6)?;
    let day = digits(6..8)?;

    if is_date {
        if bytes.len() != 8 && bytes.get(8) != Some(&b'T') {
            return None;
        }
        return Some(TimeFields {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
        });
    }

    let utc = bytes.len() == 16 && bytes[15] == b'Z';
    if !(bytes.len() == 15 || utc) || bytes[8] != b'T' {
        return None;
    }
    Some(TimeFields {
        year,
        month,
        day,
        hour: digits(9..11)?,
        minute: digits(11..13)?,
        second: digits(13..15)?,
    })
}

// ── DURATION ────────────────────────────────────────────────────────────────

/// Parse an RFC 5545 duration (`P1W`, `P1DT2H`, `-PT15M`, ...).
///
/// # Errors
///
/// Returns [`IngestError::InvalidDuration`] for anything that is not a
/// well-formed duration.
pub fn parse_ical_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let invalid = |why: &str| IngestError::InvalidDuration(format!("{why}: '{s}'"));

    let (sign, rest) = match s.as_bytes().first() {
        Some(b'+') => (1i64, &s[1..]),
        Some(b'-') => (-1i64, &s[1..]),
        _ => (1i64, s),
    };
    let rest = rest
        .strip_prefix('P')
        .or_else(|| rest.strip_prefix('p'))
        .ok_or_else(|| invalid("duration must start with 'P'"))?;

    let mut seconds: i64 = 0;
    let mut num_buf = String::new();
    let mut in_time = false;
    let mut found_any = false;

    for ch in rest.chars() {
        if ch.is_ascii_digit() {
            num_buf.push(ch);
            continue;
        }
        if ch.eq_ignore_ascii_case(&'T') {
            if in_time || !num_buf.is_empty() {
                return Err(invalid("misplaced 'T'"));
            }
            in_time = true;
            continue;
        }
        if num_buf.is_empty() {
            return Err(invalid("expected number before unit"));
        }
        let n: i64 = num_buf
            .parse()
            .map_err(|_| invalid("number out of range"))?;
        num_buf.clear();
        found_any = true;

        let unit = match (in_time, ch.to_ascii_uppercase()) {
            (false, 'W') => 7 * 86_400,
            (false, 'D') => 86_400,
            (true, 'H') => 3_600,
            (true, 'M') => 60,
            (true, 'S') => 1,
            _ => return Err(invalid("unknown unit")),
        };
        seconds = n
            .checked_mul(unit)
            .and_then(|v| seconds.checked_add(v))
            .ok_or_else(|| invalid("duration overflow"))?;
    }

    if !num_buf.is_empty() {
        return Err(invalid("number without unit"));
    }
    if !found_any {
        return Err(invalid("no components"));
    }

    Ok(Duration::seconds(sign * seconds))
}
