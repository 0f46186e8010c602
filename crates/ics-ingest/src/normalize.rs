//! Conversion of feed timestamps into zoned instants.
//!
//! Feeds in the wild carry timestamps the tokenizer cannot convert: vendor
//! zone names, `T240000` end-of-day markers, wall-clock times that fall into a
//! DST gap. Conversion therefore runs through a chain of fallbacks and only
//! gives up when none of them yields a real instant:
//!
//! 1. Date-only values go straight to midnight UTC (no zone math, so the
//!    calendar day never shifts with the host zone).
//! 2. The native conversion of [`CalendarTime::to_instant`], re-expressed in
//!    the resolved zone, or in UTC when that zone is unusable.
//! 3. A textual re-parse of the three formats seen in practice: `YYYYMMDD`,
//!    `YYYYMMDDTHHMMSSZ` and `YYYYMMDDTHHMMSS`.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::component::{CalendarTime, NativeInstant};
use crate::error::{IngestError, Result};
use crate::timezone::{parse_zone, TimezoneResolver, UTC};

static DATE_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("valid date regex"));
static UTC_TIMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})(\d{2})(\d{2})T(\d{2})(\d{2})(\d{2})Z$").expect("valid utc regex")
});
static NAIVE_TIMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})(\d{2})(\d{2})T(\d{2})(\d{2})(\d{2})$").expect("valid naive regex")
});

// ── ZonedInstant ────────────────────────────────────────────────────────────

/// Which fallback produced a [`ZonedInstant`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// A vendor zone name was mapped to an IANA name.
    MappedZone { from: String, to: String },
    /// The resolved zone was unusable, so the instant was taken in UTC.
    UtcFallback { zone: String },
    /// The native conversion failed and the raw text was re-parsed.
    TextRecovery { raw: String },
}

/// An absolute instant together with the zone it should be displayed in.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonedInstant {
    local: DateTime<Tz>,
    zone: String,
    recovery: Option<Recovery>,
}

impl ZonedInstant {
    fn new(local: DateTime<Tz>, zone: impl Into<String>, recovery: Option<Recovery>) -> Self {
        Self {
            local,
            zone: zone.into(),
            recovery,
        }
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.local.with_timezone(&Utc)
    }

    pub fn local(&self) -> DateTime<Tz> {
        self.local
    }

    /// Resolved zone name (`utc` or an IANA name).
    pub fn zone(&self) -> &str {
        &self.zone
    }

    pub fn recovery(&self) -> Option<&Recovery> {
        self.recovery.as_ref()
    }

    /// Calendar day in this instant's zone.
    pub fn date(&self) -> NaiveDate {
        self.local.date_naive()
    }

    /// `YYYY-MM-DD` in this instant's zone.
    pub fn iso_date(&self) -> String {
        self.local.format("%Y-%m-%d").to_string()
    }

    /// `HH:mm` (24-hour) in this instant's zone.
    pub fn time_of_day(&self) -> String {
        self.local.format("%H:%M").to_string()
    }

    /// The same instant expressed in the zone of `other`.
    pub fn in_zone_of(&self, other: &ZonedInstant) -> ZonedInstant {
        ZonedInstant::new(
            self.local.with_timezone(&other.local.timezone()),
            other.zone.clone(),
            self.recovery.clone(),
        )
    }
}

// ── Normalizer ──────────────────────────────────────────────────────────────

/// Convert a timestamp with the built-in timezone table.
///
/// # Errors
///
/// Returns [`IngestError::InvalidTimestamp`] when every fallback fails.
///
/// # Examples
///
/// ```
/// use ics_ingest::{to_zoned_instant, CalendarTime};
///
/// let t = CalendarTime::new("20240110T090000", false, Some("W. Europe Standard Time"));
/// let zoned = to_zoned_instant(&t).unwrap();
/// assert_eq!(zoned.zone(), "Europe/Berlin");
/// assert_eq!(zoned.time_of_day(), "09:00");
/// ```
pub fn to_zoned_instant(t: &CalendarTime) -> Result<ZonedInstant> {
    TimestampNormalizer::new(&TimezoneResolver::default()).normalize(t)
}

/// Converts [`CalendarTime`]s using a particular [`TimezoneResolver`].
#[derive(Debug, Clone, Copy)]
pub struct TimestampNormalizer<'a> {
    resolver: &'a TimezoneResolver,
}

impl<'a> TimestampNormalizer<'a> {
    pub fn new(resolver: &'a TimezoneResolver) -> Self {
        Self { resolver }
    }

    /// Convert `t` into a [`ZonedInstant`].
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::InvalidTimestamp`] when the value is not a real
    /// date/time under any of the fallbacks.
    pub fn normalize(&self, t: &CalendarTime) -> Result<ZonedInstant> {
        if t.is_date() {
            return date_only(t);
        }

        let resolved = self.resolver.normalize(t.zone());
        match t.to_instant() {
            Some(native) => Ok(apply_zone(t, native, &resolved)),
            None => recover_from_text(t, &resolved),
        }
    }
}

fn date_only(t: &CalendarTime) -> Result<ZonedInstant> {
    let date = t
        .date()
        .ok_or_else(|| IngestError::invalid_timestamp(t.raw(), "not a calendar date"))?;
    let local = Tz::UTC.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    Ok(ZonedInstant::new(local, UTC, None))
}

/// Express a natively converted value in the resolved zone, falling back to
/// UTC when the zone is unknown or the wall-clock time does not exist in it.
fn apply_zone(t: &CalendarTime, native: NativeInstant, resolved: &str) -> ZonedInstant {
    if let Some(tz) = parse_zone(resolved) {
        let local = match native {
            NativeInstant::Anchored(utc) => Some(utc.with_timezone(&tz)),
            NativeInstant::Floating(naive) => tz.from_local_datetime(&naive).earliest(),
        };
        if let Some(local) = local {
            let mapped = t
                .zone()
                .filter(|raw| *raw != "Z" && !raw.eq_ignore_ascii_case(UTC) && *raw != resolved)
                .map(|raw| Recovery::MappedZone {
                    from: raw.to_string(),
                    to: resolved.to_string(),
                });
            return ZonedInstant::new(local, resolved, mapped);
        }
    }

    let utc = match native {
        NativeInstant::Anchored(utc) => utc,
        NativeInstant::Floating(naive) => Utc.from_utc_datetime(&naive),
    };
    ZonedInstant::new(
        utc.with_timezone(&Tz::UTC),
        UTC,
        Some(Recovery::UtcFallback {
            zone: resolved.to_string(),
        }),
    )
}

fn recover_from_text(t: &CalendarTime, resolved: &str) -> Result<ZonedInstant> {
    let raw = t.raw();
    let iso = ical_to_iso(raw)
        .ok_or_else(|| IngestError::invalid_timestamp(raw, "unrecognized timestamp format"))?;

    let zone = if iso.ends_with('Z') { UTC } else { resolved };
    let tz = parse_zone(zone)
        .ok_or_else(|| IngestError::invalid_timestamp(raw, format!("unknown timezone '{zone}'")))?;

    let naive = parse_iso(iso.trim_end_matches('Z'))
        .ok_or_else(|| IngestError::invalid_timestamp(raw, "not a real date/time"))?;
    let local = resolve_local(&tz, naive).ok_or_else(|| {
        IngestError::invalid_timestamp(raw, format!("local time does not exist in {zone}"))
    })?;

    Ok(ZonedInstant::new(
        local,
        zone,
        Some(Recovery::TextRecovery {
            raw: raw.to_string(),
        }),
    ))
}

/// Rewrite an iCalendar basic-format value as ISO 8601 extended format.
///
/// Only the three shapes that occur in practice are recognized:
/// `YYYYMMDD`, `YYYYMMDDTHHMMSSZ` and `YYYYMMDDTHHMMSS`.
///
/// # Examples
///
/// ```
/// use ics_ingest::normalize::ical_to_iso;
///
/// assert_eq!(ical_to_iso("20240110").as_deref(), Some("2024-01-10"));
/// assert_eq!(ical_to_iso("20240110T093000Z").as_deref(), Some("2024-01-10T09:30:00Z"));
/// assert_eq!(ical_to_iso("2024-01-10"), None);
/// ```
pub fn ical_to_iso(raw: &str) -> Option<String> {
    if let Some(c) = DATE_ONLY.captures(raw) {
        return Some(format!("{}-{}-{}", &c[1], &c[2], &c[3]));
    }
    let (caps, suffix) = match UTC_TIMED.captures(raw) {
        Some(c) => (c, "Z"),
        None => (NAIVE_TIMED.captures(raw)?, ""),
    };
    Some(format!(
        "{}-{}-{}T{}:{}:{}{suffix}",
        &caps[1], &caps[2], &caps[3], &caps[4], &caps[5], &caps[6]
    ))
}

/// Parse an ISO date or date-time. `24:00:00` means midnight at the start of
/// the following day.
fn parse_iso(iso: &str) -> Option<NaiveDateTime> {
    let Some((date, time)) = iso.split_once('T') else {
        return NaiveDate::parse_from_str(iso, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0);
    };
    if time == "24:00:00" {
        let next = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?.succ_opt()?;
        return next.and_hms_opt(0, 0, 0);
    }
    NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S").ok()
}

/// Interpret a wall-clock time in `tz`: a fold takes the earlier instant, a
/// gap shifts forward by one hour.
fn resolve_local(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest(),
    }
}
