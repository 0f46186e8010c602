//! Schema checks on translated events.
//!
//! Translation should never produce an event that fails here; this is the
//! last line before events leave the crate.

use chrono::{NaiveDate, NaiveTime};
use url::Url;

use crate::error::{IngestError, Result};
use crate::event::{CanonicalEvent, RecurringEvent, SingleEvent, TimeOfDay};
use crate::timezone::is_valid_zone;

/// Check `event` against the canonical schema and hand it back unchanged.
///
/// # Errors
///
/// Returns [`IngestError::Validation`] describing the first violated rule.
pub fn validate_event(event: CanonicalEvent) -> Result<CanonicalEvent> {
    match &event {
        CanonicalEvent::Single(single) => validate_single(single)?,
        CanonicalEvent::Recurring(series) => validate_recurring(series)?,
    }
    Ok(event)
}

fn validate_single(e: &SingleEvent) -> Result<()> {
    require_uid(&e.uid)?;
    let date = iso_date("date", &e.date)?;
    validate_end_date(date, e.end_date.as_deref())?;
    validate_timing(e.all_day, e.timezone.as_deref(), e.time.as_ref())?;
    validate_url(e.url.as_deref())
}

fn validate_recurring(e: &RecurringEvent) -> Result<()> {
    require_uid(&e.uid)?;
    if e.rrule.trim().is_empty() {
        return Err(invalid("rrule is empty"));
    }
    let start = iso_date("startDate", &e.start_date)?;
    validate_end_date(start, e.end_date.as_deref())?;
    validate_timing(e.all_day, e.timezone.as_deref(), e.time.as_ref())?;
    validate_url(e.url.as_deref())?;

    for (i, skip) in e.skip_dates.iter().enumerate() {
        iso_date("skipDates", skip)?;
        if e.skip_dates[..i].contains(skip) {
            return Err(invalid(format!("duplicate skip date {skip}")));
        }
    }

    let expected = RecurringEvent::series_id(&e.uid, &e.start_date);
    if e.id != expected {
        return Err(invalid(format!("id '{}' does not match '{expected}'", e.id)));
    }
    Ok(())
}

fn require_uid(uid: &str) -> Result<()> {
    if uid.trim().is_empty() {
        return Err(invalid("uid is empty"));
    }
    Ok(())
}

fn validate_end_date(start: NaiveDate, end_date: Option<&str>) -> Result<()> {
    let Some(end_date) = end_date else {
        return Ok(());
    };
    if iso_date("endDate", end_date)? <= start {
        return Err(invalid(format!("endDate {end_date} is not after the start date")));
    }
    Ok(())
}

fn validate_timing(all_day: bool, timezone: Option<&str>, time: Option<&TimeOfDay>) -> Result<()> {
    if all_day {
        if timezone.is_some() || time.is_some() {
            return Err(invalid("all-day event carries a timezone or time of day"));
        }
        return Ok(());
    }

    let time = time.ok_or_else(|| invalid("timed event has no time of day"))?;
    clock_time("startTime", &time.start_time)?;
    clock_time("endTime", &time.end_time)?;
    match timezone {
        Some(zone) if is_valid_zone(zone) => Ok(()),
        Some(zone) => Err(invalid(format!("unknown timezone '{zone}'"))),
        None => Err(invalid("timed event has no timezone")),
    }
}

fn validate_url(url: Option<&str>) -> Result<()> {
    match url {
        Some(url) => Url::parse(url)
            .map(|_| ())
            .map_err(|e| invalid(format!("url '{url}': {e}"))),
        None => Ok(()),
    }
}

fn iso_date(field: &str, value: &str) -> Result<NaiveDate> {
    if value.len() != 10 {
        return Err(invalid(format!("{field} '{value}' is not YYYY-MM-DD")));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| invalid(format!("{field} '{value}' is not YYYY-MM-DD")))
}

fn clock_time(field: &str, value: &str) -> Result<NaiveTime> {
    if value.len() != 5 {
        return Err(invalid(format!("{field} '{value}' is not HH:mm")));
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| invalid(format!("{field} '{value}' is not HH:mm")))
}

fn invalid(message: impl Into<String>) -> IngestError {
    IngestError::Validation(message.into())
}
