//! Translation of one VEVENT into a [`CanonicalEvent`].

use rrule::{RRule, Unvalidated};
use url::Url;

use crate::component::CalendarComponent;
use crate::diagnostics::{DiagnosticSink, Reporter};
use crate::error::{IngestError, Result};
use crate::event::{CanonicalEvent, RecurringEvent, SingleEvent, TimeOfDay};
use crate::normalize::{Recovery, TimestampNormalizer, ZonedInstant};
use crate::timezone::TimezoneResolver;

/// A translated component plus what the merger needs to know about its
/// source.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedEvent {
    pub event: CanonicalEvent,
    /// The source component carried a `RECURRENCE-ID`.
    pub is_exception: bool,
}

/// Translate a component with the built-in timezone table.
///
/// Returns `None` (after reporting why) when the component has no `UID`, no
/// usable start, or an unreadable `RRULE`.
pub fn translate(
    component: &CalendarComponent,
    sink: &mut dyn DiagnosticSink,
) -> Option<CanonicalEvent> {
    let resolver = TimezoneResolver::default();
    EventTranslator::new(&resolver)
        .translate(component, sink)
        .map(|translated| translated.event)
}

#[derive(Debug, Clone, Copy)]
pub struct EventTranslator<'a> {
    normalizer: TimestampNormalizer<'a>,
}

impl<'a> EventTranslator<'a> {
    pub fn new(resolver: &'a TimezoneResolver) -> Self {
        Self {
            normalizer: TimestampNormalizer::new(resolver),
        }
    }

    pub fn translate(
        &self,
        component: &CalendarComponent,
        sink: &mut dyn DiagnosticSink,
    ) -> Option<TranslatedEvent> {
        let mut report = Reporter::new(sink);
        let title = component.summary().unwrap_or_default();

        let Some(uid) = component.uid() else {
            report.warn(None, format!("Skipping event \"{title}\": missing UID"));
            return None;
        };

        let start = match component
            .start()
            .ok_or(IngestError::MissingField("DTSTART"))
            .and_then(|t| self.normalizer.normalize(&t))
        {
            Ok(start) => start,
            Err(e) => {
                report.warn(
                    Some(uid),
                    format!("Skipping event \"{title}\" due to invalid start date: {e}"),
                );
                return None;
            }
        };
        report_recovery(&mut report, uid, "DTSTART", &start);

        let all_day = component.start().is_some_and(|t| t.is_date());
        let specifies_end = component.specifies_end();
        let end = self.resolve_end(component, &start, &title, uid, &mut report);

        let timezone = (!all_day).then(|| start.zone().to_string());
        let time = (!all_day).then(|| TimeOfDay {
            start_time: start.time_of_day(),
            end_time: end.time_of_day(),
        });
        let end_date = inclusive_end_date(&start, &end, all_day, specifies_end);
        let description = component.description().unwrap_or_default();
        let url = resolve_url(component);

        let event = if component.is_recurring() {
            let rrule = match component
                .rrule()
                .ok_or(IngestError::MissingField("RRULE"))
                .and_then(canonical_rrule)
            {
                Ok(rrule) => rrule,
                Err(e) => {
                    report.warn(Some(uid), format!("Skipping recurring event \"{title}\": {e}"));
                    return None;
                }
            };
            let start_date = start.iso_date();
            let mut series = RecurringEvent {
                id: RecurringEvent::series_id(uid, &start_date),
                uid: uid.to_string(),
                title,
                start_date,
                end_date,
                rrule,
                skip_dates: Vec::new(),
                timezone,
                all_day,
                time,
                description,
                url,
            };
            for date in self.skip_dates(component, &start, &series.title, uid, &mut report) {
                series.push_skip_date(&date);
            }
            CanonicalEvent::Recurring(series)
        } else {
            CanonicalEvent::Single(SingleEvent {
                uid: uid.to_string(),
                title,
                date: start.iso_date(),
                end_date,
                timezone,
                all_day,
                time,
                description,
                url,
            })
        };

        Some(TranslatedEvent {
            event,
            is_exception: component.has_recurrence_marker(),
        })
    }

    /// The end instant, expressed in the start's zone. Missing ends collapse
    /// to the start; unreadable or backwards ends are replaced by it.
    fn resolve_end(
        &self,
        component: &CalendarComponent,
        start: &ZonedInstant,
        title: &str,
        uid: &str,
        report: &mut Reporter<'_>,
    ) -> ZonedInstant {
        if !component.specifies_end() {
            return start.clone();
        }
        let end = component
            .end()
            .ok_or(IngestError::MissingField("DTEND"))
            .and_then(|t| self.normalizer.normalize(&t));
        match end {
            Ok(end) if end.instant() < start.instant() => {
                report.warn(
                    Some(uid),
                    format!("Event \"{title}\" ends before it starts, using start date instead"),
                );
                start.clone()
            }
            Ok(end) => {
                report_recovery(report, uid, "DTEND", &end);
                end.in_zone_of(start)
            }
            Err(e) => {
                report.warn(
                    Some(uid),
                    format!("Event \"{title}\" has invalid end date, using start date instead: {e}"),
                );
                start.clone()
            }
        }
    }

    fn skip_dates(
        &self,
        component: &CalendarComponent,
        start: &ZonedInstant,
        title: &str,
        uid: &str,
        report: &mut Reporter<'_>,
    ) -> Vec<String> {
        let mut dates = Vec::new();
        for exdate in component.exdates() {
            match self.normalizer.normalize(&exdate) {
                Ok(zoned) if exdate.is_date() => dates.push(zoned.iso_date()),
                Ok(zoned) => dates.push(zoned.in_zone_of(start).iso_date()),
                Err(e) => report.warn(
                    Some(uid),
                    format!("Skipping invalid EXDATE for event \"{title}\": {e}"),
                ),
            }
        }
        dates
    }
}

/// Inclusive last day of the occurrence, or `None` when it ends on its start
/// day. All-day ends are exclusive on the wire, so one day is taken off.
fn inclusive_end_date(
    start: &ZonedInstant,
    end: &ZonedInstant,
    all_day: bool,
    specifies_end: bool,
) -> Option<String> {
    if !specifies_end {
        return None;
    }
    let last = if all_day {
        end.date().pred_opt()?
    } else {
        end.date()
    };
    (last > start.date()).then(|| last.format("%Y-%m-%d").to_string())
}

/// Re-serialize a rule through the `rrule` crate so formatting is uniform.
///
/// # Errors
///
/// Returns [`IngestError::InvalidRule`] if the rule does not parse.
pub fn canonical_rrule(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let rule: RRule<Unvalidated> = raw
        .parse()
        .map_err(|e| IngestError::InvalidRule(format!("'{raw}': {e}")))?;
    Ok(rule.to_string())
}

/// `URL` if present, otherwise `LOCATION` when it is itself an http(s) URL.
fn resolve_url(component: &CalendarComponent) -> Option<String> {
    component.url().or_else(|| {
        component
            .location()
            .map(|location| location.trim().to_string())
            .filter(|location| is_http_url(location))
    })
}

fn is_http_url(s: &str) -> bool {
    Url::parse(s).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

fn report_recovery(report: &mut Reporter<'_>, uid: &str, field: &str, zoned: &ZonedInstant) {
    match zoned.recovery() {
        Some(Recovery::MappedZone { from, to }) => report.debug(
            Some(uid),
            format!("{field}: mapped timezone \"{from}\" to \"{to}\""),
        ),
        Some(Recovery::UtcFallback { zone }) => report.warn(
            Some(uid),
            format!("{field}: invalid timezone identifier \"{zone}\", falling back to UTC"),
        ),
        Some(Recovery::TextRecovery { raw }) => report.info(
            Some(uid),
            format!("{field}: recovered invalid date \"{raw}\" from its text"),
        ),
        None => {}
    }
}
