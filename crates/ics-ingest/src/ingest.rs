//! The ingestion pipeline: preprocess, tokenize, translate, merge, validate.

use crate::component::parse;
use crate::config::IngestOptions;
use crate::diagnostics::{DiagnosticSink, Reporter};
use crate::event::CanonicalEvent;
use crate::merge::merge_exceptions;
use crate::preprocess::preprocess;
use crate::timezone::TimezoneResolver;
use crate::translate::EventTranslator;
use crate::validate::validate_event;

/// Ingest ICS text with default options.
///
/// Never fails: malformed components are dropped and reported to `sink`.
///
/// # Examples
///
/// ```
/// use ics_ingest::{ingest, CanonicalEvent};
///
/// let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:1\r\n\
///            SUMMARY:Launch\r\nDTSTART:20240110\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
/// let mut diagnostics = Vec::new();
/// let events = ingest(ics, &mut diagnostics);
///
/// assert_eq!(events.len(), 1);
/// match &events[0] {
///     CanonicalEvent::Single(e) => {
///         assert_eq!(e.date, "2024-01-10");
///         assert!(e.all_day);
///     }
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
pub fn ingest(text: &str, sink: &mut dyn DiagnosticSink) -> Vec<CanonicalEvent> {
    ingest_with_options(text, &IngestOptions::default(), sink)
}

/// Ingest ICS text with explicit [`IngestOptions`].
///
/// Each component is translated independently, so one bad record never
/// affects its neighbours. A tokenizer failure part-way through the feed is
/// reported as an error diagnostic and the components read before it are
/// still returned.
pub fn ingest_with_options(
    text: &str,
    options: &IngestOptions,
    sink: &mut dyn DiagnosticSink,
) -> Vec<CanonicalEvent> {
    let repaired;
    let text = if options.preprocess {
        repaired = preprocess(text);
        repaired.as_str()
    } else {
        text
    };

    let tree = parse(text);
    if let Some(error) = &tree.error {
        Reporter::new(sink).error(None, error.to_string());
    }
    tracing::debug!(components = tree.events.len(), "tokenized feed");

    let resolver = TimezoneResolver::with_aliases(options.timezone_aliases.clone());
    let translator = EventTranslator::new(&resolver);
    let translated: Vec<_> = tree
        .events
        .iter()
        .filter_map(|component| translator.translate(component, sink))
        .collect();

    let merged = merge_exceptions(translated, options, sink);

    let mut report = Reporter::new(sink);
    let events: Vec<_> = merged
        .into_iter()
        .filter_map(|event| {
            let uid = event.uid().to_string();
            match validate_event(event) {
                Ok(event) => Some(event),
                Err(e) => {
                    report.debug(Some(&uid), format!("Dropping event: {e}"));
                    None
                }
            }
        })
        .collect();
    tracing::debug!(events = events.len(), "ingested feed");
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Diagnostic, Severity};

    fn calendar(body: &str) -> String {
        format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//test//EN\r\n{body}END:VCALENDAR\r\n")
    }

    #[test]
    fn test_empty_feed() {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        assert!(ingest("", &mut diagnostics).is_empty());
        assert!(ingest(&calendar(""), &mut diagnostics).is_empty());
    }

    #[test]
    fn test_bare_dates_repaired_before_tokenizing() {
        let ics = calendar("BEGIN:VEVENT\r\nUID:a\r\nDTSTART:20240110\r\nDTEND:20240112\r\nEND:VEVENT\r\n");
        let mut diagnostics = Vec::new();
        let events = ingest(&ics, &mut diagnostics);
        let e = events[0].as_single().unwrap();
        assert!(e.all_day);
        assert_eq!(e.end_date.as_deref(), Some("2024-01-11"));
        assert!(diagnostics.is_empty(), "got: {diagnostics:?}");
    }

    #[test]
    fn test_preprocess_disabled_treats_bare_dates_as_midnight() {
        let ics = calendar("BEGIN:VEVENT\r\nUID:a\r\nDTSTART:20240110\r\nEND:VEVENT\r\n");
        let options = IngestOptions {
            preprocess: false,
            ..IngestOptions::default()
        };
        let mut diagnostics = Vec::new();
        let events = ingest_with_options(&ics, &options, &mut diagnostics);
        let e = events[0].as_single().unwrap();
        assert!(!e.all_day);
        assert_eq!(e.time.as_ref().unwrap().start_time, "00:00");
        assert_eq!(diagnostics[0].severity, Severity::Info);
    }

    #[test]
    fn test_aliases_from_options() {
        let ics = calendar(
            "BEGIN:VEVENT\r\nUID:a\r\nDTSTART;TZID=Head Office:20240110T090000\r\nEND:VEVENT\r\n",
        );
        let mut options = IngestOptions::default();
        options
            .timezone_aliases
            .insert("Head Office".into(), "America/Chicago".into());
        let mut diagnostics = Vec::new();
        let events = ingest_with_options(&ics, &options, &mut diagnostics);
        let e = events[0].as_single().unwrap();
        assert_eq!(e.timezone.as_deref(), Some("America/Chicago"));
        assert_eq!(e.time.as_ref().unwrap().start_time, "09:00");
    }

    #[test]
    fn test_truncated_feed_reports_error_and_keeps_prior_events() {
        let ics = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:a\r\nDTSTART;VALUE=DATE:20240110\r\nEND:VEVENT\r\nEND:VCALENDAR\r\nBEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:b\r\n";
        let mut diagnostics = Vec::new();
        let events = ingest(ics, &mut diagnostics);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid(), "a");
        assert!(diagnostics.iter().any(|d| d.severity == Severity::Error));
    }
}
