//! Folding `RECURRENCE-ID` overrides back into their series.

use std::collections::HashMap;

use crate::config::IngestOptions;
use crate::diagnostics::{DiagnosticSink, Reporter};
use crate::event::CanonicalEvent;
use crate::translate::TranslatedEvent;

/// Merge translated components into the final event list.
///
/// Each override's own date is added to its series' `skip_dates` and the
/// override is then suppressed, unless
/// [`IngestOptions::retain_folded_exceptions`] is set. Overrides whose series
/// is missing are kept as they are. Output order: series and plain events in
/// document order, then unmatched overrides, then retained folded ones.
///
/// A later base event with the same UID replaces an earlier one in place.
pub fn merge_exceptions(
    translated: Vec<TranslatedEvent>,
    options: &IngestOptions,
    sink: &mut dyn DiagnosticSink,
) -> Vec<CanonicalEvent> {
    let mut report = Reporter::new(sink);
    let mut bases: Vec<CanonicalEvent> = Vec::new();
    let mut by_uid: HashMap<String, usize> = HashMap::new();
    let mut exceptions = Vec::new();

    for item in translated {
        if item.is_exception {
            exceptions.push(item);
            continue;
        }
        let uid = item.event.uid().to_string();
        match by_uid.get(&uid) {
            Some(&index) => {
                report.warn(
                    Some(&uid),
                    format!("Duplicate UID \"{uid}\", keeping the later definition"),
                );
                bases[index] = item.event;
            }
            None => {
                by_uid.insert(uid, bases.len());
                bases.push(item.event);
            }
        }
    }

    let mut unmatched = Vec::new();
    let mut folded = Vec::new();
    for exception in exceptions {
        let uid = exception.event.uid();
        let Some(&index) = by_uid.get(uid) else {
            report.info(
                Some(uid),
                "Override has no matching series, keeping it as a standalone event",
            );
            unmatched.push(exception.event);
            continue;
        };

        let skip_date = match &exception.event {
            CanonicalEvent::Single(single) => single.date.clone(),
            CanonicalEvent::Recurring(_) => {
                report.warn(
                    Some(uid),
                    "Override carries its own recurrence rule, dropping it",
                );
                continue;
            }
        };
        let CanonicalEvent::Recurring(series) = &mut bases[index] else {
            report.warn(
                Some(uid),
                "Override targets an event that does not recur, dropping it",
            );
            continue;
        };
        if series.push_skip_date(&skip_date) {
            report.debug(Some(uid), format!("Skipping overridden instance {skip_date}"));
        }
        folded.push(exception.event);
    }

    if options.retain_folded_exceptions {
        unmatched.append(&mut folded);
    }
    bases.append(&mut unmatched);
    bases
}
