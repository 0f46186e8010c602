//! # ics-ingest
//!
//! Turns raw iCalendar (ICS) feeds into a clean list of canonical events.
//!
//! Real-world feeds are sloppy: bare dates without `VALUE=DATE`, Windows zone
//! names, `T240000` end-of-day markers, overrides whose series is missing.
//! Ingestion repairs what it can, drops what it cannot, and reports every
//! decision through a [`DiagnosticSink`] instead of failing the whole feed.
//!
//! ## Modules
//!
//! - [`preprocess`](mod@preprocess) — `VALUE=DATE` repair of bare date lines
//! - [`timezone`] — vendor/Windows zone name → IANA resolution
//! - [`component`] — typed accessors over the `ical` tokenizer output
//! - [`normalize`] — timestamp → zoned instant, with fallbacks
//! - [`translate`](mod@translate) — one VEVENT → one [`CanonicalEvent`]
//! - [`merge`] — fold `RECURRENCE-ID` overrides into their series
//! - [`validate`] — schema checks on the final events
//! - [`ingest`](mod@ingest) — the full pipeline
//! - [`config`] — [`IngestOptions`]
//! - [`diagnostics`] — the reporting channel
//! - [`error`] — Error types

pub mod component;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod ingest;
pub mod merge;
pub mod normalize;
pub mod preprocess;
pub mod timezone;
pub mod translate;
pub mod validate;

pub use component::{parse, CalendarComponent, CalendarTime, ComponentTree};
pub use config::IngestOptions;
pub use diagnostics::{Diagnostic, DiagnosticSink, NullSink, Severity, TracingSink};
pub use error::{IngestError, Result};
pub use event::{CanonicalEvent, RecurringEvent, SingleEvent, TimeOfDay};
pub use ingest::{ingest, ingest_with_options};
pub use merge::merge_exceptions;
pub use normalize::{to_zoned_instant, Recovery, TimestampNormalizer, ZonedInstant};
pub use preprocess::preprocess;
pub use timezone::{normalize_timezone, TimezoneResolver};
pub use translate::{translate, EventTranslator, TranslatedEvent};
pub use validate::validate_event;
