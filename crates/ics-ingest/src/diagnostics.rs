//! Structured diagnostics emitted while ingesting a feed.
//!
//! Every recoverable anomaly (a repaired timestamp, a mapped or unknown
//! timezone, a dropped exception, a rejected event) is reported through a
//! [`DiagnosticSink`]. Reporting never influences control flow: the engine
//! keeps going regardless of what a sink does with the message.

use serde::Serialize;

/// How noteworthy a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

/// One reported anomaly, optionally correlated with the `UID` of the
/// component it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, uid: Option<&str>) -> Self {
        Self {
            severity,
            message: message.into(),
            uid: uid.map(str::to_string),
        }
    }
}

/// Receiver for diagnostics.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Collects diagnostics in emission order.
impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&mut self, _diagnostic: Diagnostic) {}
}

/// Forwards diagnostics to `tracing` at the matching level, with the uid
/// attached as a structured field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        let uid = diagnostic.uid.as_deref().unwrap_or("");
        match diagnostic.severity {
            Severity::Debug => tracing::debug!(uid, "{}", diagnostic.message),
            Severity::Info => tracing::info!(uid, "{}", diagnostic.message),
            Severity::Warning => tracing::warn!(uid, "{}", diagnostic.message),
            Severity::Error => tracing::error!(uid, "{}", diagnostic.message),
        }
    }
}

/// Thin helper so pipeline stages can report through `&mut dyn DiagnosticSink`
/// with one call per severity.
pub(crate) struct Reporter<'a> {
    sink: &'a mut dyn DiagnosticSink,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(sink: &'a mut dyn DiagnosticSink) -> Self {
        Self { sink }
    }

    pub(crate) fn emit(&mut self, severity: Severity, uid: Option<&str>, message: impl Into<String>) {
        self.sink.report(Diagnostic::new(severity, message, uid));
    }

    pub(crate) fn debug(&mut self, uid: Option<&str>, message: impl Into<String>) {
        self.emit(Severity::Debug, uid, message);
    }

    pub(crate) fn info(&mut self, uid: Option<&str>, message: impl Into<String>) {
        self.emit(Severity::Info, uid, message);
    }

    pub(crate) fn warn(&mut self, uid: Option<&str>, message: impl Into<String>) {
        self.emit(Severity::Warning, uid, message);
    }

    pub(crate) fn error(&mut self, uid: Option<&str>, message: impl Into<String>) {
        self.emit(Severity::Error, uid, message);
    }
}
