//! Error types for ics-ingest operations.
//!
//! None of these ever escape [`crate::ingest()`]: the entry point turns each
//! one into a diagnostic and drops the affected record.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("ICS parse error: {0}")]
    Parse(String),

    #[error("Invalid timestamp '{raw}': {reason}")]
    InvalidTimestamp { raw: String, reason: String },

    #[error("Invalid RRULE: {0}")]
    InvalidRule(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl IngestError {
    pub(crate) fn invalid_timestamp(raw: &str, reason: impl Into<String>) -> Self {
        IngestError::InvalidTimestamp {
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
