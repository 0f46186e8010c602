//! Ingestion options.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Options for [`crate::ingest_with_options`].
///
/// Every field has a default, so a partial JSON document such as
/// `{"retain_folded_exceptions": true}` deserializes cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    /// Also emit exception records that were folded into a base series'
    /// `skipDates`, after the unmatched ones. Off by default: the merge is a
    /// pure suppression.
    pub retain_folded_exceptions: bool,
    /// Extra vendor zone name → IANA name mappings, consulted before the
    /// built-in Windows table.
    pub timezone_aliases: BTreeMap<String, String>,
    /// Run the `VALUE=DATE` repair pass before tokenizing.
    pub preprocess: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            retain_folded_exceptions: false,
            timezone_aliases: BTreeMap::new(),
            preprocess: true,
        }
    }
}
