//! # Saved Quotes
//!
//! The persisted unit: project header, top sheet extras and a snapshot of
//! every line value, stamped with an id and a save time.
//!
//! ## JSON shape
//!
//! ```json
//! {
//!   "id": "ALPHA-0042",
//!   "savedAt": "2025-03-01T10:15:00Z",
//!   "project": { "title": "Spring Launch", "ref": "ALPHA-0042", "margin": 25, ... },
//!   "extra": { "ts-vat-pct": "20", "ts-cutdown": "0", ... },
//!   "values": { "0": { "0": { "0": { "qty": 1, "nb": 2, "rate": 800, "disc": 10, "note": "", "unit": "day" } } } }
//! }
//! ```
//!
//! Decoding is all-or-nothing: [`SavedQuote::from_json`] either returns a
//! complete quote or a [`QuoteError::Parse`], and nothing is applied to a
//! session until it succeeds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{QuoteError, QuoteResult};
use crate::project::{ExtraFields, ProjectMetadata};
use crate::store::ValuesSnapshot;

/// Id used for exports when the project has no reference.
pub const EXPORT_FALLBACK_ID: &str = "quote";

/// A quote as stored in the registry or an export file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedQuote {
    pub id: String,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub project: ProjectMetadata,
    /// Top sheet fields; older files call this `tsExtra`
    #[serde(default, alias = "tsExtra")]
    pub extra: ExtraFields,
    #[serde(default)]
    pub values: ValuesSnapshot,
}

impl SavedQuote {
    /// Decode a quote from JSON text.
    ///
    /// `source_name` names the input (a file path, "current", ...) in the
    /// error message.
    pub fn from_json(text: &str, source_name: &str) -> QuoteResult<Self> {
        serde_json::from_str(text).map_err(|e| QuoteError::parse(source_name, e.to_string()))
    }

    /// Encode as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> QuoteResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| QuoteError::SerializationError {
            reason: e.to_string(),
        })
    }

    /// File name for an export: `quote-{id}-{YYYY-MM-DD}.json`.
    pub fn export_file_name(&self) -> String {
        let id: String = self
            .id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("quote-{}-{}.json", id, self.saved_at.format("%Y-%m-%d"))
    }

    /// Title for listings, falling back to the id.
    pub fn display_title(&self) -> &str {
        match self.project.title.trim() {
            "" => &self.id,
            title => title,
        }
    }
}

/// Id for a registry save: the reference, or the save time in
/// milliseconds when the reference is blank.
pub fn save_id(project: &ProjectMetadata, now: DateTime<Utc>) -> String {
    project
        .reference_id()
        .map(str::to_string)
        .unwrap_or_else(|| now.timestamp_millis().to_string())
}

/// Id for an export: the reference, or [`EXPORT_FALLBACK_ID`].
pub fn export_id(project: &ProjectMetadata) -> String {
    project
        .reference_id()
        .unwrap_or(EXPORT_FALLBACK_ID)
        .to_string()
}
