//! # Saved-Quote Registry
//!
//! Ordered collection of [`SavedQuote`]s keyed by id. Saving a quote whose
//! id already exists replaces it in place, so a quote keeps its slot in
//! the listing however often it is re-saved.
//!
//! On disk the registry is wrapped in a versioned envelope:
//!
//! ```json
//! { "version": "0.1.0", "quotes": [ ... ] }
//! ```
//!
//! A bare JSON array of quotes is accepted as well.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{QuoteError, QuoteResult};
use crate::quote::SavedQuote;

/// Current registry file schema version.
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Saved quotes in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteRegistry {
    quotes: Vec<SavedQuote>,
}

/// One line of a registry listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingEntry {
    pub id: String,
    pub title: String,
    pub saved_at: DateTime<Utc>,
    pub reference: String,
}

impl QuoteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a quote, replacing any quote with the same id in place.
    ///
    /// Returns `true` when an existing quote was replaced.
    pub fn upsert(&mut self, quote: SavedQuote) -> bool {
        match self.quotes.iter_mut().find(|q| q.id == quote.id) {
            Some(slot) => {
                *slot = quote;
                true
            }
            None => {
                self.quotes.push(quote);
                false
            }
        }
    }

    /// Quotes in reverse collection order.
    ///
    /// Replacing a quote keeps its slot, so this is "most recently added"
    /// rather than "most recently saved".
    pub fn newest_first(&self) -> impl Iterator<Item = &SavedQuote> + '_ {
        self.quotes.iter().rev()
    }

    /// Listing entries in display order.
    pub fn listing(&self) -> Vec<ListingEntry> {
        self.newest_first()
            .map(|q| ListingEntry {
                id: q.id.clone(),
                title: q.display_title().to_string(),
                saved_at: q.saved_at,
                reference: q.project.reference.clone(),
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&SavedQuote> {
        self.quotes.iter().find(|q| q.id == id)
    }

    /// Like [`get`](Self::get), but a missing id is a [`QuoteError::NotFound`].
    pub fn require(&self, id: &str) -> QuoteResult<&SavedQuote> {
        self.get(id).ok_or_else(|| QuoteError::not_found(id))
    }

    /// Remove and return the quote with `id`.
    pub fn remove(&mut self, id: &str) -> QuoteResult<SavedQuote> {
        let index = self
            .quotes
            .iter()
            .position(|q| q.id == id)
            .ok_or_else(|| QuoteError::not_found(id))?;
        Ok(self.quotes.remove(index))
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Decode registry file contents, returning the registry and the
    /// schema version the file declared (`None` for a bare array).
    pub fn from_json(text: &str, source_name: &str) -> QuoteResult<(Self, Option<String>)> {
        let parse_error = |e: serde_json::Error| QuoteError::parse(source_name, e.to_string());
        // Numeric map keys under `values` need serde_json's own key parsing,
        // which untagged enums lose.
        let value: serde_json::Value = serde_json::from_str(text).map_err(parse_error)?;
        Ok(match value {
            serde_json::Value::Array(_) => {
                let quotes = Vec::<SavedQuote>::deserialize(value).map_err(parse_error)?;
                (QuoteRegistry { quotes }, None)
            }
            other => {
                let Envelope { version, quotes } = Envelope::deserialize(other).map_err(parse_error)?;
                (QuoteRegistry { quotes }, Some(version))
            }
        })
    }

    /// Encode in the versioned envelope.
    pub fn to_json_pretty(&self) -> QuoteResult<String> {
        let envelope = EnvelopeRef {
            version: SCHEMA_VERSION,
            quotes: &self.quotes,
        };
        serde_json::to_string_pretty(&envelope).map_err(|e| QuoteError::SerializationError {
            reason: e.to_string(),
        })
    }
}

#[derive(Deserialize)]
struct Envelope {
    version: String,
    quotes: Vec<SavedQuote>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: &'a str,
    quotes: &'a [SavedQuote],
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quote(id: &str, title: &str) -> SavedQuote {
        let mut project = crate::project::ProjectMetadata::default();
        project.title = title.to_string();
        SavedQuote {
            id: id.to_string(),
            saved_at: Utc.with_ymd_and_hms(2025, 2, 14, 12, 0, 0).unwrap(),
            project,
            extra: Default::default(),
            values: Default::default(),
        }
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut registry = QuoteRegistry::new();
        assert!(!registry.upsert(quote("a", "First")));
        assert!(!registry.upsert(quote("b", "Second")));
        assert!(registry.upsert(quote("a", "First, revised")));

        assert_eq!(registry.len(), 2);
        let ids: Vec<&str> = registry.newest_first().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(registry.get("a").unwrap().project.title, "First, revised");
    }

    #[test]
    fn test_remove() {
        let mut registry = QuoteRegistry::new();
        registry.upsert(quote("a", "First"));
        registry.upsert(quote("b", "Second"));

        let removed = registry.remove("a").unwrap();
        assert_eq!(removed.id, "a");
        assert_eq!(registry.len(), 1);

        let err = registry.remove("a").unwrap_err();
        assert_eq!(err, QuoteError::not_found("a"));
        assert!(registry.require("zzz").is_err());
    }

    #[test]
    fn test_listing_falls_back_to_id() {
        let mut registry = QuoteRegistry::new();
        registry.upsert(quote("1700000000000", ""));
        registry.upsert(quote("b", "Named"));

        let listing = registry.listing();
        assert_eq!(listing[0].title, "Named");
        assert_eq!(listing[1].title, "1700000000000");
    }

    #[test]
    fn test_envelope_roundtrip() {
        let mut registry = QuoteRegistry::new();
        registry.upsert(quote("a", "First"));

        let json = registry.to_json_pretty().unwrap();
        assert!(json.contains("\"version\": \"0.1.0\""));

        let (decoded, version) = QuoteRegistry::from_json(&json, "quotes.json").unwrap();
        assert_eq!(decoded, registry);
        assert_eq!(version.as_deref(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_roundtrip_keeps_line_values() {
        let pos = crate::store::Position::new(2, 1, 0);
        let mut priced = quote("a", "Priced");
        priced.values.insert(
            pos,
            crate::line::LineRecord {
                rate: 450.0,
                ..Default::default()
            },
        );
        let mut registry = QuoteRegistry::new();
        registry.upsert(priced);

        let json = registry.to_json_pretty().unwrap();
        let (decoded, _) = QuoteRegistry::from_json(&json, "quotes.json").unwrap();
        assert_eq!(decoded.get("a").unwrap().values.get(pos).unwrap().rate, 450.0);

        let bare = format!("[{}]", decoded.get("a").unwrap().to_json_pretty().unwrap());
        let (decoded, _) = QuoteRegistry::from_json(&bare, "quotes.json").unwrap();
        assert_eq!(decoded.get("a").unwrap().values.len(), 1);
    }

    #[test]
    fn test_accepts_bare_array() {
        let json = r#"[{"id": "x", "savedAt": "2025-01-01T00:00:00Z", "project": {"title": "Bare"}}]"#;
        let (registry, version) = QuoteRegistry::from_json(json, "quotes.json").unwrap();
        assert_eq!(registry.len(), 1);
        assert!(version.is_none());
    }

    #[test]
    fn test_rejects_garbage() {
        let err = QuoteRegistry::from_json("{\"quotes\": 3}", "quotes.json").unwrap_err();
        assert_eq!(err.error_code(), "PARSE_ERROR");
    }
}
