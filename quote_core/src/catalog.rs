//! # Structure Catalog
//!
//! The read-only list of sections, subsections and priced line items a
//! quote is built against. The catalog is an arena: sections are addressed
//! by their index, subsections by their index within the section and items
//! by their index within the subsection. Section codes are *not* unique
//! (eleven sections share the code `B`), so nothing in the engine keys on
//! them. Display codes are derived separately in [`crate::presentation`].
//!
//! ## TOML shape
//!
//! ```toml
//! [[section]]
//! code = "A"
//! name = "A. Design & Coordination"
//!
//! [[section.subsection]]
//! name = "Creative Development"
//! item = [{ name = "Storyboard artist", unit = "day" }]
//! ```
//!
//! ## Example
//!
//! ```rust
//! use quote_core::catalog;
//!
//! let catalog = catalog::standard().unwrap();
//! assert_eq!(catalog.len(), 21);
//! assert_eq!(catalog.section(0).unwrap().code, "A");
//! ```

use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{QuoteError, QuoteResult};
use crate::store::Position;

/// The catalog shipped with the application.
const STANDARD_CATALOG: &str = include_str!("../../assets/catalog.toml");

static STANDARD: Lazy<QuoteResult<Arc<Catalog>>> =
    Lazy::new(|| Catalog::from_toml(STANDARD_CATALOG).map(Arc::new));

/// The embedded standard catalog, parsed once per process.
pub fn standard() -> QuoteResult<Arc<Catalog>> {
    STANDARD.clone()
}

/// Ordered list of sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(rename = "section", default)]
    pub sections: Vec<Section>,
}

/// A top-level cost category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Catalog code (A..K). Several sections may share one.
    pub code: String,
    /// Full name, usually prefixed with the code ("B. Talent")
    pub name: String,
    #[serde(rename = "subsection", default)]
    pub subsections: Vec<Subsection>,
}

/// A named group of line items within a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subsection {
    pub name: String,
    #[serde(rename = "item", default)]
    pub items: Vec<Item>,
}

/// A priceable line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    /// Default unit shown for the line ("day", "flat", ...)
    pub unit: String,
}

impl Catalog {
    /// Parse a catalog from TOML text.
    ///
    /// Fails when the text is not valid TOML, does not match the catalog
    /// shape, or contains no sections.
    pub fn from_toml(text: &str) -> QuoteResult<Self> {
        let catalog: Catalog =
            toml::from_str(text).map_err(|e| QuoteError::catalog(e.to_string()))?;
        if catalog.sections.is_empty() {
            return Err(QuoteError::catalog("catalog has no sections"));
        }
        Ok(catalog)
    }

    /// Number of sections
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, section: usize) -> Option<&Section> {
        self.sections.get(section)
    }

    pub fn subsection(&self, section: usize, subsection: usize) -> Option<&Subsection> {
        self.section(section)?.subsections.get(subsection)
    }

    pub fn item(&self, pos: Position) -> Option<&Item> {
        self.subsection(pos.section, pos.subsection)?.items.get(pos.item)
    }

    /// Whether `pos` names an existing line item.
    pub fn contains(&self, pos: Position) -> bool {
        self.item(pos).is_some()
    }

    /// Total number of line items across all sections.
    pub fn item_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| s.subsections.iter())
            .map(|sub| sub.items.len())
            .sum()
    }

    /// Every item position in catalog order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.sections.iter().enumerate().flat_map(|(s, section)| {
            section
                .subsections
                .iter()
                .enumerate()
                .flat_map(move |(sub, subsection)| {
                    (0..subsection.items.len()).map(move |item| Position::new(s, sub, item))
                })
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A small three-section catalog used across the crate's tests.
    pub(crate) fn small_catalog() -> Catalog {
        Catalog::from_toml(
            r#"
            [[section]]
            code = "A"
            name = "A. Design"

            [[section.subsection]]
            name = "Creative"
            item = [
                { name = "Treatment", unit = "flat" },
                { name = "Storyboard", unit = "day" },
            ]

            [[section.subsection]]
            name = "Management"
            item = [{ name = "Producer", unit = "day" }]

            [[section]]
            code = "B"
            name = "B. Crew"

            [[section.subsection]]
            name = "Camera"
            item = [
                { name = "Director of photography", unit = "day" },
                { name = "Focus puller", unit = "day" },
            ]

            [[section]]
            code = "B"
            name = "B. Equipment"

            [[section.subsection]]
            name = "Empty"

            [[section.subsection]]
            name = "Lights"
            item = [{ name = "Lighting package", unit = "day" }]
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_standard_catalog_shape() {
        let catalog = standard().unwrap();
        assert_eq!(catalog.len(), 21);

        let codes: Vec<&str> = catalog.sections.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(&codes[..2], &["A", "B"]);
        assert_eq!(codes.iter().filter(|c| **c == "B").count(), 11);
        assert_eq!(&codes[12..], &["C", "D", "E", "F", "G", "H", "I", "J", "K"]);

        // Every section prices at least one item
        for section in &catalog.sections {
            assert!(section.subsections.iter().any(|sub| !sub.items.is_empty()));
        }
    }

    #[test]
    fn test_lookup_missing_positions() {
        let catalog = small_catalog();
        assert!(catalog.item(Position::new(0, 0, 1)).is_some());
        assert!(catalog.item(Position::new(0, 0, 2)).is_none());
        assert!(catalog.item(Position::new(0, 5, 0)).is_none());
        assert!(catalog.item(Position::new(9, 0, 0)).is_none());
        assert!(!catalog.contains(Position::new(2, 0, 0)));
    }

    #[test]
    fn test_positions_in_catalog_order() {
        let catalog = small_catalog();
        let positions: Vec<Position> = catalog.positions().collect();
        assert_eq!(positions.len(), catalog.item_count());
        assert_eq!(positions.len(), 6);
        assert_eq!(positions[0], Position::new(0, 0, 0));
        assert_eq!(positions[2], Position::new(0, 1, 0));
        assert_eq!(positions[5], Position::new(2, 1, 0));
    }

    #[test]
    fn test_rejects_empty_and_malformed() {
        assert!(Catalog::from_toml("").is_err());
        let err = Catalog::from_toml("[[section]]\ncode = 3").unwrap_err();
        assert_eq!(err.error_code(), "CATALOG_ERROR");
    }
}
