//! # Line Records and Pricing
//!
//! A [`LineRecord`] holds the editable cost fields for one catalog item.
//! [`price`] turns a record into a monetary total:
//!
//! ```text
//! total = rate × qty' × nb' × (1 + markup / 100)
//!
//! qty' = qty if qty > 0 else 1
//! nb'  = nb  if nb  > 0 else 1
//! ```
//!
//! A zero rate means "no cost entered" and always prices to exactly 0,
//! whatever the other fields hold.
//!
//! ## Example
//!
//! ```rust
//! use quote_core::line::{price, LineRecord};
//!
//! let line = LineRecord { qty: 2.0, nb: 3.0, rate: 100.0, ..LineRecord::default() };
//! assert!((price(&line) - 660.0).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

use crate::input::{self, de_amount, de_optional_percent, de_text};

/// Markup applied to a line when none has been entered.
pub const DEFAULT_MARKUP_PERCENT: f64 = 10.0;

/// Editable values for one line item.
///
/// Field names match the persisted record: `qty`, `nb` (number of
/// units, e.g. days), `rate`, `disc` (markup percent), `note`, `unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    #[serde(default, deserialize_with = "de_amount")]
    pub qty: f64,

    #[serde(default, deserialize_with = "de_amount")]
    pub nb: f64,

    /// Unit rate; 0 means nothing has been priced
    #[serde(default, deserialize_with = "de_amount")]
    pub rate: f64,

    /// Markup percent. `None` (null on the wire) means the 10% default;
    /// an explicit 0 is kept.
    #[serde(
        rename = "disc",
        default = "default_markup",
        deserialize_with = "de_optional_percent"
    )]
    pub markup_percent: Option<f64>,

    #[serde(default, deserialize_with = "de_text")]
    pub note: String,

    /// Unit label; blank means the catalog default
    #[serde(default, deserialize_with = "de_text")]
    pub unit: String,
}

fn default_markup() -> Option<f64> {
    Some(DEFAULT_MARKUP_PERCENT)
}

impl Default for LineRecord {
    fn default() -> Self {
        LineRecord {
            qty: 0.0,
            nb: 0.0,
            rate: 0.0,
            markup_percent: default_markup(),
            note: String::new(),
            unit: String::new(),
        }
    }
}

impl LineRecord {
    /// A default record carrying the catalog's unit.
    pub fn with_unit(unit: impl Into<String>) -> Self {
        LineRecord {
            unit: unit.into(),
            ..LineRecord::default()
        }
    }

    /// Markup that pricing will use.
    pub fn effective_markup(&self) -> f64 {
        self.markup_percent.unwrap_or(DEFAULT_MARKUP_PERCENT)
    }

    /// Re-apply the input clamps to every numeric field.
    pub fn sanitize(&mut self) {
        self.qty = input::sanitize_amount(self.qty);
        self.nb = input::sanitize_amount(self.nb);
        self.rate = input::sanitize_amount(self.rate);
        self.markup_percent = self.markup_percent.map(input::sanitize_percent);
    }

    /// Whether the line contributes to any total.
    pub fn has_value(&self) -> bool {
        price(self) > 0.0
    }

    /// Apply operator text edits. Fields left `None` are untouched.
    pub fn apply(&mut self, edit: &LineInput) {
        if let Some(qty) = &edit.qty {
            self.qty = input::parse_amount(qty);
        }
        if let Some(nb) = &edit.nb {
            self.nb = input::parse_amount(nb);
        }
        if let Some(rate) = &edit.rate {
            self.rate = input::parse_amount(rate);
        }
        if let Some(markup) = &edit.markup {
            self.markup_percent = Some(input::parse_percent(markup));
        }
        if let Some(note) = &edit.note {
            self.note = note.clone();
        }
        if let Some(unit) = &edit.unit {
            self.unit = unit.clone();
        }
    }
}

/// Raw text for a line edit, as typed by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInput {
    pub qty: Option<String>,
    pub nb: Option<String>,
    pub rate: Option<String>,
    pub markup: Option<String>,
    pub note: Option<String>,
    pub unit: Option<String>,
}

impl LineInput {
    pub fn is_empty(&self) -> bool {
        *self == LineInput::default()
    }
}

/// Total for one line.
pub fn price(line: &LineRecord) -> f64 {
    if line.rate == 0.0 {
        return 0.0;
    }
    let qty = if line.qty > 0.0 { line.qty } else { 1.0 };
    let nb = if line.nb > 0.0 { line.nb } else { 1.0 };
    qty * nb * line.rate * (1.0 + line.effective_markup() / 100.0)
}
