//! # Presentation Layer
//!
//! Display identity derived from the catalog arena. Nothing here is ever
//! used to look up values; the store is keyed by [`Position`] only.
//!
//! - Codes `G`..`K` display as `D`..`H`.
//! - Every `B` section is numbered `B-1`, `B-2`, ... under a single
//!   "Production Image" banner.
//! - The `C`/`D`/`E`/`F` sections are numbered `C-1`.. under a single
//!   "Post Production" banner.
//!
//! Also holds the money display policy: an aggregate that is not positive
//! renders as the absent marker, anything else as a formatted amount that
//! views emphasize.
//!
//! [`Position`]: crate::store::Position

use std::fmt;

use crate::catalog::Catalog;

/// Rendered in place of an empty (zero) aggregate.
pub const ABSENT_MARKER: &str = "—";

const PRODUCTION_IMAGE: GroupBanner = GroupBanner {
    code: "B",
    label: "Production Image",
};

const POST_PRODUCTION: GroupBanner = GroupBanner {
    code: "C",
    label: "Post Production",
};

/// Catalog codes that merge under the post production banner.
const POST_PRODUCTION_CODES: [&str; 4] = ["C", "D", "E", "F"];

/// Heading printed before the first section of a merged group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupBanner {
    pub code: &'static str,
    pub label: &'static str,
}

/// How one catalog section is labelled in every view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMeta {
    /// Catalog position of the section
    pub index: usize,
    /// Displayed code ("A", "B-3", "D", ...)
    pub display_code: String,
    /// Name without the leading code prefix
    pub label: String,
    /// Banner to show before this section, if it opens a group
    pub group: Option<GroupBanner>,
    /// Whether the section is nested under a group banner
    pub is_sub: bool,
}

/// Remap a standalone catalog code to its displayed code.
pub fn remap_code(code: &str) -> &str {
    match code {
        "G" => "D",
        "H" => "E",
        "I" => "F",
        "J" => "G",
        "K" => "H",
        other => other,
    }
}

/// Strip a leading `"X. "` code prefix (X in A..K) from a section name.
pub fn section_label(name: &str) -> &str {
    let bytes = name.as_bytes();
    if bytes.len() >= 2 && (b'A'..=b'K').contains(&bytes[0]) && bytes[1] == b'.' {
        name[2..].trim_start()
    } else {
        name
    }
}

/// Display metadata for every section, in catalog order.
pub fn section_meta(catalog: &Catalog) -> Vec<SectionMeta> {
    let mut production_count = 0;
    let mut post_count = 0;

    catalog
        .sections
        .iter()
        .enumerate()
        .map(|(index, section)| {
            let (display_code, group, is_sub) = if section.code == "B" {
                production_count += 1;
                let group = (production_count == 1).then_some(PRODUCTION_IMAGE);
                (format!("B-{production_count}"), group, true)
            } else if POST_PRODUCTION_CODES.contains(&section.code.as_str()) {
                post_count += 1;
                let group = (post_count == 1).then_some(POST_PRODUCTION);
                (format!("C-{post_count}"), group, true)
            } else {
                (remap_code(&section.code).to_string(), None, false)
            };
            SectionMeta {
                index,
                display_code,
                label: section_label(&section.name).to_string(),
                group,
                is_sub,
            }
        })
        .collect()
}

fn shows_amount(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// An aggregate as a view shows it.
#[derive(Debug, Clone, PartialEq)]
pub enum AmountDisplay {
    /// Nothing entered (the aggregate is zero), or nothing meaningful
    /// (not finite)
    Absent,
    /// A positive amount, formatted
    Amount(String),
}

impl AmountDisplay {
    /// Full money format (`1,234.56`) or the absent marker.
    pub fn money(value: f64) -> Self {
        if shows_amount(value) {
            AmountDisplay::Amount(format_money(value))
        } else {
            AmountDisplay::Absent
        }
    }

    /// Short badge format (`1.2k`) or the absent marker.
    pub fn badge(value: f64) -> Self {
        if shows_amount(value) {
            AmountDisplay::Amount(format_short(value))
        } else {
            AmountDisplay::Absent
        }
    }

    /// Money prefixed with a currency symbol (`€ 1,234.56`).
    pub fn currency(value: f64, currency: &str) -> Self {
        match AmountDisplay::money(value) {
            AmountDisplay::Amount(text) => AmountDisplay::Amount(format!("{currency} {text}")),
            AmountDisplay::Absent => AmountDisplay::Absent,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, AmountDisplay::Absent)
    }

    /// Positive amounts get highlighted in every view.
    pub fn is_emphasized(&self) -> bool {
        !self.is_absent()
    }
}

impl fmt::Display for AmountDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmountDisplay::Absent => f.write_str(ABSENT_MARKER),
            AmountDisplay::Amount(text) => f.write_str(text),
        }
    }
}

/// Two decimals with comma thousands separators: `1234567.891` → `1,234,567.89`.
pub fn format_money(value: f64) -> String {
    if !value.is_finite() {
        return "0.00".to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}

/// Compact badge format: `950`, `12.5k`, `1.2M`.
pub fn format_short(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}k", value / 1_000.0)
    } else {
        format!("{value:.0}")
    }
}
