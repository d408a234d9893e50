//! # Summary Deriver
//!
//! Produces the client-facing top sheet figures from the rolled-up section
//! totals and three global parameters.
//!
//! ```text
//! all_cost = Σ section totals (every section)
//! L gross  = all_cost × (1 + margin / 100)
//! M net    = L − cutdown            (flat amount, may go negative)
//! Q vat    = M × vat / 100
//! R grand  = M + Q
//! ```
//!
//! Each [`TopSheetRow`] additionally gets a `cost / markup / total` triple
//! from the sections it lists. Rows ignore cutdown and VAT, which only
//! apply to the grand figures.
//!
//! ## Example
//!
//! ```rust
//! use quote_core::summary::{grand_totals, SummaryParams};
//!
//! let params = SummaryParams { margin_percent: 25.0, cutdown: 50.0, vat_percent: 20.0 };
//! let grand = grand_totals(1000.0, &params);
//! assert_eq!(grand.gross_total, 1250.0);
//! assert_eq!(grand.grand_total, 1440.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::project::{ExtraFields, ProjectMetadata, Settings};
use crate::rollup::Totals;

/// Global parameters applied on top of the rolled-up costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryParams {
    pub margin_percent: f64,
    /// Flat deduction applied after margin, before VAT
    pub cutdown: f64,
    pub vat_percent: f64,
}

impl SummaryParams {
    /// Read margin from the project and cutdown/VAT from the top sheet
    /// fields. Blank margin and VAT fall back to `settings`.
    pub fn from_fields(project: &ProjectMetadata, extra: &ExtraFields, settings: &Settings) -> Self {
        SummaryParams {
            margin_percent: project.margin_percent(settings),
            cutdown: extra.cutdown(),
            vat_percent: extra.vat_percent(settings.vat_percent),
        }
    }
}

/// Kind of top sheet line, for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    /// A main category (A, B, C, ...)
    Main,
    /// One section nested under a category (B-3, C-1, ...)
    Sub,
    /// A subtotal across categories
    Subtotal,
}

/// A named top sheet line and the sections it aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopSheetRow {
    pub id: &'static str,
    pub label: &'static str,
    pub sections: &'static [usize],
    pub kind: RowKind,
}

const fn main_row(id: &'static str, label: &'static str, sections: &'static [usize]) -> TopSheetRow {
    TopSheetRow { id, label, sections, kind: RowKind::Main }
}

const fn sub_row(id: &'static str, label: &'static str, sections: &'static [usize]) -> TopSheetRow {
    TopSheetRow { id, label, sections, kind: RowKind::Sub }
}

const fn subtotal_row(id: &'static str, label: &'static str, sections: &'static [usize]) -> TopSheetRow {
    TopSheetRow { id, label, sections, kind: RowKind::Subtotal }
}

/// Top sheet layout for the standard catalog.
pub const TOP_SHEET_ROWS: [TopSheetRow; 25] = [
    main_row("A", "Design & Coordination", &[0]),
    main_row("B", "Production Image", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]),
    sub_row("B-1", "Pre-Production", &[1]),
    sub_row("B-2", "Talent", &[2]),
    sub_row("B-3", "Shooting Crew", &[3]),
    sub_row("B-4", "Shooting Crew Prod Service", &[4]),
    sub_row("B-5", "Equipment", &[5]),
    sub_row("B-6", "Art Department & Beauty", &[6]),
    sub_row("B-7", "Studio", &[7]),
    sub_row("B-8", "Locations", &[8]),
    sub_row("B-9", "Production Photo", &[9]),
    sub_row("B-10", "Hard Disks, Stock, Laboratory", &[10]),
    sub_row("B-11", "Location Expenses, Misc.", &[11]),
    main_row("C", "Post Production", &[12, 13, 14, 15]),
    sub_row("C-1", "Post-Production Image", &[12]),
    sub_row("C-2", "Post-Production Sound & Music", &[13]),
    sub_row("C-3", "Production Digital", &[14]),
    sub_row("C-4", "Post-Production Print", &[15]),
    main_row("D", "Global Delivery Service", &[16]),
    subtotal_row("ST1", "Subtotal 1  (A → D)", &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]),
    main_row("E", "Meals, Hotels & Per Diem", &[17]),
    main_row("F", "Travels", &[18]),
    main_row("G", "Insurances", &[19]),
    main_row("H", "Social Contributions", &[20]),
    subtotal_row("ST2", "Subtotal 2  (E → H)", &[17, 18, 19, 20]),
];

/// Cost, markup and total for one top sheet row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowTotals {
    pub id: String,
    pub label: String,
    pub kind: RowKind,
    /// Σ member section totals
    pub cost: f64,
    /// cost × margin / 100
    pub markup: f64,
    /// cost + markup
    pub total: f64,
}

/// The L / M / Q / R figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GrandTotals {
    pub all_cost: f64,
    /// L
    pub gross_total: f64,
    /// M
    pub net_after_cutdown: f64,
    /// Q
    pub vat_amount: f64,
    /// R
    pub grand_total: f64,
}

/// Everything the top sheet shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub params: SummaryParams,
    pub rows: Vec<RowTotals>,
    pub grand: GrandTotals,
}

impl Summary {
    /// Totals for the row with `id`.
    pub fn row(&self, id: &str) -> Option<&RowTotals> {
        self.rows.iter().find(|row| row.id == id)
    }
}

/// Derive the L / M / Q / R figures from the total cost of all sections.
pub fn grand_totals(all_cost: f64, params: &SummaryParams) -> GrandTotals {
    let gross_total = all_cost * (1.0 + params.margin_percent / 100.0);
    let net_after_cutdown = gross_total - params.cutdown;
    let vat_amount = net_after_cutdown * params.vat_percent / 100.0;
    GrandTotals {
        all_cost,
        gross_total,
        net_after_cutdown,
        vat_amount,
        grand_total: net_after_cutdown + vat_amount,
    }
}

/// Cost, markup and total for one row.
pub fn row_totals(row: &TopSheetRow, totals: &Totals, margin_percent: f64) -> RowTotals {
    let cost = totals.composite(row.sections);
    let markup = cost * margin_percent / 100.0;
    RowTotals {
        id: row.id.to_string(),
        label: row.label.to_string(),
        kind: row.kind,
        cost,
        markup,
        total: cost + markup,
    }
}

/// Full top sheet derivation over `rows`.
pub fn derive(totals: &Totals, params: &SummaryParams, rows: &[TopSheetRow]) -> Summary {
    Summary {
        params: *params,
        rows: rows
            .iter()
            .map(|row| row_totals(row, totals, params.margin_percent))
            .collect(),
        grand: grand_totals(totals.all_cost(), params),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::line::LineRecord;
    use crate::store::ValueStore;

    fn params(margin: f64, cutdown: f64, vat: f64) -> SummaryParams {
        SummaryParams {
            margin_percent: margin,
            cutdown,
            vat_percent: vat,
        }
    }

    fn top_sheet_row(id: &str) -> Option<&'static TopSheetRow> {
        TOP_SHEET_ROWS.iter().find(|row| row.id == id)
    }

    /// Every section of the standard catalog priced at (index + 1) × 100.
    fn standard_totals() -> Totals {
        let catalog = catalog::standard().unwrap();
        let mut store = ValueStore::for_catalog(&catalog);
        for (section, _) in catalog.sections.iter().enumerate() {
            let pos = catalog
                .positions()
                .find(|p| p.section == section)
                .unwrap();
            *store.get_mut(pos).unwrap() = LineRecord {
                rate: (section as f64 + 1.0) * 100.0,
                markup_percent: Some(0.0),
                ..LineRecord::default()
            };
        }
        Totals::compute(&store)
    }

    #[test]
    fn test_grand_totals() {
        let grand = grand_totals(1000.0, &params(25.0, 50.0, 20.0));
        assert_eq!(grand.gross_total, 1250.0);
        assert_eq!(grand.net_after_cutdown, 1200.0);
        assert_eq!(grand.vat_amount, 240.0);
        assert_eq!(grand.grand_total, 1440.0);
    }

    #[test]
    fn test_cutdown_may_exceed_gross() {
        let grand = grand_totals(100.0, &params(0.0, 250.0, 10.0));
        assert_eq!(grand.net_after_cutdown, -150.0);
        assert_eq!(grand.vat_amount, -15.0);
        assert_eq!(grand.grand_total, -165.0);
    }

    #[test]
    fn test_empty_quote_is_all_zero() {
        let grand = grand_totals(0.0, &params(25.0, 0.0, 20.0));
        assert_eq!(grand, GrandTotals::default());
    }

    #[test]
    fn test_rows_cover_every_section_once_per_level() {
        let st1 = top_sheet_row("ST1").unwrap();
        let st2 = top_sheet_row("ST2").unwrap();
        let mut all: Vec<usize> = st1.sections.iter().chain(st2.sections).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..21).collect::<Vec<_>>());

        for n in 1..=11 {
            let row = top_sheet_row(&format!("B-{n}")).unwrap();
            assert_eq!(row.sections, &[n]);
        }
        for n in 1..=4 {
            let row = top_sheet_row(&format!("C-{n}")).unwrap();
            assert_eq!(row.sections, &[11 + n]);
        }
    }

    #[test]
    fn test_subtotals_are_exact_sums() {
        let totals = standard_totals();
        let summary = derive(&totals, &params(25.0, 0.0, 20.0), &TOP_SHEET_ROWS);

        let st1 = summary.row("ST1").unwrap();
        let manual: f64 = (0..=16).map(|s| totals.section(s)).sum();
        assert_eq!(st1.cost, manual);

        let st2 = summary.row("ST2").unwrap();
        assert_eq!(st2.cost, (18..=21).map(|n| n as f64 * 100.0).sum::<f64>());
        assert_eq!(st1.cost + st2.cost, summary.grand.all_cost);
    }

    #[test]
    fn test_row_markup_ignores_cutdown_and_vat() {
        let totals = standard_totals();
        let summary = derive(&totals, &params(10.0, 500.0, 50.0), &TOP_SHEET_ROWS);

        let a = summary.row("A").unwrap();
        assert_eq!(a.cost, 100.0);
        assert!((a.markup - 10.0).abs() < 1e-9);
        assert!((a.total - 110.0).abs() < 1e-9);
    }

    #[test]
    fn test_params_from_fields() {
        let mut project = ProjectMetadata::default();
        project.margin = Some(30.0);
        let mut extra = ExtraFields::default();
        extra.set(crate::project::CUTDOWN_KEY, "75");

        let p = SummaryParams::from_fields(&project, &extra, &Settings::default());
        assert_eq!(p, params(30.0, 75.0, 20.0));

        project.margin = None;
        let settings = Settings {
            margin_percent: 12.0,
            vat_percent: 5.0,
            ..Settings::default()
        };
        let p = SummaryParams::from_fields(&project, &extra, &settings);
        assert_eq!(p, params(12.0, 75.0, 5.0));
    }
}
