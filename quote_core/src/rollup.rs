//! # Rollup Engine
//!
//! Aggregates line totals bottom-up:
//!
//! ```text
//! line ─► subsection total
//! line ─► section total ─► composite (any explicit list of sections)
//!                        └► all-cost (every section)
//! ```
//!
//! Section totals are summed straight from the section's records rather
//! than from the cached subsection totals, so both stay correct even when
//! a subsection has no entry. Composites are never cached: they are
//! summed from section totals on request, which keeps every view of an
//! aggregate numerically identical.
//!
//! Missing positions are no-ops and missing section indices contribute 0.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::line::price;
use crate::store::{Position, ValueStore};

/// Cached subsection and section totals for one [`ValueStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    subsections: Vec<Vec<f64>>,
    sections: Vec<f64>,
}

impl Totals {
    /// Full pass over every section, in catalog order.
    pub fn compute(store: &ValueStore) -> Self {
        let mut totals = Totals::default();
        for section in 0..store.section_count() {
            totals.sections.push(section_total(store, section));
            totals.subsections.push(
                (0..store.subsection_count(section))
                    .map(|sub| subsection_total(store, section, sub))
                    .collect(),
            );
        }
        debug!(sections = totals.sections.len(), all_cost = totals.all_cost(), "recomputed all totals");
        totals
    }

    /// Recompute the subsection and section containing `pos`.
    ///
    /// Returns `false` (and changes nothing) when `pos` is not a line in
    /// the store.
    pub fn refresh_line(&mut self, store: &ValueStore, pos: Position) -> bool {
        if store.get(pos).is_none() {
            warn!(%pos, "ignoring refresh for a position outside the catalog");
            return false;
        }
        if self.sections.len() != store.section_count() {
            *self = Totals::compute(store);
            return true;
        }
        self.subsections[pos.section][pos.subsection] =
            subsection_total(store, pos.section, pos.subsection);
        self.sections[pos.section] = section_total(store, pos.section);
        debug!(
            %pos,
            subsection = self.subsections[pos.section][pos.subsection],
            section = self.sections[pos.section],
            "refreshed line totals"
        );
        true
    }

    /// Section total; 0 for a missing section.
    pub fn section(&self, section: usize) -> f64 {
        self.sections.get(section).copied().unwrap_or(0.0)
    }

    /// Subsection total; 0 for a missing subsection.
    pub fn subsection(&self, section: usize, subsection: usize) -> f64 {
        self.subsections
            .get(section)
            .and_then(|subs| subs.get(subsection))
            .copied()
            .unwrap_or(0.0)
    }

    /// Sum of section totals over an explicit list of sections.
    pub fn composite(&self, sections: &[usize]) -> f64 {
        sections.iter().map(|&s| self.section(s)).sum()
    }

    /// Sum over every section.
    pub fn all_cost(&self) -> f64 {
        self.sections.iter().sum()
    }

    /// Section totals in catalog order
    pub fn sections(&self) -> &[f64] {
        &self.sections
    }
}

/// Sum of line totals under one subsection.
pub fn subsection_total(store: &ValueStore, section: usize, subsection: usize) -> f64 {
    store
        .subsection_records(section, subsection)
        .iter()
        .map(price)
        .sum()
}

/// Sum of line totals under one section, straight from the records.
pub fn section_total(store: &ValueStore, section: usize) -> f64 {
    store.section_records(section).map(price).sum()
}

/// Total for a single line; 0 when the position is missing.
pub fn line_total(store: &ValueStore, pos: Position) -> f64 {
    store.get(pos).map_or(0.0, price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::small_catalog;
    use crate::catalog::Catalog;
    use crate::line::LineRecord;
    use proptest::prelude::*;

    fn set_rate(store: &mut ValueStore, pos: Position, rate: f64, markup: f64) {
        let record = store.get_mut(pos).unwrap();
        record.rate = rate;
        record.markup_percent = Some(markup);
    }

    fn populated(catalog: &Catalog) -> ValueStore {
        let mut store = ValueStore::for_catalog(catalog);
        set_rate(&mut store, Position::new(0, 0, 0), 100.0, 0.0);
        set_rate(&mut store, Position::new(0, 0, 1), 50.0, 0.0);
        set_rate(&mut store, Position::new(0, 1, 0), 200.0, 10.0);
        set_rate(&mut store, Position::new(2, 1, 0), 40.0, 0.0);
        store
    }

    #[test]
    fn test_subsection_and_section_totals() {
        let catalog = small_catalog();
        let store = populated(&catalog);
        let totals = Totals::compute(&store);

        assert_eq!(totals.subsection(0, 0), 150.0);
        assert!((totals.subsection(0, 1) - 220.0).abs() < 1e-9);
        assert!((totals.section(0) - 370.0).abs() < 1e-9);
        assert_eq!(totals.section(1), 0.0);
        assert_eq!(totals.section(2), 40.0);
        assert_eq!(totals.subsection(2, 0), 0.0);
    }

    #[test]
    fn test_section_equals_sum_of_subsections() {
        let catalog = small_catalog();
        let store = populated(&catalog);
        let totals = Totals::compute(&store);

        for section in 0..catalog.len() {
            let subs: f64 = (0..store.subsection_count(section))
                .map(|sub| totals.subsection(section, sub))
                .sum();
            assert!((subs - totals.section(section)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_missing_references_contribute_nothing() {
        let catalog = small_catalog();
        let store = populated(&catalog);
        let totals = Totals::compute(&store);

        assert_eq!(totals.section(99), 0.0);
        assert_eq!(totals.subsection(0, 99), 0.0);
        assert_eq!(totals.composite(&[2, 99]), 40.0);
        assert_eq!(line_total(&store, Position::new(9, 9, 9)), 0.0);
    }

    #[test]
    fn test_refresh_line_matches_full_pass() {
        let catalog = small_catalog();
        let mut store = populated(&catalog);
        let mut totals = Totals::compute(&store);

        let pos = Position::new(1, 0, 1);
        set_rate(&mut store, pos, 300.0, 10.0);
        assert!(totals.refresh_line(&store, pos));

        assert_eq!(totals, Totals::compute(&store));
    }

    #[test]
    fn test_refresh_missing_position_is_noop() {
        let catalog = small_catalog();
        let store = populated(&catalog);
        let mut totals = Totals::compute(&store);
        let before = totals.clone();

        assert!(!totals.refresh_line(&store, Position::new(0, 7, 0)));
        assert_eq!(totals, before);
    }

    #[test]
    fn test_all_cost_and_composite() {
        let catalog = small_catalog();
        let store = populated(&catalog);
        let totals = Totals::compute(&store);

        assert!((totals.all_cost() - 410.0).abs() < 1e-9);
        assert_eq!(totals.composite(&[0, 1, 2]), totals.all_cost());
        assert_eq!(totals.composite(&[]), 0.0);
    }

    proptest! {
        #[test]
        fn prop_recompute_is_idempotent(rates in proptest::collection::vec(0.0f64..10_000.0, 6)) {
            let catalog = small_catalog();
            let mut store = ValueStore::for_catalog(&catalog);
            for (pos, rate) in catalog.positions().zip(rates) {
                *store.get_mut(pos).unwrap() = LineRecord { rate, qty: 2.0, ..LineRecord::default() };
            }
            let first = Totals::compute(&store);
            let second = Totals::compute(&store);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_composite_is_additive(rates in proptest::collection::vec(0.0f64..10_000.0, 6)) {
            let catalog = small_catalog();
            let mut store = ValueStore::for_catalog(&catalog);
            for (pos, rate) in catalog.positions().zip(rates) {
                store.get_mut(pos).unwrap().rate = rate;
            }
            let totals = Totals::compute(&store);
            let manual = totals.section(0) + totals.section(2);
            prop_assert_eq!(totals.composite(&[0, 2]), manual);
        }
    }
}
