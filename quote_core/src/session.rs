//! # Quote Session
//!
//! Owns everything one open quote needs: the catalog it prices against,
//! the value store, project header, top sheet fields and the cached
//! totals and summary.
//!
//! Every mutation goes through `&mut self` and leaves the cached totals
//! and summary consistent with the store before it returns.
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use quote_core::catalog;
//! use quote_core::line::LineInput;
//! use quote_core::project::Settings;
//! use quote_core::session::QuoteSession;
//! use quote_core::store::Position;
//!
//! let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
//! let mut session = QuoteSession::new(catalog::standard()?, Settings::default(), today);
//!
//! let edit = LineInput { rate: Some("1000".into()), markup: Some("0".into()), ..Default::default() };
//! session.update_line(Position::new(0, 0, 0), &edit)?;
//!
//! assert_eq!(session.totals().section(0), 1000.0);
//! assert_eq!(session.summary().grand.gross_total, 1250.0);
//! # Ok::<(), quote_core::errors::QuoteError>(())
//! ```

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::errors::{QuoteError, QuoteResult};
use crate::line::{price, LineInput, LineRecord};
use crate::presentation::{section_meta, SectionMeta};
use crate::project::{ExtraFields, ProjectMetadata, Settings};
use crate::quote::SavedQuote;
use crate::rollup::{line_total, Totals};
use crate::store::{MergeReport, Position, ValueStore};
use crate::summary::{derive, Summary, SummaryParams, TOP_SHEET_ROWS};

/// One open quote and its derived figures.
#[derive(Debug, Clone)]
pub struct QuoteSession {
    catalog: Arc<Catalog>,
    settings: Settings,
    store: ValueStore,
    project: ProjectMetadata,
    extra: ExtraFields,
    totals: Totals,
    summary: Summary,
}

impl QuoteSession {
    /// A blank quote issued on `today`.
    pub fn new(catalog: Arc<Catalog>, settings: Settings, today: NaiveDate) -> Self {
        let store = ValueStore::for_catalog(&catalog);
        let project = ProjectMetadata::new(&settings, today);
        let extra = ExtraFields::default();
        let totals = Totals::compute(&store);
        let params = SummaryParams::from_fields(&project, &extra, &settings);
        let summary = derive(&totals, &params, &TOP_SHEET_ROWS);
        QuoteSession {
            catalog,
            settings,
            store,
            project,
            extra,
            totals,
            summary,
        }
    }

    /// Drop every value and start a fresh quote issued on `today`.
    pub fn reset(&mut self, today: NaiveDate) {
        self.store = ValueStore::for_catalog(&self.catalog);
        self.project = ProjectMetadata::new(&self.settings, today);
        self.extra = ExtraFields::default();
        self.recompute_all();
        info!(%today, "started a new quote");
    }

    /// Apply an operator edit to one line.
    ///
    /// Refreshes the affected subsection and section, then re-derives the
    /// whole summary. Returns the new line total. A position outside the
    /// catalog is reported as [`QuoteError::MissingReference`] and nothing
    /// changes.
    pub fn update_line(&mut self, pos: Position, edit: &LineInput) -> QuoteResult<f64> {
        let record = match self.store.get_mut(pos) {
            Some(record) if self.catalog.contains(pos) => record,
            _ => {
                warn!(%pos, "ignoring edit to a position outside the catalog");
                return Err(QuoteError::missing_reference(pos));
            }
        };
        record.apply(edit);
        let total = price(record);
        debug!(%pos, total, "line updated");

        self.totals.refresh_line(&self.store, pos);
        self.refresh_summary();
        Ok(total)
    }

    /// Set a project field by its persisted name.
    pub fn set_project_field(&mut self, name: &str, value: &str) -> QuoteResult<()> {
        self.project.set_field(name, value)?;
        self.refresh_summary();
        Ok(())
    }

    /// Set a top sheet field. Cutdown and VAT changes flow into the
    /// summary immediately.
    pub fn set_extra(&mut self, key: &str, value: &str) {
        self.extra.set(key, value);
        self.refresh_summary();
    }

    /// Re-derive the summary from the cached totals.
    pub fn refresh_summary(&mut self) {
        let params = SummaryParams::from_fields(&self.project, &self.extra, &self.settings);
        self.summary = derive(&self.totals, &params, &TOP_SHEET_ROWS);
    }

    /// Full rollup of every section, then the summary.
    pub fn recompute_all(&mut self) {
        self.totals = Totals::compute(&self.store);
        self.refresh_summary();
    }

    /// Deep copy of the current state as a saved quote.
    pub fn snapshot(&self, id: impl Into<String>, saved_at: DateTime<Utc>) -> SavedQuote {
        SavedQuote {
            id: id.into(),
            saved_at,
            project: self.project.clone(),
            extra: self.extra.clone(),
            values: self.store.snapshot(),
        }
    }

    /// Apply a saved quote.
    ///
    /// The project is replaced, top sheet fields and line values are merged
    /// key by key, and everything is recomputed.
    pub fn load(&mut self, quote: &SavedQuote) -> MergeReport {
        self.project = quote.project.clone();
        self.extra.merge_from(&quote.extra);
        let report = self.store.merge_snapshot(&quote.values, &self.catalog);
        self.recompute_all();
        info!(
            id = %quote.id,
            applied = report.applied,
            ignored = report.ignored,
            "loaded quote"
        );
        report
    }

    /// Decode and apply a quote. Nothing changes when decoding fails.
    pub fn load_json(&mut self, text: &str, source_name: &str) -> QuoteResult<MergeReport> {
        let quote = SavedQuote::from_json(text, source_name)?;
        Ok(self.load(&quote))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn project(&self) -> &ProjectMetadata {
        &self.project
    }

    pub fn extra(&self) -> &ExtraFields {
        &self.extra
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn line(&self, pos: Position) -> Option<&LineRecord> {
        self.store.get(pos)
    }

    /// Total for one line; 0 for a missing position.
    pub fn line_total(&self, pos: Position) -> f64 {
        line_total(&self.store, pos)
    }

    /// Display metadata for every section.
    pub fn section_meta(&self) -> Vec<SectionMeta> {
        section_meta(&self.catalog)
    }
}
