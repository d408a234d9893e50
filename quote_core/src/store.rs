//! # Value Store
//!
//! One [`LineRecord`] per catalog item, addressed by [`Position`].
//!
//! The store is materialized eagerly from the catalog: every valid
//! position holds a record from construction onwards, so lookups never
//! need an existence check. Positions outside the catalog simply return
//! `None` and are skipped by every aggregate.
//!
//! ## Snapshots
//!
//! [`ValuesSnapshot`] is the persisted form: nested maps keyed by section,
//! subsection and item index (`{"0": {"1": {"2": {...}}}}`). It owns its
//! records, so a snapshot never aliases the live store. Loading a snapshot
//! with [`ValueStore::merge_snapshot`] overwrites leaf by leaf. Positions
//! the snapshot lacks keep their current values, and positions the catalog
//! lacks are dropped.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::catalog::Catalog;
use crate::line::LineRecord;

/// Structural identity of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub section: usize,
    pub subsection: usize,
    pub item: usize,
}

impl Position {
    pub const fn new(section: usize, subsection: usize, item: usize) -> Self {
        Position {
            section,
            subsection,
            item,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.section, self.subsection, self.item)
    }
}

/// Line values for every catalog position.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueStore {
    sections: Vec<Vec<Vec<LineRecord>>>,
}

impl ValueStore {
    /// A store with a default record (carrying the catalog unit) at every
    /// catalog position.
    pub fn for_catalog(catalog: &Catalog) -> Self {
        let sections = catalog
            .sections
            .iter()
            .map(|section| {
                section
                    .subsections
                    .iter()
                    .map(|sub| {
                        sub.items
                            .iter()
                            .map(|item| LineRecord::with_unit(item.unit.clone()))
                            .collect()
                    })
                    .collect()
            })
            .collect();
        ValueStore { sections }
    }

    pub fn get(&self, pos: Position) -> Option<&LineRecord> {
        self.sections
            .get(pos.section)?
            .get(pos.subsection)?
            .get(pos.item)
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut LineRecord> {
        self.sections
            .get_mut(pos.section)?
            .get_mut(pos.subsection)?
            .get_mut(pos.item)
    }

    /// Number of sections held
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Number of subsections held for `section` (0 when missing).
    pub fn subsection_count(&self, section: usize) -> usize {
        self.sections.get(section).map_or(0, Vec::len)
    }

    /// All records of one subsection; empty when the position is missing.
    pub fn subsection_records(&self, section: usize, subsection: usize) -> &[LineRecord] {
        self.sections
            .get(section)
            .and_then(|subs| subs.get(subsection))
            .map_or(&[][..], Vec::as_slice)
    }

    /// All records of one section, across its subsections.
    pub fn section_records(&self, section: usize) -> impl Iterator<Item = &LineRecord> + '_ {
        self.sections
            .get(section)
            .into_iter()
            .flat_map(|subs| subs.iter().flatten())
    }

    /// Every record with its position, in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &LineRecord)> + '_ {
        self.sections.iter().enumerate().flat_map(|(s, subs)| {
            subs.iter().enumerate().flat_map(move |(sub, items)| {
                items
                    .iter()
                    .enumerate()
                    .map(move |(item, record)| (Position::new(s, sub, item), record))
            })
        })
    }

    /// Deep copy of every record into the persisted shape.
    pub fn snapshot(&self) -> ValuesSnapshot {
        let mut snapshot = ValuesSnapshot::default();
        for (pos, record) in self.iter() {
            snapshot.insert(pos, record.clone());
        }
        snapshot
    }

    /// Overwrite records from a snapshot, leaf by leaf.
    ///
    /// Records are sanitized on the way in and blank units fall back to
    /// the catalog default. Returns how many records were applied and how
    /// many referenced positions outside the catalog.
    pub fn merge_snapshot(&mut self, snapshot: &ValuesSnapshot, catalog: &Catalog) -> MergeReport {
        let mut report = MergeReport::default();
        for (pos, incoming) in snapshot.iter() {
            let (Some(item), Some(slot)) = (catalog.item(pos), self.get_mut(pos)) else {
                report.ignored += 1;
                continue;
            };
            let mut record = incoming.clone();
            record.sanitize();
            if record.unit.trim().is_empty() {
                record.unit = item.unit.clone();
            }
            *slot = record;
            report.applied += 1;
        }
        if report.ignored > 0 {
            warn!(
                ignored = report.ignored,
                "snapshot referenced positions outside the catalog"
            );
        }
        report
    }
}

/// Outcome of [`ValueStore::merge_snapshot`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub applied: usize,
    pub ignored: usize,
}

type Nested<T> = BTreeMap<usize, BTreeMap<usize, BTreeMap<usize, T>>>;

/// Persisted line values: section → subsection → item → record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValuesSnapshot(Nested<LineRecord>);

/// Leaves are read one at a time: a null or malformed leaf becomes a
/// default record, which the merge then gives the catalog unit.
impl<'de> Deserialize<'de> for ValuesSnapshot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = <Nested<serde_json::Value>>::deserialize(deserializer)?;
        let mut malformed = 0usize;
        let mut snapshot = ValuesSnapshot::default();
        for (section, subs) in raw {
            for (subsection, items) in subs {
                for (item, leaf) in items {
                    let record = LineRecord::deserialize(leaf).unwrap_or_else(|_| {
                        malformed += 1;
                        LineRecord::default()
                    });
                    snapshot.insert(Position::new(section, subsection, item), record);
                }
            }
        }
        if malformed > 0 {
            warn!(malformed, "replaced malformed line values with empty records");
        }
        Ok(snapshot)
    }
}

impl ValuesSnapshot {
    pub fn insert(&mut self, pos: Position, record: LineRecord) {
        self.0
            .entry(pos.section)
            .or_default()
            .entry(pos.subsection)
            .or_default()
            .insert(pos.item, record);
    }

    pub fn get(&self, pos: Position) -> Option<&LineRecord> {
        self.0.get(&pos.section)?.get(&pos.subsection)?.get(&pos.item)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &LineRecord)> + '_ {
        self.0.iter().flat_map(|(&s, subs)| {
            subs.iter().flat_map(move |(&sub, items)| {
                items
                    .iter()
                    .map(move |(&item, record)| (Position::new(s, sub, item), record))
            })
        })
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.0.values().flat_map(BTreeMap::values).map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
