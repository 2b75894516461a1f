//! Datasets
//!
//! An ordered collection of records sharing one schema. The dataset keeps an
//! unfiltered baseline (`origin_records`) next to the current view (`records`),
//! owns the top-level sort and filter state, and exposes the dirty index its
//! records report into.

use crate::concurrency::BusyFlag;
use crate::dirty::DirtyIndex;
use crate::query::{FilterMatcher, FilterMode, Filters, OperatorMatcher, Sorters};
use crate::record::{sort_records, Record, RecordContext};
use crate::schema::Schema;
use crate::types::Row;
use std::sync::Arc;
use tracing::debug;

/// Ordered record collection with sort, filter, and dirty tracking
pub struct Dataset {
    context: Arc<RecordContext>,
    origin_records: Vec<Record>,
    records: Vec<Record>,
    sorters: Sorters,
    filters: Option<Filters>,
    filter_mode: FilterMode,
    sorting: BusyFlag,
    filtering: BusyFlag,
}

impl Dataset {
    /// Build a dataset using the default [`OperatorMatcher`]
    pub fn new(rows: &[Row], schema: Arc<Schema>) -> Self {
        Self::with_matcher(rows, schema, Arc::new(OperatorMatcher))
    }

    /// Build a dataset evaluating filters with `matcher`
    pub fn with_matcher(rows: &[Row], schema: Arc<Schema>, matcher: Arc<dyn FilterMatcher>) -> Self {
        let context = RecordContext::new(schema, matcher);
        let records: Vec<Record> = rows
            .iter()
            .map(|row| Record::build(row, &context, Vec::new()))
            .collect();
        Self {
            context,
            origin_records: records.clone(),
            records,
            sorters: Sorters::new(),
            filters: None,
            filter_mode: FilterMode::And,
            sorting: BusyFlag::new(),
            filtering: BusyFlag::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.context.schema
    }

    /// Current (filtered) view
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Unfiltered baseline
    pub fn origin_records(&self) -> &[Record] {
        &self.origin_records
    }

    /// Number of records in the current view
    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at `index` in the current view
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Index of modified records, keyed by record hash
    pub fn dirty_index(&self) -> &DirtyIndex {
        &self.context.dirty
    }

    /// Modified records at any depth
    pub fn updated_records(&self) -> Vec<Record> {
        self.context.dirty.records()
    }

    pub fn is_updated(&self) -> bool {
        !self.context.dirty.is_empty()
    }

    /// Commit every modified record. Returns how many were committed.
    pub fn commit_all(&self) -> usize {
        self.updated_records()
            .iter()
            .filter(|record| record.commit(None))
            .count()
    }

    /// Roll back every modified record. Returns how many were reverted.
    pub fn rollback_all(&self) -> usize {
        self.updated_records()
            .iter()
            .filter(|record| record.rollback(None))
            .count()
    }

    /// Append records built from `rows` to the view and the baseline.
    ///
    /// The current sort and filter are not re-applied; the owner decides when
    /// to refresh.
    pub fn add(&mut self, rows: &[Row]) -> Vec<Record> {
        let added: Vec<Record> = rows
            .iter()
            .map(|row| Record::build(row, &self.context, Vec::new()))
            .collect();
        self.origin_records.extend(added.iter().cloned());
        self.records.extend(added.iter().cloned());
        added
    }

    /// Remove records equal to any of `targets` from the current view.
    ///
    /// The baseline keeps them, so clearing the filter afterwards brings them
    /// back. Returns how many records left the view.
    pub fn delete(&mut self, targets: &[Record]) -> usize {
        let before = self.records.len();
        self.records
            .retain(|record| !targets.iter().any(|target| record.is_equal(target)));
        before - self.records.len()
    }

    /// Clear the current view. The baseline is kept.
    pub fn empty(&mut self) {
        self.records.clear();
    }

    /// Sort the view and the baseline, then every record's children.
    ///
    /// With `execute == false` the sorters are only remembered. Returns `false`
    /// when a sort is already running and the request was dropped.
    pub fn sort(&mut self, sorters: &Sorters, execute: bool) -> bool {
        let flag = self.sorting.clone();
        let Some(_busy) = flag.try_enter() else {
            debug!("Dataset sort already running, request dropped");
            return false;
        };

        self.sorters = sorters.clone();
        if execute {
            sort_records(&mut self.origin_records, sorters);
            sort_records(&mut self.records, sorters);
        }
        for record in &self.origin_records {
            record.sort(sorters, execute);
        }
        true
    }

    /// Rebuild the view from the baseline, keeping records that match or
    /// still hold a matching descendant. `None` restores the baseline.
    ///
    /// With `execute == false` the filters are only remembered. Returns `false`
    /// when a filter is already running and the request was dropped.
    pub fn filter(&mut self, filters: Option<&Filters>, mode: FilterMode, execute: bool) -> bool {
        let flag = self.filtering.clone();
        let Some(_busy) = flag.try_enter() else {
            debug!("Dataset filter already running, request dropped");
            return false;
        };

        self.filters = filters.cloned();
        self.filter_mode = mode;

        if !execute {
            for record in &self.origin_records {
                record.filter(filters, mode, false);
            }
            return true;
        }

        match filters {
            Some(filters) => {
                let mut kept = Vec::with_capacity(self.origin_records.len());
                for record in &self.origin_records {
                    record.filter(Some(filters), mode, true);
                    if record.matches(filters, mode) || record.children().has_any() {
                        kept.push(record.clone());
                    }
                }
                self.records = kept;
            }
            None => {
                for record in &self.origin_records {
                    record.filter(None, mode, true);
                }
                self.records = self.origin_records.clone();
            }
        }
        debug!(
            visible = self.records.len(),
            total = self.origin_records.len(),
            "Dataset filtered"
        );
        true
    }

    /// Sorters last applied or remembered
    pub fn sorters(&self) -> &Sorters {
        &self.sorters
    }

    /// Filters last applied or remembered
    pub fn filters(&self) -> Option<&Filters> {
        self.filters.as_ref()
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("records", &self.records.len())
            .field("origin_records", &self.origin_records.len())
            .field("sorters", &self.sorters)
            .field("filters", &self.filters)
            .field("filter_mode", &self.filter_mode)
            .finish()
    }
}
