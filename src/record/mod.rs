//! Records
//!
//! A record is one hierarchical data row: typed fields, optional children,
//! dirty-state tracking against a lazily taken snapshot, and a stable identity
//! derived from its primary-key projection.
//!
//! Records are shared handles. Cloning a [`Record`] clones the handle, not the
//! row: a dataset's view, its baseline, and a parent's child lists all point at
//! the same records. Mutate fields through [`Record::set`] only; edits made to a
//! row returned by [`Record::data`] are not tracked.

pub mod children;
pub mod hasher;

pub use children::Children;

use crate::concurrency::BusyFlag;
use crate::dirty::DirtyIndex;
use crate::query::{FilterMatcher, FilterMode, Filters, OperatorMatcher, Sorters};
use crate::schema::Schema;
use crate::types::{RecordHash, Row};
use hasher::compute_record_hash;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};
use tracing::debug;

/// Change observer: `(key, new value, original value)`
pub type Observer = Arc<dyn Fn(&str, &Value, &Value) + Send + Sync>;

/// State shared by every record of one dataset
pub(crate) struct RecordContext {
    pub(crate) schema: Arc<Schema>,
    pub(crate) matcher: Arc<dyn FilterMatcher>,
    pub(crate) dirty: DirtyIndex,
}

impl RecordContext {
    pub(crate) fn new(schema: Arc<Schema>, matcher: Arc<dyn FilterMatcher>) -> Arc<Self> {
        Arc::new(Self {
            schema,
            matcher,
            dirty: DirtyIndex::new(),
        })
    }
}

struct RecordState {
    fields: Row,
    origin: Option<Row>,
    updated: Option<Row>,
    children: Children,
    origin_children: Children,
    sorters: Sorters,
    filters: Option<Filters>,
    filter_mode: FilterMode,
}

pub(crate) struct RecordInner {
    context: Arc<RecordContext>,
    parents: Vec<Weak<RecordInner>>,
    state: RwLock<RecordState>,
    hash: OnceLock<RecordHash>,
    observer: RwLock<Option<Observer>>,
    sorting: BusyFlag,
    filtering: BusyFlag,
}

/// Handle to a hierarchical data row
#[derive(Clone)]
pub struct Record {
    inner: Arc<RecordInner>,
}

/// Non-owning record handle
#[derive(Clone)]
pub struct WeakRecord {
    inner: Weak<RecordInner>,
}

impl WeakRecord {
    pub fn upgrade(&self) -> Option<Record> {
        self.inner.upgrade().map(|inner| Record { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

/// Target of an identity comparison
#[derive(Debug, Clone, Copy)]
pub enum RecordMatcher<'a> {
    Record(&'a Record),
    Row(&'a Row),
}

impl<'a> From<&'a Record> for RecordMatcher<'a> {
    fn from(record: &'a Record) -> Self {
        RecordMatcher::Record(record)
    }
}

impl<'a> From<&'a Row> for RecordMatcher<'a> {
    fn from(row: &'a Row) -> Self {
        RecordMatcher::Row(row)
    }
}

fn project(source: &Row, keys: &[String]) -> Row {
    if keys.is_empty() {
        return source.clone();
    }
    keys.iter()
        .map(|key| (key.clone(), source.get(key).cloned().unwrap_or(Value::Null)))
        .collect()
}

fn extend_chain(parents: &[Weak<RecordInner>], me: &Weak<RecordInner>) -> Vec<Weak<RecordInner>> {
    let mut chain = parents.to_vec();
    chain.push(me.clone());
    chain
}

/// Stable multi-key sort of a record list.
pub(crate) fn sort_records(records: &mut Vec<Record>, sorters: &Sorters) {
    if sorters.is_empty() || records.len() < 2 {
        return;
    }
    let mut keyed: Vec<(Vec<Value>, Record)> = records
        .drain(..)
        .map(|record| (record.sort_key(sorters), record))
        .collect();
    keyed.sort_by(|a, b| sorters.compare_keys(&a.0, &b.0));
    records.extend(keyed.into_iter().map(|(_, record)| record));
}

fn sort_children(children: &mut Children, sorters: &Sorters) {
    if let Children::Loaded(records) = children {
        sort_records(records, sorters);
    }
}

impl Record {
    /// Build a standalone record with its own dirty index and the default
    /// filter matcher.
    pub fn new(row: Row, schema: Arc<Schema>) -> Self {
        let context = RecordContext::new(schema, Arc::new(OperatorMatcher));
        Self::build(&row, &context, Vec::new())
    }

    pub(crate) fn build(
        raw: &Row,
        context: &Arc<RecordContext>,
        parents: Vec<Weak<RecordInner>>,
    ) -> Self {
        let fields = context.schema.coerce_row(raw);
        let inner = Arc::new_cyclic(|me: &Weak<RecordInner>| {
            let children = match raw.get(&context.schema.children_field) {
                Some(Value::Array(items)) => {
                    let chain = extend_chain(&parents, me);
                    Children::Loaded(
                        items
                            .iter()
                            .filter_map(Value::as_object)
                            .map(|row| Record::build(row, context, chain.clone()))
                            .collect(),
                    )
                }
                Some(Value::Bool(true)) => Children::Pending,
                _ => Children::Leaf,
            };
            RecordInner {
                context: context.clone(),
                parents,
                state: RwLock::new(RecordState {
                    fields,
                    origin: None,
                    updated: None,
                    origin_children: children.clone(),
                    children,
                    sorters: Sorters::new(),
                    filters: None,
                    filter_mode: FilterMode::And,
                }),
                hash: OnceLock::new(),
                observer: RwLock::new(None),
                sorting: BusyFlag::new(),
                filtering: BusyFlag::new(),
            }
        });
        Record { inner }
    }

    /// Schema shared with the owning dataset
    pub fn schema(&self) -> &Schema {
        &self.inner.context.schema
    }

    /// Current value of `key`, or null when absent
    pub fn get(&self, key: &str) -> Value {
        self.inner
            .state
            .read()
            .fields
            .get(key)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Copy of the current field map
    pub fn data(&self) -> Row {
        self.inner.state.read().fields.clone()
    }

    /// Set a field, tracking it against the snapshot taken at first mutation.
    ///
    /// The observer fires only when the value differs from the current one.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        // Pin identity to the pre-edit content.
        self.get_hash();
        let (was_dirty, dirty, changed_from) = {
            let mut guard = self.inner.state.write();
            let state = &mut *guard;
            let was_dirty = state.updated.is_some();
            if state.origin.is_none() {
                state.origin = Some(state.fields.clone());
            }
            let original = state
                .origin
                .as_ref()
                .and_then(|origin| origin.get(key))
                .cloned()
                .unwrap_or(Value::Null);

            if value != original {
                state
                    .updated
                    .get_or_insert_with(Row::new)
                    .insert(key.to_string(), value.clone());
            } else if let Some(updated) = state.updated.as_mut() {
                updated.remove(key);
            }
            if state.updated.as_ref().is_some_and(|u| u.is_empty()) {
                state.updated = None;
            }

            let current = state.fields.get(key).cloned().unwrap_or(Value::Null);
            let changed_from = if current != value {
                state.fields.insert(key.to_string(), value.clone());
                Some(original)
            } else {
                None
            };
            (was_dirty, state.updated.is_some(), changed_from)
        };

        if dirty || was_dirty {
            self.sync_dirty(dirty);
        }
        if let Some(original) = changed_from {
            self.notify(key, &value, &original);
        }
    }

    /// Whether `key` (or, with `None`, any field) has a pending change
    pub fn is_updated(&self, key: Option<&str>) -> bool {
        let state = self.inner.state.read();
        match (key, state.updated.as_ref()) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(key), Some(updated)) => updated.contains_key(key),
        }
    }

    /// Fields that currently differ from the snapshot
    pub fn updated(&self) -> Option<Row> {
        self.inner.state.read().updated.clone()
    }

    /// Snapshot taken at first mutation
    pub fn origin(&self) -> Option<Row> {
        self.inner.state.read().origin.clone()
    }

    /// Fold pending changes into the snapshot.
    ///
    /// Returns `false` without notifying anyone when nothing was pending for
    /// the requested scope.
    pub fn commit(&self, key: Option<&str>) -> bool {
        let committed: Vec<(String, Value)> = {
            let mut guard = self.inner.state.write();
            let state = &mut *guard;
            let Some(mut updated) = state.updated.take() else {
                return false;
            };
            let keys: Vec<String> = match key {
                Some(key) => {
                    if updated.remove(key).is_none() {
                        state.updated = Some(updated);
                        return false;
                    }
                    vec![key.to_string()]
                }
                None => {
                    let keys = updated.keys().cloned().collect();
                    updated.clear();
                    keys
                }
            };

            match key {
                Some(_) => {
                    let origin = state.origin.get_or_insert_with(Row::new);
                    for key in &keys {
                        let current = state.fields.get(key).cloned().unwrap_or(Value::Null);
                        origin.insert(key.clone(), current);
                    }
                }
                None => state.origin = Some(state.fields.clone()),
            }
            if !updated.is_empty() {
                state.updated = Some(updated);
            }

            keys.into_iter()
                .map(|key| {
                    let current = state.fields.get(&key).cloned().unwrap_or(Value::Null);
                    (key, current)
                })
                .collect()
        };

        self.sync_dirty(self.is_updated(None));
        for (key, value) in &committed {
            self.notify(key, value, value);
        }
        true
    }

    /// Revert pending changes to their snapshot values.
    pub fn rollback(&self, key: Option<&str>) -> bool {
        let restored: Vec<(String, Value)> = {
            let mut guard = self.inner.state.write();
            let state = &mut *guard;
            let Some(mut updated) = state.updated.take() else {
                return false;
            };
            let keys: Vec<String> = match key {
                Some(key) => {
                    if updated.remove(key).is_none() {
                        state.updated = Some(updated);
                        return false;
                    }
                    vec![key.to_string()]
                }
                None => {
                    let keys = updated.keys().cloned().collect();
                    updated.clear();
                    keys
                }
            };

            let mut restored = Vec::with_capacity(keys.len());
            for key in keys {
                match state.origin.as_ref().and_then(|origin| origin.get(&key)) {
                    Some(value) => {
                        state.fields.insert(key.clone(), value.clone());
                        restored.push((key, value.clone()));
                    }
                    None => {
                        state.fields.remove(&key);
                        restored.push((key, Value::Null));
                    }
                }
            }
            if !updated.is_empty() {
                state.updated = Some(updated);
            }
            restored
        };

        self.sync_dirty(self.is_updated(None));
        for (key, value) in &restored {
            self.notify(key, value, value);
        }
        true
    }

    /// Primary-key projection (all fields when no primary keys are declared),
    /// from current or snapshot values.
    pub fn get_primary(&self, use_origin: bool) -> Row {
        let state = self.inner.state.read();
        let source = if use_origin {
            state.origin.as_ref().unwrap_or(&state.fields)
        } else {
            &state.fields
        };
        project(source, &self.inner.context.schema.primary_keys)
    }

    /// Identity hash of the primary-key projection.
    ///
    /// Computed on first call and fixed for the record's lifetime. Changing a
    /// primary-key field after that point is not supported: the record keeps
    /// its old identity.
    pub fn get_hash(&self) -> RecordHash {
        self.inner
            .hash
            .get_or_init(|| compute_record_hash(&self.get_primary(false)))
            .clone()
    }

    /// Same logical row: primary-key fields (or all fields) agree.
    ///
    /// Raw rows are coerced through the schema before comparison.
    pub fn is_equal<'a>(&self, matcher: impl Into<RecordMatcher<'a>>) -> bool {
        let own = self.get_primary(false);
        match matcher.into() {
            RecordMatcher::Record(other) => {
                if self.ptr_eq(other) {
                    return true;
                }
                own.iter().all(|(key, value)| *value == other.get(key))
            }
            RecordMatcher::Row(row) => {
                let row = self.inner.context.schema.coerce_row(row);
                own.iter()
                    .all(|(key, value)| row.get(key).unwrap_or(&Value::Null) == value)
            }
        }
    }

    /// Replace children and their unfiltered baseline with records built from
    /// `rows`.
    pub fn set_children(&self, rows: &[Row]) {
        let chain = extend_chain(&self.inner.parents, &Arc::downgrade(&self.inner));
        let records: Vec<Record> = rows
            .iter()
            .map(|row| Record::build(row, &self.inner.context, chain.clone()))
            .collect();
        let mut state = self.inner.state.write();
        state.children = Children::Loaded(records.clone());
        state.origin_children = Children::Loaded(records);
    }

    /// Current (filtered) children
    pub fn children(&self) -> Children {
        self.inner.state.read().children.clone()
    }

    /// Children before any filter was applied
    pub fn origin_children(&self) -> Children {
        self.inner.state.read().origin_children.clone()
    }

    /// Child at `index` in the current view
    pub fn child(&self, index: usize) -> Option<Record> {
        self.inner.state.read().children.get(index).cloned()
    }

    /// Whether the record is not a leaf
    pub fn has_children(&self) -> bool {
        !self.inner.state.read().origin_children.is_leaf()
    }

    /// Whether children exist but have not been fetched yet
    pub fn is_expandable(&self) -> bool {
        self.inner.state.read().origin_children.is_pending()
    }

    /// Ancestors, root first
    pub fn parents(&self) -> Vec<Record> {
        self.inner
            .parents
            .iter()
            .filter_map(|parent| parent.upgrade().map(|inner| Record { inner }))
            .collect()
    }

    /// Immediate parent
    pub fn parent(&self) -> Option<Record> {
        self.inner
            .parents
            .last()
            .and_then(Weak::upgrade)
            .map(|inner| Record { inner })
    }

    /// Number of ancestors
    pub fn depth(&self) -> usize {
        self.inner.parents.len()
    }

    /// Attach the single change observer, replacing any previous one
    pub fn set_observer<F>(&self, observer: F)
    where
        F: Fn(&str, &Value, &Value) + Send + Sync + 'static,
    {
        *self.inner.observer.write() = Some(Arc::new(observer));
    }

    pub fn clear_observer(&self) {
        *self.inner.observer.write() = None;
    }

    /// Sort children by `sorters`, recursively.
    ///
    /// With `execute == false` the sorters are only remembered down the tree.
    /// Returns `false` when a sort of this record is already running; the
    /// request is dropped.
    pub fn sort(&self, sorters: &Sorters, execute: bool) -> bool {
        let Some(_busy) = self.inner.sorting.try_enter() else {
            debug!(depth = self.depth(), "Record sort already running, request dropped");
            return false;
        };

        let mut origin = {
            let mut state = self.inner.state.write();
            state.sorters = sorters.clone();
            state.origin_children.clone()
        };

        if execute {
            let mut view = self.children();
            sort_children(&mut view, sorters);
            sort_children(&mut origin, sorters);
            let mut state = self.inner.state.write();
            state.children = view;
            state.origin_children = origin.clone();
        }

        for child in origin.as_slice() {
            child.sort(sorters, execute);
        }
        true
    }

    /// Narrow children to those matching `filters` or keeping a matching
    /// descendant. `None` restores every descendant's unfiltered children.
    ///
    /// With `execute == false` the filters are only remembered down the tree.
    /// Returns `false` when a filter of this record is already running.
    pub fn filter(&self, filters: Option<&Filters>, mode: FilterMode, execute: bool) -> bool {
        let Some(_busy) = self.inner.filtering.try_enter() else {
            debug!(depth = self.depth(), "Record filter already running, request dropped");
            return false;
        };

        let origin = {
            let mut state = self.inner.state.write();
            state.filters = filters.cloned();
            state.filter_mode = mode;
            state.origin_children.clone()
        };

        if !execute {
            for child in origin.as_slice() {
                child.filter(filters, mode, false);
            }
            return true;
        }

        let view = match (filters, &origin) {
            (Some(filters), Children::Loaded(all)) => {
                let mut kept = Vec::with_capacity(all.len());
                for child in all {
                    child.filter(Some(filters), mode, true);
                    if child.matches(filters, mode) || child.children().has_any() {
                        kept.push(child.clone());
                    }
                }
                Children::Loaded(kept)
            }
            _ => {
                for child in origin.as_slice() {
                    child.filter(filters, mode, true);
                }
                origin
            }
        };
        self.inner.state.write().children = view;
        true
    }

    /// Whether this record's own fields satisfy `filters`
    pub fn matches(&self, filters: &Filters, mode: FilterMode) -> bool {
        let state = self.inner.state.read();
        filters.test(&state.fields, mode, self.inner.context.matcher.as_ref())
    }

    /// Sorters last applied or remembered
    pub fn sorters(&self) -> Sorters {
        self.inner.state.read().sorters.clone()
    }

    /// Filters last applied or remembered
    pub fn filters(&self) -> Option<Filters> {
        self.inner.state.read().filters.clone()
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.inner.state.read().filter_mode
    }

    /// Same underlying record
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn downgrade(&self) -> WeakRecord {
        WeakRecord {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn sort_key(&self, sorters: &Sorters) -> Vec<Value> {
        sorters.sort_key(&self.inner.state.read().fields)
    }

    #[cfg(test)]
    pub(crate) fn sorting_flag(&self) -> BusyFlag {
        self.inner.sorting.clone()
    }

    #[cfg(test)]
    pub(crate) fn filtering_flag(&self) -> BusyFlag {
        self.inner.filtering.clone()
    }

    fn sync_dirty(&self, dirty: bool) {
        let index = &self.inner.context.dirty;
        if dirty {
            index.register(self);
        } else {
            index.unregister(&self.get_hash());
        }
    }

    fn notify(&self, key: &str, value: &Value, original: &Value) {
        let observer = self.inner.observer.read().clone();
        if let Some(observer) = observer {
            observer(key, value, original);
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Record")
            .field("fields", &state.fields)
            .field("updated", &state.updated)
            .field("children", &state.children)
            .finish()
    }
}
