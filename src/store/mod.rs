//! Tree Store
//!
//! Orchestrates a [`Dataset`] loaded through a [`StoreBackend`]: paging, the
//! requested sort and filter state, lazy child expansion, path addressing,
//! tree search, and lifecycle events.
//!
//! The store keeps what the caller asked for (`sorters`, `filters`) apart from
//! what the dataset currently materializes. After every change the two are
//! compared: a mismatch is resolved by a full reload when the backend owns
//! that operation, and by re-applying it in memory otherwise.
//!
//! Failures never surface as errors. A failed load leaves the previous data in
//! place and clears [`TreeStore::is_loaded`]; failed lookups return `None`.

pub mod backend;
pub mod events;
pub mod http;
pub mod params;
pub mod remote;

pub use backend::{ArrayBackend, LoadResult, StoreBackend};
pub use events::{EventBus, StoreEvent, SubscriptionId};
pub use http::HttpFetch;
pub use params::{LoadParams, RequestParams};
pub use remote::{FetchResponse, RemoteBackend, RemoteExpander, RemoteFetch, ResponseFields};

use crate::config::StoreConfig;
use crate::dataset::Dataset;
use crate::query::{
    FilterCondition, FilterMatcher, FilterMode, Filters, OperatorMatcher, SortDirection, Sorters,
};
use crate::record::{Record, RecordMatcher};
use crate::schema::Schema;
use crate::types::{Path, Row};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which operations the backend performs instead of the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    pub remote_sort: bool,
    pub remote_filter: bool,
    pub remote_expand: bool,
    /// Page size; `None` disables paging
    pub limit: Option<usize>,
}

impl From<&StoreConfig> for StoreOptions {
    fn from(config: &StoreConfig) -> Self {
        Self {
            remote_sort: config.remote_sort,
            remote_filter: config.remote_filter,
            remote_expand: config.remote_expand,
            limit: config.limit.filter(|limit| *limit > 0),
        }
    }
}

/// Tree node given either by path or by handle
#[derive(Debug, Clone)]
pub enum NodeRef {
    Path(Path),
    Record(Record),
}

impl From<Path> for NodeRef {
    fn from(path: Path) -> Self {
        NodeRef::Path(path)
    }
}

impl From<&[usize]> for NodeRef {
    fn from(path: &[usize]) -> Self {
        NodeRef::Path(path.to_vec())
    }
}

impl From<Record> for NodeRef {
    fn from(record: Record) -> Self {
        NodeRef::Record(record)
    }
}

impl From<&Record> for NodeRef {
    fn from(record: &Record) -> Self {
        NodeRef::Record(record.clone())
    }
}

/// How deep [`TreeStore::expand_all`] goes, in path length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandDepth {
    Unbounded,
    Levels(usize),
}

impl From<usize> for ExpandDepth {
    fn from(levels: usize) -> Self {
        ExpandDepth::Levels(levels)
    }
}

/// Hierarchical record store
pub struct TreeStore {
    schema: Arc<Schema>,
    matcher: Arc<dyn FilterMatcher>,
    backend: Arc<dyn StoreBackend>,
    expander: Option<Arc<dyn RemoteExpander>>,
    options: StoreOptions,
    data: Option<Dataset>,
    page: usize,
    total: usize,
    sorters: Sorters,
    filters: Option<Filters>,
    filter_mode: FilterMode,
    current_params: Option<LoadParams>,
    loaded: bool,
    events: EventBus,
}

impl TreeStore {
    pub fn new(schema: Arc<Schema>, backend: Arc<dyn StoreBackend>, options: StoreOptions) -> Self {
        Self {
            schema,
            matcher: Arc::new(OperatorMatcher),
            backend,
            expander: None,
            options: StoreOptions {
                limit: options.limit.filter(|limit| *limit > 0),
                ..options
            },
            data: None,
            page: 1,
            total: 0,
            sorters: Sorters::new(),
            filters: None,
            filter_mode: FilterMode::And,
            current_params: None,
            loaded: false,
            events: EventBus::new(),
        }
    }

    /// Store over in-memory positional rows; sort and filter run locally
    pub fn array(schema: Arc<Schema>, values: &[Vec<Value>]) -> Self {
        let backend = Arc::new(ArrayBackend::new(&schema, values));
        Self::new(schema, backend, StoreOptions::default())
    }

    /// Store fetching from `url` through `fetcher`
    pub fn remote(
        schema: Arc<Schema>,
        fetcher: Arc<dyn RemoteFetch>,
        url: impl Into<String>,
        options: StoreOptions,
    ) -> Self {
        let backend = Arc::new(RemoteBackend::new(fetcher, url));
        Self::new(schema, backend, options)
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn FilterMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_expander(mut self, expander: Arc<dyn RemoteExpander>) -> Self {
        self.expander = Some(expander);
        self
    }

    pub fn with_filter_mode(mut self, mode: FilterMode) -> Self {
        self.filter_mode = mode;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    // --- Events ---

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // --- Loading ---

    /// Parameters a load issued now would send
    pub fn request_params(&self) -> LoadParams {
        let mut params = LoadParams::new(self.schema.field_names());
        if let Some(limit) = self.options.limit {
            params.start = Some((self.page - 1).saturating_mul(limit));
            params.limit = Some(limit);
            params.page = Some(self.page);
        }
        if self.options.remote_sort && !self.sorters.is_empty() {
            params.sorters = Some(self.sorters.clone());
        }
        if self.options.remote_filter {
            if let Some(filters) = &self.filters {
                params.filters = Some(filters.clone());
                params.filter_mode = Some(self.filter_mode);
            }
        }
        params
    }

    /// Parameters of a children request: the remote sort and filter without
    /// paging
    fn children_params(&self) -> LoadParams {
        LoadParams {
            start: None,
            limit: None,
            page: None,
            ..self.request_params()
        }
    }

    /// Load the current page from the backend, replacing the dataset.
    ///
    /// Returns `false` on failure; the previous dataset stays in place and
    /// [`TreeStore::is_loaded`] turns false.
    pub async fn load(&mut self) -> bool {
        let params = self.request_params();
        self.events.emit(&StoreEvent::BeforeLoad(params.clone()));

        let result = match self.backend.load(&params).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, page = self.page, "Load failed");
                self.loaded = false;
                return false;
            }
        };

        let mut data =
            Dataset::with_matcher(&result.rows, self.schema.clone(), self.matcher.clone());
        // Operations the backend already performed are only recorded.
        data.sort(&self.sorters, !self.options.remote_sort);
        data.filter(
            self.filters.as_ref(),
            self.filter_mode,
            !self.options.remote_filter,
        );

        self.total = result.total.unwrap_or(result.rows.len());
        let count = data.count();
        self.data = Some(data);
        self.current_params = Some(params);
        self.loaded = true;
        info!(count, total = self.total, page = self.page, "Store loaded");

        self.events.emit(&StoreEvent::Load {
            count,
            total: self.total,
        });
        self.events.emit(&StoreEvent::Update);
        true
    }

    pub async fn reload(&mut self) -> bool {
        self.load().await
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Parameters of the last successful load
    pub fn current_params(&self) -> Option<&LoadParams> {
        self.current_params.as_ref()
    }

    /// Whether a reload would ask the backend for something different
    pub fn is_stale(&self) -> bool {
        self.current_params.as_ref() != Some(&self.request_params())
    }

    // --- Paging ---

    /// 1-based page number
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn limit(&self) -> Option<usize> {
        self.options.limit
    }

    /// Change the page size and return to the first page
    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.options.limit = limit.filter(|limit| *limit > 0);
        self.page = 1;
    }

    pub fn page_count(&self) -> usize {
        match self.options.limit {
            Some(limit) => self.total.div_ceil(limit).max(1),
            None => 1,
        }
    }

    pub async fn load_page(&mut self, page: usize) -> bool {
        self.set_page(page);
        self.load().await
    }

    pub async fn next_page(&mut self) -> bool {
        if self.page >= self.page_count() {
            return false;
        }
        self.load_page(self.page + 1).await
    }

    pub async fn previous_page(&mut self) -> bool {
        if self.page <= 1 {
            return false;
        }
        self.load_page(self.page - 1).await
    }

    // --- Data access ---

    pub fn dataset(&self) -> Option<&Dataset> {
        self.data.as_ref()
    }

    /// Top-level records of the current view
    pub fn records(&self) -> &[Record] {
        self.data.as_ref().map(Dataset::records).unwrap_or(&[])
    }

    pub fn count(&self) -> usize {
        self.records().len()
    }

    /// Total reported by the backend, or the row count of the last load
    pub fn total(&self) -> usize {
        self.total
    }

    /// Record at `path`, walking the current view. `None` for an empty or
    /// out-of-range path.
    pub fn get(&self, path: &[usize]) -> Option<Record> {
        let (first, rest) = path.split_first()?;
        let mut current = self.data.as_ref()?.get(*first)?.clone();
        for index in rest {
            current = current.child(*index)?;
        }
        Some(current)
    }

    /// Path of `record` in the current view
    pub fn path_of(&self, record: &Record) -> Option<Path> {
        self.search(|candidate| candidate.ptr_eq(record))
            .map(|(path, _)| path)
    }

    /// First record whose `field` equals `value`
    pub fn find(&self, field: &str, value: impl Into<Value>) -> Option<Record> {
        let condition = FilterCondition::equals(value);
        self.search(|record| self.matcher.matches(&record.get(field), &condition))
            .map(|(_, record)| record)
    }

    /// Path of the first record whose `field` equals `value`
    pub fn find_index(&self, field: &str, value: impl Into<Value>) -> Option<Path> {
        let condition = FilterCondition::equals(value);
        self.search(|record| self.matcher.matches(&record.get(field), &condition))
            .map(|(path, _)| path)
    }

    /// First record identical to `target`
    pub fn match_record<'a>(&self, target: impl Into<RecordMatcher<'a>>) -> Option<Record> {
        let target = target.into();
        self.search(|record| record.is_equal(target))
            .map(|(_, record)| record)
    }

    /// Path of the first record identical to `target`
    pub fn match_index<'a>(&self, target: impl Into<RecordMatcher<'a>>) -> Option<Path> {
        let target = target.into();
        self.search(|record| record.is_equal(target))
            .map(|(path, _)| path)
    }

    /// Depth-first pre-order search over loaded children of the current view.
    fn search<F>(&self, predicate: F) -> Option<(Path, Record)>
    where
        F: Fn(&Record) -> bool,
    {
        fn walk<F>(records: &[Record], path: &mut Path, predicate: &F) -> Option<(Path, Record)>
        where
            F: Fn(&Record) -> bool,
        {
            for (index, record) in records.iter().enumerate() {
                path.push(index);
                if predicate(record) {
                    return Some((path.clone(), record.clone()));
                }
                let children = record.children();
                if let Some(found) = walk(children.as_slice(), path, predicate) {
                    return Some(found);
                }
                path.pop();
            }
            None
        }

        walk(self.records(), &mut Vec::new(), &predicate)
    }

    // --- Expansion ---

    /// Make the children of a node available.
    ///
    /// Leaves return `false`; already loaded children return `true` without a
    /// fetch. Pending children are fetched through the expander, or the
    /// backend when none is set, then sorted and filtered like the rest of the
    /// tree.
    pub async fn expand(&mut self, node: impl Into<NodeRef>) -> bool {
        let record = match node.into() {
            NodeRef::Record(record) => record,
            NodeRef::Path(path) => match self.get(&path) {
                Some(record) => record,
                None => return false,
            },
        };

        if !record.has_children() {
            return false;
        }
        if !record.is_expandable() {
            return true;
        }

        // Only the backend receives the remote sort and filter; an expander's
        // rows are brought in line locally.
        let (rows, delegated) = match &self.expander {
            Some(expander) => (expander.expand(&record).await, false),
            None => {
                let params = self.children_params();
                (self.backend.load_children(&record, &params).await, true)
            }
        };
        match rows {
            Ok(rows) => {
                debug!(children = rows.len(), depth = record.depth(), "Expanded record");
                record.set_children(&rows);
                self.on_children_updated(&record, delegated);
                true
            }
            Err(err) => {
                warn!(error = %err, "Expand failed");
                false
            }
        }
    }

    /// Expand every node down to `depth` path-length levels.
    ///
    /// Returns how many nodes were fetched.
    pub async fn expand_all(&mut self, depth: impl Into<ExpandDepth>) -> usize {
        let depth = depth.into();
        let mut frontier: Vec<Record> = self.records().to_vec();
        let mut level = 1;
        let mut fetched = 0;

        while !frontier.is_empty() {
            if let ExpandDepth::Levels(max) = depth {
                if level > max {
                    break;
                }
            }
            let mut next = Vec::new();
            for record in frontier {
                if !record.has_children() {
                    continue;
                }
                if record.is_expandable() {
                    if !self.expand(&record).await {
                        continue;
                    }
                    fetched += 1;
                }
                next.extend(record.children().into_vec());
            }
            frontier = next;
            level += 1;
        }
        fetched
    }

    /// Ancestors of a raw row, root first.
    ///
    /// Loaded data is searched first. When nothing matches and the backend
    /// resolves hierarchy, the ancestor chain is fetched, expanded top-down,
    /// and the search runs once more.
    pub async fn get_parents(&mut self, child: &Row) -> Option<Vec<Record>> {
        if let Some(found) = self.match_record(child) {
            return Some(found.parents());
        }
        if !self.options.remote_expand {
            return None;
        }

        let params = LoadParams::new(self.schema.field_names());
        let chain = match self.backend.load_parents(child, &params).await {
            Ok(chain) => chain,
            Err(err) => {
                warn!(error = %err, "Parent resolution failed");
                return None;
            }
        };
        debug!(ancestors = chain.len(), "Resolving parent chain");

        let mut level: Vec<Record> = self.records().to_vec();
        for row in &chain {
            let Some(ancestor) = level.iter().find(|record| record.is_equal(row)).cloned() else {
                break;
            };
            if ancestor.is_expandable() {
                self.expand(&ancestor).await;
            }
            level = ancestor.children().into_vec();
        }

        self.match_record(child).map(|found| found.parents())
    }

    // --- Sort and filter ---

    pub fn sorters(&self) -> &Sorters {
        &self.sorters
    }

    pub fn filters(&self) -> Option<&Filters> {
        self.filters.as_ref()
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter_mode
    }

    /// Sort by a single field
    pub async fn sort(&mut self, field: &str, direction: SortDirection) {
        self.sorters = Sorters::single(field, direction);
        self.on_update().await;
    }

    /// Replace the sort with an ordered multi-field sort
    pub async fn multi_sort(&mut self, sorters: Sorters) {
        self.sorters = sorters;
        self.on_update().await;
    }

    /// Add or replace the filter on one field
    pub async fn set_filter(&mut self, field: &str, condition: FilterCondition) {
        self.filters
            .get_or_insert_with(Filters::new)
            .set(field, condition);
        self.filters_changed().await;
    }

    /// Replace every filter. `None` removes them all.
    pub async fn set_filters(&mut self, filters: Option<Filters>, mode: FilterMode) {
        self.filters = filters.filter(|filters| !filters.is_empty());
        self.filter_mode = mode;
        self.filters_changed().await;
    }

    pub async fn remove_filter(&mut self, field: &str) {
        if let Some(filters) = self.filters.as_mut() {
            filters.remove(field);
            if filters.is_empty() {
                self.filters = None;
            }
        }
        self.filters_changed().await;
    }

    pub async fn reset_filter(&mut self) {
        self.filters = None;
        self.filters_changed().await;
    }

    async fn filters_changed(&mut self) {
        // A server-side filter changes the row set, so earlier pages are void.
        if self.options.remote_filter {
            self.page = 1;
        }
        self.on_update().await;
    }

    /// Bring the dataset in line with the requested sorters and filters.
    async fn on_update(&mut self) {
        let Some(data) = self.data.as_ref() else {
            return;
        };
        let sort_mismatch = data.sorters() != &self.sorters;
        let filter_mismatch =
            data.filters() != self.filters.as_ref() || data.filter_mode() != self.filter_mode;

        if sort_mismatch {
            if self.options.remote_sort {
                debug!("Sorters changed, reloading");
                self.reload().await;
                return;
            }
            let sorters = self.sorters.clone();
            if let Some(data) = self.data.as_mut() {
                data.sort(&sorters, true);
            }
        }

        if filter_mismatch {
            if self.options.remote_filter {
                debug!("Filters changed, reloading");
                self.reload().await;
                return;
            }
            let filters = self.filters.clone();
            let mode = self.filter_mode;
            if let Some(data) = self.data.as_mut() {
                data.filter(filters.as_ref(), mode, true);
            }
        }

        self.events.emit(&StoreEvent::Update);
    }

    /// Bring freshly installed children in line with the store's sorters and
    /// filters. With `delegated`, the backend already applied the remote ones.
    fn on_children_updated(&self, record: &Record, delegated: bool) {
        record.sort(&self.sorters, !(delegated && self.options.remote_sort));
        record.filter(
            self.filters.as_ref(),
            self.filter_mode,
            !(delegated && self.options.remote_filter),
        );
        self.events.emit(&StoreEvent::UpdateChildren(record.clone()));
    }
}

impl std::fmt::Debug for TreeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeStore")
            .field("options", &self.options)
            .field("page", &self.page)
            .field("total", &self.total)
            .field("sorters", &self.sorters)
            .field("filters", &self.filters)
            .field("filter_mode", &self.filter_mode)
            .field("loaded", &self.loaded)
            .field("data", &self.data)
            .finish()
    }
}
