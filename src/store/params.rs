//! Load parameters and their request encoding.

use crate::error::StoreError;
use crate::query::{FilterMode, Filters, Sorters};
use std::collections::BTreeMap;

/// Flat `name -> value` request parameters handed to a fetcher
pub type RequestParams = BTreeMap<String, String>;

/// What a load asks the backend for.
///
/// Paging, sort, and filter entries are present only when the store delegates
/// them to the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadParams {
    pub fields: Vec<String>,
    pub start: Option<usize>,
    pub limit: Option<usize>,
    pub page: Option<usize>,
    pub sorters: Option<Sorters>,
    pub filters: Option<Filters>,
    pub filter_mode: Option<FilterMode>,
}

impl LoadParams {
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Encode as request parameters.
    ///
    /// `fields` is comma-joined; sorters and filters are JSON objects.
    pub fn to_request(&self) -> Result<RequestParams, StoreError> {
        let mut params = RequestParams::new();
        params.insert("fields".to_string(), self.fields.join(","));
        if let Some(start) = self.start {
            params.insert("start".to_string(), start.to_string());
        }
        if let Some(limit) = self.limit {
            params.insert("limit".to_string(), limit.to_string());
        }
        if let Some(page) = self.page {
            params.insert("page".to_string(), page.to_string());
        }
        if let Some(sorters) = &self.sorters {
            params.insert("sorters".to_string(), serde_json::to_string(sorters)?);
        }
        if let Some(filters) = &self.filters {
            params.insert("filters".to_string(), serde_json::to_string(filters)?);
            let mode = self.filter_mode.unwrap_or_default();
            params.insert("filterMode".to_string(), mode.to_string());
        }
        Ok(params)
    }
}
