//! Store backends: where a store's rows come from.
//!
//! A backend answers three questions: the top-level rows of a load, the
//! children of a record that was marked expandable, and the ancestor chain of
//! a row the store has not loaded yet.

use crate::error::StoreError;
use crate::record::Record;
use crate::schema::Schema;
use crate::store::params::LoadParams;
use crate::types::Row;
use async_trait::async_trait;
use serde_json::Value;

/// Rows returned by a load plus the backend's total count, if it reports one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadResult {
    pub rows: Vec<Row>,
    pub total: Option<usize>,
}

/// Transport strategy of a [`TreeStore`](crate::store::TreeStore).
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Fetch the top-level rows described by `params`.
    async fn load(&self, params: &LoadParams) -> Result<LoadResult, StoreError>;

    /// Fetch the children of `record`.
    async fn load_children(&self, record: &Record, params: &LoadParams)
        -> Result<Vec<Row>, StoreError>;

    /// Fetch the ancestors of `child`, ordered root first.
    async fn load_parents(&self, child: &Row, params: &LoadParams)
        -> Result<Vec<Row>, StoreError>;
}

/// Backend over rows held in memory as positional arrays.
///
/// Every load returns the full data set; paging, sorting, and filtering are
/// left to the store.
pub struct ArrayBackend {
    rows: Vec<Row>,
}

impl ArrayBackend {
    /// Map positional `values` onto the fields of `schema`
    pub fn new(schema: &Schema, values: &[Vec<Value>]) -> Self {
        Self {
            rows: values
                .iter()
                .map(|row| schema.row_from_positional(row))
                .collect(),
        }
    }

    /// Backend over rows that already carry field names
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
}

#[async_trait]
impl StoreBackend for ArrayBackend {
    async fn load(&self, _params: &LoadParams) -> Result<LoadResult, StoreError> {
        Ok(LoadResult {
            total: Some(self.rows.len()),
            rows: self.rows.clone(),
        })
    }

    async fn load_children(
        &self,
        _record: &Record,
        _params: &LoadParams,
    ) -> Result<Vec<Row>, StoreError> {
        Err(StoreError::Unsupported(
            "array-backed stores hold every child up front",
        ))
    }

    async fn load_parents(
        &self,
        _child: &Row,
        _params: &LoadParams,
    ) -> Result<Vec<Row>, StoreError> {
        Err(StoreError::Unsupported(
            "array-backed stores hold every ancestor up front",
        ))
    }
}
