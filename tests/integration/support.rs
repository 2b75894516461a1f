//! Shared fixtures: schemas, row helpers, and an in-memory remote server.

use async_trait::async_trait;
use grove::query::{FilterMode, Filters, OperatorMatcher, Sorters};
use grove::store::{FetchResponse, RemoteFetch, RequestParams};
use grove::{FieldDef, FieldType, Record, Row, Schema, StoreError};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::new(vec![
            FieldDef::new("id", FieldType::Int),
            FieldDef::new("name", FieldType::String),
            FieldDef::new("size", FieldType::Float),
            FieldDef::untyped("children"),
        ])
        .with_primary_keys(["id"]),
    )
}

pub fn row(value: Value) -> Row {
    value.as_object().cloned().expect("row literal must be an object")
}

pub fn rows(value: Value) -> Vec<Row> {
    value
        .as_array()
        .expect("rows literal must be an array")
        .iter()
        .map(|v| row(v.clone()))
        .collect()
}

pub fn ids(records: &[Record]) -> Vec<i64> {
    records
        .iter()
        .map(|r| r.get("id").as_i64().expect("id must be an integer"))
        .collect()
}

/// Directory-like tree used by the remote tests
pub fn catalog() -> Vec<Row> {
    rows(json!([
        {"id": 1, "name": "src", "size": 0, "children": [
            {"id": 11, "name": "main.rs", "size": 4.5},
            {"id": 12, "name": "store", "size": 0, "children": [
                {"id": 121, "name": "mod.rs", "size": 12.0},
                {"id": 122, "name": "http.rs", "size": 2.25}
            ]}
        ]},
        {"id": 2, "name": "docs", "size": 0, "children": [
            {"id": 21, "name": "guide.md", "size": 8.0}
        ]},
        {"id": 3, "name": "Cargo.toml", "size": 1.0},
        {"id": 4, "name": "README.md", "size": 3.0},
        {"id": 5, "name": "LICENSE", "size": 10.0}
    ]))
}

/// Remote collaborator over an in-memory tree.
///
/// Children are served lazily (`children: true`). Sort and filter parameters
/// apply to top-level and children requests; paging to top-level only.
pub struct FakeServer {
    tree: Vec<Row>,
    pub requests: Mutex<Vec<RequestParams>>,
    pub fail: Mutex<bool>,
}

impl FakeServer {
    pub fn new(tree: Vec<Row>) -> Arc<Self> {
        Arc::new(Self {
            tree,
            requests: Mutex::new(Vec::new()),
            fail: Mutex::new(false),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> RequestParams {
        self.requests.lock().last().cloned().unwrap_or_default()
    }

    fn lazy(rows: &[Row]) -> Vec<Row> {
        rows.iter()
            .map(|row| {
                let mut row = row.clone();
                if row.contains_key("children") {
                    row.insert("children".to_string(), Value::Bool(true));
                }
                row
            })
            .collect()
    }

    fn children(row: &Row) -> Vec<Row> {
        match row.get("children") {
            Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_object().cloned()).collect(),
            _ => Vec::new(),
        }
    }

    fn find_children(rows: &[Row], id: &Value) -> Option<Vec<Row>> {
        for row in rows {
            let children = Self::children(row);
            if row.get("id") == Some(id) {
                return Some(children);
            }
            if let Some(found) = Self::find_children(&children, id) {
                return Some(found);
            }
        }
        None
    }

    fn find_chain(rows: &[Row], id: &Value, chain: &mut Vec<Row>) -> bool {
        for row in rows {
            if row.get("id") == Some(id) {
                return true;
            }
            chain.push(row.clone());
            if Self::find_chain(&Self::children(row), id, chain) {
                return true;
            }
            chain.pop();
        }
        false
    }

    /// Apply the request's filters and sorters to `rows`.
    fn shape(mut rows: Vec<Row>, params: &RequestParams) -> Result<Vec<Row>, StoreError> {
        if let Some(filters) = params.get("filters") {
            let filters: Filters = serde_json::from_str(filters)?;
            let mode: FilterMode = params
                .get("filterMode")
                .and_then(|m| m.parse().ok())
                .unwrap_or_default();
            rows.retain(|row| filters.test(row, mode, &OperatorMatcher));
        }
        if let Some(sorters) = params.get("sorters") {
            let sorters: Sorters = serde_json::from_str(sorters)?;
            rows.sort_by(|a, b| sorters.compare_keys(&sorters.sort_key(a), &sorters.sort_key(b)));
        }
        Ok(rows)
    }

    fn top_level(&self, params: &RequestParams) -> Result<FetchResponse, StoreError> {
        let rows = Self::shape(self.tree.clone(), params)?;
        let total = rows.len();
        let start: usize = params.get("start").and_then(|s| s.parse().ok()).unwrap_or(0);
        let limit: usize = params
            .get("limit")
            .and_then(|s| s.parse().ok())
            .unwrap_or(total);
        let page: Vec<Row> = rows.into_iter().skip(start).take(limit).collect();
        Ok(FetchResponse::ok(Self::lazy(&page), Some(total)))
    }
}

#[async_trait]
impl RemoteFetch for FakeServer {
    async fn fetch(&self, _url: &str, params: &RequestParams) -> Result<FetchResponse, StoreError> {
        self.requests.lock().push(params.clone());
        if *self.fail.lock() {
            return Err(StoreError::Transport("connection reset".to_string()));
        }

        if let Some(parent) = params.get("parent") {
            let parent: Row = serde_json::from_str(parent)?;
            let id = parent.get("id").cloned().unwrap_or(Value::Null);
            return Ok(match Self::find_children(&self.tree, &id) {
                Some(children) => {
                    FetchResponse::ok(Self::lazy(&Self::shape(children, params)?), None)
                }
                None => FetchResponse::failed(format!("unknown parent {}", id)),
            });
        }

        if let Some(child) = params.get("child") {
            let child: Row = serde_json::from_str(child)?;
            let id = child.get("id").cloned().unwrap_or(Value::Null);
            let mut chain = Vec::new();
            if !Self::find_chain(&self.tree, &id, &mut chain) {
                return Ok(FetchResponse::failed(format!("unknown child {}", id)));
            }
            return Ok(FetchResponse::ok(Self::lazy(&chain), None));
        }

        self.top_level(params)
    }
}
