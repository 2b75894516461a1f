//! Remote-backed stores
//!
//! [`RemoteBackend`] turns store requests into calls on a [`RemoteFetch`]
//! collaborator and checks the `{success, records, total, message}` envelope
//! that comes back.

use crate::error::StoreError;
use crate::record::Record;
use crate::store::backend::{LoadResult, StoreBackend};
use crate::store::params::{LoadParams, RequestParams};
use crate::types::Row;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Envelope returned by a remote fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResponse {
    pub success: bool,
    pub records: Vec<Row>,
    pub total: Option<usize>,
    pub message: Option<String>,
}

/// Names of the envelope fields in a response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseFields {
    #[serde(default = "default_records_field")]
    pub records: String,
    #[serde(default = "default_total_field")]
    pub total: String,
    #[serde(default = "default_success_field")]
    pub success: String,
    #[serde(default = "default_message_field")]
    pub message: String,
}

fn default_records_field() -> String {
    "records".to_string()
}

fn default_total_field() -> String {
    "total".to_string()
}

fn default_success_field() -> String {
    "success".to_string()
}

fn default_message_field() -> String {
    "message".to_string()
}

impl Default for ResponseFields {
    fn default() -> Self {
        Self {
            records: default_records_field(),
            total: default_total_field(),
            success: default_success_field(),
            message: default_message_field(),
        }
    }
}

impl FetchResponse {
    pub fn ok(records: Vec<Row>, total: Option<usize>) -> Self {
        Self {
            success: true,
            records,
            total,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            records: Vec::new(),
            total: None,
            message: Some(message.into()),
        }
    }

    /// Decode a JSON body using the configured field names.
    ///
    /// A missing success flag counts as success. A body that is a bare array
    /// is taken as the record list. Non-object records are skipped.
    pub fn from_body(body: &Value, fields: &ResponseFields) -> Result<Self, StoreError> {
        if let Value::Array(items) = body {
            return Ok(Self::ok(rows_of(items), None));
        }
        let Value::Object(map) = body else {
            return Err(StoreError::Transport(format!(
                "Unexpected response body: {}",
                body
            )));
        };

        let success = map
            .get(&fields.success)
            .map(|v| match v {
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_i64() != Some(0),
                Value::String(s) => s == "true" || s == "1",
                _ => false,
            })
            .unwrap_or(true);
        let records = match map.get(&fields.records) {
            Some(Value::Array(items)) => rows_of(items),
            _ => Vec::new(),
        };
        let total = map.get(&fields.total).and_then(|v| match v {
            Value::Number(n) => n.as_u64().map(|n| n as usize),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });
        let message = map
            .get(&fields.message)
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            success,
            records,
            total,
            message,
        })
    }
}

fn rows_of(items: &[Value]) -> Vec<Row> {
    items
        .iter()
        .filter_map(Value::as_object)
        .cloned()
        .collect()
}

/// Remote collaborator: one request, one envelope.
#[async_trait]
pub trait RemoteFetch: Send + Sync {
    async fn fetch(&self, url: &str, params: &RequestParams)
        -> Result<FetchResponse, StoreError>;
}

/// Callback that fetches the children of an expandable record instead of the
/// backend.
#[async_trait]
pub trait RemoteExpander: Send + Sync {
    async fn expand(&self, record: &Record) -> Result<Vec<Row>, StoreError>;
}

/// Backend that delegates to a [`RemoteFetch`] at a fixed URL
pub struct RemoteBackend {
    fetcher: Arc<dyn RemoteFetch>,
    url: String,
}

impl RemoteBackend {
    pub fn new(fetcher: Arc<dyn RemoteFetch>, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self, params: RequestParams) -> Result<FetchResponse, StoreError> {
        debug!(url = %self.url, params = params.len(), "Remote fetch");
        let response = self.fetcher.fetch(&self.url, &params).await?;
        if !response.success {
            return Err(StoreError::Rejected(
                response
                    .message
                    .unwrap_or_else(|| "request failed".to_string()),
            ));
        }
        Ok(response)
    }
}

#[async_trait]
impl StoreBackend for RemoteBackend {
    async fn load(&self, params: &LoadParams) -> Result<LoadResult, StoreError> {
        let response = self.request(params.to_request()?).await?;
        Ok(LoadResult {
            rows: response.records,
            total: response.total,
        })
    }

    async fn load_children(
        &self,
        record: &Record,
        params: &LoadParams,
    ) -> Result<Vec<Row>, StoreError> {
        let mut request = params.to_request()?;
        request.insert(
            "parent".to_string(),
            serde_json::to_string(&record.get_primary(false))?,
        );
        Ok(self.request(request).await?.records)
    }

    async fn load_parents(
        &self,
        child: &Row,
        params: &LoadParams,
    ) -> Result<Vec<Row>, StoreError> {
        let mut request = params.to_request()?;
        request.insert("child".to_string(), serde_json::to_string(child)?);
        Ok(self.request(request).await?.records)
    }
}
