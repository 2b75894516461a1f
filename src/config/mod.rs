//! Configuration
//!
//! Layered configuration for stores, the remote fetcher, and logging. Sources
//! merge in order: built-in defaults, the global config file, the workspace
//! `grove.toml`, then `GROVE__*` environment variables.

pub mod facade;
pub mod merge;
pub mod paths;
pub mod sources;

pub use facade::ConfigLoader;

use crate::logging::LoggingConfig;
use crate::query::FilterMode;
use crate::schema::DEFAULT_CHILDREN_FIELD;
use crate::store::ResponseFields;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroveConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Store behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Page size; unset disables paging
    #[serde(default)]
    pub limit: Option<usize>,

    /// Let the backend sort
    #[serde(default)]
    pub remote_sort: bool,

    /// Let the backend filter
    #[serde(default)]
    pub remote_filter: bool,

    /// Ask the backend for ancestor chains of unknown rows
    #[serde(default)]
    pub remote_expand: bool,

    #[serde(default)]
    pub filter_mode: FilterMode,

    /// Fields forming a record's identity; empty means all fields
    #[serde(default)]
    pub primary_keys: Vec<String>,

    #[serde(default = "default_children_field")]
    pub children_field: String,
}

fn default_children_field() -> String {
    DEFAULT_CHILDREN_FIELD.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            limit: None,
            remote_sort: false,
            remote_filter: false,
            remote_expand: false,
            filter_mode: FilterMode::And,
            primary_keys: Vec::new(),
            children_field: default_children_field(),
        }
    }
}

/// Remote fetcher settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_records_field")]
    pub records_field: String,

    #[serde(default = "default_total_field")]
    pub total_field: String,

    #[serde(default = "default_success_field")]
    pub success_field: String,

    #[serde(default = "default_message_field")]
    pub message_field: String,

    /// Request timeout in milliseconds; unset means no timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: Option<u64>,
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

fn default_timeout_ms() -> Option<u64> {
    Some(30_000)
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            records_field: default_records_field(),
            total_field: default_total_field(),
            success_field: default_success_field(),
            message_field: default_message_field(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl RemoteConfig {
    /// Envelope field names for response decoding
    pub fn response_fields(&self) -> ResponseFields {
        ResponseFields {
            records: self.records_field.clone(),
            total: self.total_field.clone(),
            success: self.success_field.clone(),
            message: self.message_field.clone(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GroveConfig::default();
        assert_eq!(config.store.children_field, "children");
        assert_eq!(config.store.limit, None);
        assert!(!config.store.remote_sort);
        assert_eq!(config.remote.records_field, "records");
        assert_eq!(config.remote.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: GroveConfig = serde_json::from_str(
            r#"{"store": {"limit": 25, "remote_filter": true, "filter_mode": "OR"},
                "remote": {"records_field": "data"}}"#,
        )
        .unwrap();
        assert_eq!(config.store.limit, Some(25));
        assert!(config.store.remote_filter);
        assert_eq!(config.store.filter_mode, FilterMode::Or);
        assert_eq!(config.store.children_field, "children");
        let fields = config.remote.response_fields();
        assert_eq!(fields.records, "data");
        assert_eq!(fields.total, "total");
    }
}
