//! Error types for the record store.

use thiserror::Error;

/// Errors raised by store backends, fetchers, and configuration plumbing.
///
/// The [`TreeStore`](crate::store::TreeStore) itself never surfaces these to
/// its callers; failures there become observable state instead.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Remote rejected request: {0}")]
    Rejected(String),

    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
