//! Core types shared across the record store.

use serde_json::{Map, Value};

/// Row: a raw data row, field name -> value
pub type Row = Map<String, Value>;

/// Path: ordered child indices addressing a node, root level first
pub type Path = Vec<usize>;

/// RecordHash: hex-encoded blake3 digest of a primary-key projection
pub type RecordHash = String;
