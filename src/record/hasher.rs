//! Hash computation for record identity

use crate::types::{RecordHash, Row};

/// Compute the RecordHash of a primary-key projection
///
/// The projection is serialized to JSON with keys in sorted order, so equal
/// projections always hash identically regardless of how the row was built.
pub fn compute_record_hash(projection: &Row) -> RecordHash {
    let encoded = serde_json::to_vec(projection).unwrap_or_default();
    hex::encode(blake3::hash(&encoded).as_bytes())
}
