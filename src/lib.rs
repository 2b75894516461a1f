//! Grove: Hierarchical Record Stores
//!
//! Typed, tree-shaped records with dirty tracking and stable identity,
//! datasets that sort and filter whole trees while keeping an unfiltered
//! baseline, and a store that loads them from memory or a remote endpoint
//! with paging, lazy child expansion, and path addressing.

pub mod concurrency;
pub mod config;
pub mod dataset;
pub mod dirty;
pub mod error;
pub mod logging;
pub mod query;
pub mod record;
pub mod schema;
pub mod store;
pub mod tooling;
pub mod types;

pub use dataset::Dataset;
pub use dirty::DirtyIndex;
pub use error::StoreError;
pub use query::{
    FilterCondition, FilterMatcher, FilterMode, FilterOperator, Filters, OperatorMatcher,
    SortDirection, Sorters,
};
pub use record::{Children, Record, RecordMatcher, WeakRecord};
pub use schema::{FieldDef, FieldType, Schema};
pub use store::{ExpandDepth, NodeRef, StoreEvent, StoreOptions, TreeStore};
pub use types::{Path, RecordHash, Row};
