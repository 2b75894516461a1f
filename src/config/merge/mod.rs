//! Source composition for [`GroveConfig`](crate::config::GroveConfig).

pub mod merge_policy;
pub mod service;
