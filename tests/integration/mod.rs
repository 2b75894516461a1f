//! Integration tests for the hierarchical record store

mod dataset_scenarios;
mod properties;
mod store_remote;
mod support;
