//! Tooling
//!
//! Command-line front end: loads a store from a JSON file or a remote URL,
//! applies sort, filter, paging, and expansion, and renders the visible tree.

pub mod cli;
pub mod format;

pub use cli::{Cli, CliContext, Commands, QueryArgs};
