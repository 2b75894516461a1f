//! Sort and filter specifications shared by records, datasets, and stores.

pub mod filter;
pub mod sort;

pub use filter::{FilterCondition, FilterMatcher, FilterMode, FilterOperator, Filters, OperatorMatcher};
pub use sort::{compare_values, SortDirection, Sorters};
