//! Filtering and sorting of option records.
//!
//! Both stages are pure: they take a slice and return a new collection.

pub mod filter;
pub mod sort;

pub use filter::{filter, FilterSpec};
pub use sort::{sort, ParseSortFieldError, SortDirection, SortField, SortSpec};
