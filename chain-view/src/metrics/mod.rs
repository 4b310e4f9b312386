//! Summary statistics module.
//!
//! Provides the scalar summary shown above the chain table:
//! - Call, put and total counts
//! - Average implied volatility and strike
//! - Total open interest
//! - Whole-collection call/put ratio

pub mod statistics;

pub use statistics::{aggregate, Statistics};
