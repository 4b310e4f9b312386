//! Options chain table ordering.

pub mod organizer;

pub use organizer::{
    organize, organize_detailed, organize_with_tolerance, PairingSummary,
    DEFAULT_STRIKE_TOLERANCE,
};
