//! One-call derivation of every view of a record set.
//!
//! The view state is an explicit immutable value: changing a filter or the
//! sort produces a new [`ViewState`] and everything is re-derived from the
//! same source records.
//!
//! Filter -> Sort -> { Statistics, Analytics }
//!              \-> Organizer

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analytics::{self, Analytics};
use crate::chain::{organize_detailed, PairingSummary};
use crate::config::ChainConfig;
use crate::data::OptionRecord;
use crate::metrics::{aggregate, Statistics};
use crate::query::{filter, sort, FilterSpec, SortField, SortSpec};

/// Active filter and sort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewState {
    pub filters: FilterSpec,
    pub sort: SortSpec,
}

impl ViewState {
    pub fn new(filters: FilterSpec, sort: SortSpec) -> Self {
        Self { filters, sort }
    }

    pub fn with_filters(&self, filters: FilterSpec) -> Self {
        Self {
            filters,
            sort: self.sort,
        }
    }

    /// Sort on `field`: the current field flips direction, another field
    /// starts ascending.
    pub fn toggle_sort(&self, field: SortField) -> Self {
        Self {
            filters: self.filters.clone(),
            sort: self.sort.toggled(field),
        }
    }
}

/// Everything shown for one record set under one view state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedView {
    /// Filtered and sorted rows.
    pub rows: Vec<OptionRecord>,
    /// Calls interleaved with their matching puts.
    pub organized: Vec<OptionRecord>,
    pub pairing: PairingSummary,
    /// Computed from `rows`, never from the unfiltered source.
    pub statistics: Statistics,
    pub analytics: Analytics,
}

/// Derive every view of `records` under `state`.
pub fn derive(records: &[OptionRecord], state: &ViewState, config: &ChainConfig) -> DerivedView {
    let filtered = filter(records, &state.filters);
    let rows = sort(&filtered, &state.sort);

    let statistics = aggregate(&rows);
    let analytics = analytics::project(&rows, &config.projection_limits());
    let (organized, pairing) = organize_detailed(&rows, config.strike_tolerance);

    debug!(
        source = records.len(),
        rows = rows.len(),
        organized = organized.len(),
        "derived view"
    );

    DerivedView {
        rows,
        organized,
        pairing,
        statistics,
        analytics,
    }
}
