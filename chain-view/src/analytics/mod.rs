//! Chart-ready projections of a filtered collection.
//!
//! Provides:
//! - Volatility smile (IV by strike, calls and puts as separate series)
//! - Top open-interest strikes
//! - IV term structure by expiration
//! - Call/put ratio by expiration
//!
//! Every projection is independent and reads its input without reordering it.

pub mod iv_term_structure;
pub mod sentiment;
pub mod smile;
pub mod volume;

use serde::{Deserialize, Serialize};

use crate::data::OptionRecord;

pub use iv_term_structure::{iv_by_expiration, ExpirationIv};
pub use sentiment::{call_put_ratio_by_expiration, ExpirationSentiment};
pub use smile::{volatility_smile, SmilePoint, VolatilitySmile};
pub use volume::{top_volume_strikes, VolumeBar};

/// How many entries each truncated projection keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionLimits {
    pub top_volume: usize,
    /// Expirations kept on the term structure, chronologically.
    pub term_structure: usize,
    pub sentiment: usize,
}

impl Default for ProjectionLimits {
    fn default() -> Self {
        Self {
            top_volume: 15,
            term_structure: 12,
            sentiment: 10,
        }
    }
}

/// All four projections over one collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub smile: VolatilitySmile,
    pub top_volume: Vec<VolumeBar>,
    pub iv_term_structure: Vec<ExpirationIv>,
    pub sentiment: Vec<ExpirationSentiment>,
}

impl Analytics {
    pub fn is_empty(&self) -> bool {
        self.smile.is_empty()
            && self.top_volume.is_empty()
            && self.iv_term_structure.is_empty()
            && self.sentiment.is_empty()
    }
}

/// Run every projection over `records`.
pub fn project(records: &[OptionRecord], limits: &ProjectionLimits) -> Analytics {
    Analytics {
        smile: volatility_smile(records),
        top_volume: top_volume_strikes(records, limits.top_volume),
        iv_term_structure: iv_by_expiration(records, limits.term_structure),
        sentiment: call_put_ratio_by_expiration(records, limits.sentiment),
    }
}
