//! IV term structure.
//!
//! Average implied volatility and total open interest per expiration, in
//! chronological order. The result is the chronological head of the
//! expirations present (not the ones nearest to today).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::OptionRecord;

/// Aggregates for one expiration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirationIv {
    pub date: NaiveDate,
    /// Mean IV of the expiration's records, rounded to two decimals.
    pub avg_iv: f64,
    /// Summed open interest.
    pub volume: i64,
    pub count: usize,
}

#[derive(Default)]
struct Bucket {
    iv_sum: f64,
    volume: i64,
    count: usize,
}

/// Round to two decimals for display.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Group by expiration and keep the first `limit` expirations.
///
/// Records without an expiration have no place on a term structure and are
/// skipped.
pub fn iv_by_expiration(records: &[OptionRecord], limit: usize) -> Vec<ExpirationIv> {
    let mut buckets: BTreeMap<NaiveDate, Bucket> = BTreeMap::new();

    for record in records {
        let Some(date) = record.expiration_date else {
            continue;
        };
        let bucket = buckets.entry(date).or_default();
        bucket.iv_sum += record.implied_volatility;
        bucket.volume = bucket.volume.saturating_add(record.open_interest);
        bucket.count += 1;
    }

    buckets
        .into_iter()
        .take(limit)
        .map(|(date, bucket)| ExpirationIv {
            date,
            avg_iv: if bucket.count > 0 {
                round2(bucket.iv_sum / bucket.count as f64)
            } else {
                0.0
            },
            volume: bucket.volume,
            count: bucket.count,
        })
        .collect()
}
