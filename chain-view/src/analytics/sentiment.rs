//! Call/put ratio per expiration.
//!
//! Unlike the whole-collection ratio in [`crate::metrics::Statistics`], which
//! is undefined without puts, the per-expiration ratio falls back to the raw
//! call count when an expiration has no puts.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::iv_term_structure::round2;
use crate::data::{OptionRecord, OptionType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirationSentiment {
    pub date: NaiveDate,
    pub calls: usize,
    pub puts: usize,
    /// calls / puts rounded to two decimals, or `calls` when there are no puts.
    pub ratio: f64,
    pub call_volume: i64,
    pub put_volume: i64,
}

#[derive(Default)]
struct Tally {
    calls: usize,
    puts: usize,
    call_volume: i64,
    put_volume: i64,
}

impl Tally {
    fn ratio(&self) -> f64 {
        if self.puts > 0 {
            round2(self.calls as f64 / self.puts as f64)
        } else {
            self.calls as f64
        }
    }
}

/// Per-expiration call/put counts for the first `limit` expirations.
///
/// Unknown-type records still open their expiration's group but add to no
/// count. Records without an expiration are skipped.
pub fn call_put_ratio_by_expiration(records: &[OptionRecord], limit: usize) -> Vec<ExpirationSentiment> {
    let mut tallies: BTreeMap<NaiveDate, Tally> = BTreeMap::new();

    for record in records {
        let Some(date) = record.expiration_date else {
            continue;
        };
        let tally = tallies.entry(date).or_default();
        match record.quote_type {
            OptionType::Call => {
                tally.calls += 1;
                tally.call_volume = tally.call_volume.saturating_add(record.open_interest);
            }
            OptionType::Put => {
                tally.puts += 1;
                tally.put_volume = tally.put_volume.saturating_add(record.open_interest);
            }
            OptionType::Unknown => {}
        }
    }

    tallies
        .into_iter()
        .take(limit)
        .map(|(date, tally)| ExpirationSentiment {
            date,
            calls: tally.calls,
            puts: tally.puts,
            ratio: tally.ratio(),
            call_volume: tally.call_volume,
            put_volume: tally.put_volume,
        })
        .collect()
}
