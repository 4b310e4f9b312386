//! Call/put pairing for the options chain table.
//!
//! The organized view lists each call immediately followed by the put with the
//! same expiration and strike, then every put that found no call. Calls and
//! puts are each ordered by (expiration, strike) first; this ordering is fixed
//! and independent of whatever sort the caller displays elsewhere.
//!
//! Pairing is greedy: each call takes the first unconsumed matching put in
//! put order, so when several puts share a date and strike the earliest one
//! in source order wins. Records of `Unknown` type are not part of the
//! organized view.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::{OptionRecord, OptionType};

/// Strikes closer than this are considered equal.
pub const DEFAULT_STRIKE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Counts describing one organize pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingSummary {
    pub pairs: usize,
    pub unmatched_calls: usize,
    pub unmatched_puts: usize,
    /// Records left out because their type is unknown.
    pub excluded: usize,
}

/// Expiration then strike, ascending. Undated records come first.
fn chain_order(a: &&OptionRecord, b: &&OptionRecord) -> Ordering {
    a.expiration_date
        .cmp(&b.expiration_date)
        .then_with(|| a.strike_price.cmp(&b.strike_price))
}

/// Organize with the default strike tolerance of 0.01.
pub fn organize(records: &[OptionRecord]) -> Vec<OptionRecord> {
    organize_with_tolerance(records, DEFAULT_STRIKE_TOLERANCE)
}

/// Interleave calls with their matching puts.
///
/// The output holds every call and every put from `records` exactly once.
pub fn organize_with_tolerance(records: &[OptionRecord], tolerance: Decimal) -> Vec<OptionRecord> {
    organize_detailed(records, tolerance).0
}

/// Organize and report how the pairing went.
pub fn organize_detailed(
    records: &[OptionRecord],
    tolerance: Decimal,
) -> (Vec<OptionRecord>, PairingSummary) {
    let mut calls: Vec<&OptionRecord> = records
        .iter()
        .filter(|r| r.quote_type == OptionType::Call)
        .collect();
    let mut puts: Vec<&OptionRecord> = records
        .iter()
        .filter(|r| r.quote_type == OptionType::Put)
        .collect();

    // Stable, so equal (date, strike) keys stay in source order.
    calls.sort_by(chain_order);
    puts.sort_by(chain_order);

    let mut consumed = vec![false; puts.len()];
    let mut organized = Vec::with_capacity(calls.len() + puts.len());
    let mut summary = PairingSummary {
        excluded: records.len() - calls.len() - puts.len(),
        ..PairingSummary::default()
    };

    for call in &calls {
        organized.push((*call).clone());
        match find_matching_put(&puts, &consumed, call, tolerance) {
            Some(idx) => {
                consumed[idx] = true;
                organized.push(puts[idx].clone());
                summary.pairs += 1;
            }
            None => summary.unmatched_calls += 1,
        }
    }

    for (put, used) in puts.iter().zip(&consumed) {
        if !used {
            organized.push((*put).clone());
            summary.unmatched_puts += 1;
        }
    }

    debug!(
        pairs = summary.pairs,
        unmatched_calls = summary.unmatched_calls,
        unmatched_puts = summary.unmatched_puts,
        excluded = summary.excluded,
        "organized options chain"
    );

    (organized, summary)
}

/// Index of the first unconsumed put with the call's expiration and a strike
/// within `tolerance` of the call's.
///
/// `puts` is ordered by (expiration, strike), so candidates form one
/// contiguous run: binary search to its start, then walk it.
fn find_matching_put(
    puts: &[&OptionRecord],
    consumed: &[bool],
    call: &OptionRecord,
    tolerance: Decimal,
) -> Option<usize> {
    let expiration = call.expiration_date?;
    let strike = call.strike_price;

    let start = puts.partition_point(|put| match put.expiration_date {
        None => true,
        Some(d) => d < expiration || (d == expiration && gap_at_least(strike, put.strike_price, tolerance)),
    });

    puts[start..]
        .iter()
        .enumerate()
        .take_while(|(_, put)| {
            put.expiration_date == Some(expiration) && !gap_at_least(put.strike_price, strike, tolerance)
        })
        .map(|(offset, _)| start + offset)
        .find(|idx| !consumed[*idx])
}

/// Whether `a - b >= tolerance`. A difference too large for a `Decimal` is
/// decided by which side is larger.
fn gap_at_least(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    a.checked_sub(b).map_or(a > b, |gap| gap >= tolerance)
}
