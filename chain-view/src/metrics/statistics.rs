//! Summary statistics over the filtered collection.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{OptionRecord, OptionType};

/// Scalar summary of a collection of option records.
///
/// Averages are over all records, including those of unknown type. An empty
/// collection yields all zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_options: usize,
    pub total_calls: usize,
    pub total_puts: usize,
    pub avg_volatility: f64,
    pub total_open_interest: i64,
    pub avg_strike: f64,
}

impl Statistics {
    /// Records that are neither calls nor puts.
    pub fn total_unknown(&self) -> usize {
        self.total_options - self.total_calls - self.total_puts
    }

    /// Calls per put. `None` when there are no puts.
    pub fn call_put_ratio(&self) -> Option<f64> {
        if self.total_puts == 0 {
            return None;
        }
        Some(self.total_calls as f64 / self.total_puts as f64)
    }

    /// Ratio for display: two decimals, or "N/A" without puts.
    pub fn call_put_ratio_label(&self) -> String {
        match self.call_put_ratio() {
            Some(ratio) => format!("{:.2}", ratio),
            None => "N/A".to_string(),
        }
    }

    /// Generate a summary report.
    pub fn summary(&self) -> String {
        format!(
            "Options: {} (Calls: {}, Puts: {})\n\
             C/P Ratio: {}\n\
             Avg IV: {:.1}%\n\
             Open Interest: {}\n\
             Avg Strike: ${:.2}",
            self.total_options,
            self.total_calls,
            self.total_puts,
            self.call_put_ratio_label(),
            self.avg_volatility,
            self.total_open_interest,
            self.avg_strike,
        )
    }
}

/// Compute statistics in a single pass.
pub fn aggregate(records: &[OptionRecord]) -> Statistics {
    if records.is_empty() {
        return Statistics::default();
    }

    let mut total_calls = 0;
    let mut total_puts = 0;
    let mut iv_sum = 0.0;
    let mut oi_sum = 0i64;
    // Exact while it fits; the float sum takes over once a Decimal would overflow.
    let mut strike_sum = Some(Decimal::ZERO);
    let mut strike_sum_f64 = 0.0;

    for record in records {
        match record.quote_type {
            OptionType::Call => total_calls += 1,
            OptionType::Put => total_puts += 1,
            OptionType::Unknown => {}
        }
        iv_sum += record.implied_volatility;
        oi_sum = oi_sum.saturating_add(record.open_interest);
        strike_sum = strike_sum.and_then(|sum| sum.checked_add(record.strike_price));
        strike_sum_f64 += record.strike_price.to_f64().unwrap_or(0.0);
    }

    let n = records.len();
    let avg_strike = match strike_sum.and_then(|sum| sum.checked_div(Decimal::from(n))) {
        Some(avg) => avg.to_f64().unwrap_or(0.0),
        None => strike_sum_f64 / n as f64,
    };

    Statistics {
        total_options: n,
        total_calls,
        total_puts,
        avg_volatility: iv_sum / n as f64,
        total_open_interest: oi_sum,
        avg_strike,
    }
}
