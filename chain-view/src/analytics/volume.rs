//! Strikes with the most open interest.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::data::{OptionRecord, OptionType};

/// One bar of the top-volume chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeBar {
    /// Strike rounded to a whole number, as shown on the chart.
    pub strike: Decimal,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub volume: i64,
    /// e.g. "CALL $50"
    pub label: String,
    pub date: Option<NaiveDate>,
}

impl From<&OptionRecord> for VolumeBar {
    fn from(record: &OptionRecord) -> Self {
        let strike = record
            .strike_price
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .normalize();
        Self {
            strike,
            option_type: record.quote_type,
            volume: record.open_interest,
            label: format!("{} ${}", record.quote_type.label(), strike),
            date: record.expiration_date,
        }
    }
}

/// The `limit` records with the highest open interest, highest first.
///
/// Works on a copy; ties keep input order.
pub fn top_volume_strikes(records: &[OptionRecord], limit: usize) -> Vec<VolumeBar> {
    let mut ranked: Vec<&OptionRecord> = records.iter().collect();
    ranked.sort_by(|a, b| b.open_interest.cmp(&a.open_interest));
    ranked.into_iter().take(limit).map(VolumeBar::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(quote_type: OptionType, strike: Decimal, oi: i64) -> OptionRecord {
        let mut r = OptionRecord::new(quote_type, NaiveDate::from_ymd_opt(2024, 1, 19), strike);
        r.open_interest = oi;
        r
    }

    #[test]
    fn test_ranked_and_labeled() {
        let records = vec![
            record(OptionType::Call, dec!(50), 10),
            record(OptionType::Put, dec!(17.5), 300),
            record(OptionType::Call, dec!(55.00), 200),
        ];
        let bars = top_volume_strikes(&records, 15);
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].label, "PUT $18");
        assert_eq!(bars[0].volume, 300);
        assert_eq!(bars[1].label, "CALL $55");
        assert_eq!(bars[2].strike, dec!(50));
    }

    #[test]
    fn test_limit_with_stable_ties() {
        let mut records: Vec<OptionRecord> = (0..20)
            .map(|i| record(OptionType::Call, Decimal::from(i), 5))
            .collect();
        records.push(record(OptionType::Put, dec!(100), 6));

        let bars = top_volume_strikes(&records, 15);
        assert_eq!(bars.len(), 15);
        assert_eq!(bars[0].strike, dec!(100));
        // Remaining slots go to the earliest tied records.
        let strikes: Vec<Decimal> = bars[1..].iter().map(|b| b.strike).collect();
        let expected: Vec<Decimal> = (0..14).map(Decimal::from).collect();
        assert_eq!(strikes, expected);
    }

    #[test]
    fn test_does_not_reorder_input() {
        let records = vec![
            record(OptionType::Call, dec!(50), 1),
            record(OptionType::Call, dec!(55), 2),
        ];
        let before = records.clone();
        let _ = top_volume_strikes(&records, 15);
        assert_eq!(records, before);
    }
}
