//! Volatility smile: implied volatility against strike, per side.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{OptionRecord, OptionType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmilePoint {
    pub strike: Decimal,
    pub iv: f64,
    pub bid: Decimal,
    pub ask: Decimal,
    pub open_interest: i64,
    pub date: Option<NaiveDate>,
}

impl From<&OptionRecord> for SmilePoint {
    fn from(record: &OptionRecord) -> Self {
        Self {
            strike: record.strike_price,
            iv: record.implied_volatility,
            bid: record.bid_price,
            ask: record.ask_price,
            open_interest: record.open_interest,
            date: record.expiration_date,
        }
    }
}

/// Two parallel series, each ascending by strike.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySmile {
    pub calls: Vec<SmilePoint>,
    pub puts: Vec<SmilePoint>,
}

impl VolatilitySmile {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }
}

fn side(records: &[OptionRecord], quote_type: OptionType) -> Vec<SmilePoint> {
    let mut points: Vec<SmilePoint> = records
        .iter()
        .filter(|r| r.quote_type == quote_type)
        .map(SmilePoint::from)
        .collect();
    points.sort_by(|a, b| a.strike.cmp(&b.strike));
    points
}

/// Split by type and order each side by strike. Equal strikes (different
/// expirations) keep their input order.
pub fn volatility_smile(records: &[OptionRecord]) -> VolatilitySmile {
    VolatilitySmile {
        calls: side(records, OptionType::Call),
        puts: side(records, OptionType::Put),
    }
}
