//! Request payload for the external text-generation service, and cleanup of
//! its reply.
//!
//! The service call itself lives outside this crate. This module only
//! reduces a record set to the summary the service expects and strips code
//! fences the service may wrap its markdown in.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{OptionRecord, OptionType};

/// Reduced view of one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRow {
    #[serde(rename = "type")]
    pub quote_type: OptionType,
    pub date: Option<NaiveDate>,
    pub strike: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub volatility: f64,
    pub open_interest: i64,
    /// "Weekly" or "Standard".
    pub is_weekly: String,
}

impl From<&OptionRecord> for AnalysisRow {
    fn from(record: &OptionRecord) -> Self {
        Self {
            quote_type: record.quote_type,
            date: record.expiration_date,
            strike: record.strike_price,
            bid: record.bid_price,
            ask: record.ask_price,
            volatility: record.implied_volatility,
            open_interest: record.open_interest,
            is_weekly: if record.is_weekly { "Weekly" } else { "Standard" }.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub symbol: String,
    pub total: usize,
    pub data: Vec<AnalysisRow>,
}

impl AnalysisRequest {
    pub fn from_records(symbol: &str, records: &[OptionRecord]) -> Self {
        Self {
            symbol: symbol.to_string(),
            total: records.len(),
            data: records.iter().map(AnalysisRow::from).collect(),
        }
    }
}

/// Remove ```` ```markdown ```` and ```` ``` ```` fence markers (each with
/// its following newline, if any) and trim surrounding whitespace.
pub fn clean_markdown(text: &str) -> String {
    let mut cleaned = text.to_string();
    for fence in ["```markdown", "```"] {
        cleaned = cleaned.replace(&format!("{}\n", fence), "").replace(fence, "");
    }
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_request_rows() {
        let mut weekly = OptionRecord::new(OptionType::Put, NaiveDate::from_ymd_opt(2024, 1, 12), dec!(45));
        weekly.is_weekly = true;
        weekly.open_interest = 12;
        let request = AnalysisRequest::from_records("BN", &[weekly]);

        assert_eq!(request.total, 1);
        let json = serde_json::to_value(&request.data[0]).unwrap();
        assert_eq!(json["type"], "put");
        assert_eq!(json["date"], "2024-01-12");
        assert_eq!(json["openInterest"], 12);
        assert_eq!(json["isWeekly"], "Weekly");
        assert_eq!(json, json!({
            "type": "put",
            "date": "2024-01-12",
            "strike": "45",
            "bid": "0",
            "ask": "0",
            "volatility": 0.0,
            "openInterest": 12,
            "isWeekly": "Weekly"
        }));
    }

    #[test]
    fn test_clean_markdown() {
        assert_eq!(clean_markdown("```markdown\n## Title\n\nBody\n```\n"), "## Title\n\nBody");
        assert_eq!(clean_markdown("  plain text  "), "plain text");
        assert_eq!(clean_markdown("```\ncode```"), "code");
    }
}
