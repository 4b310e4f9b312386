//! Structured JSON exports.
//!
//! A [`ViewExport`] is a replayable record of what was on screen: the
//! symbol, when it was exported, the active filter and sort, the resulting
//! rows, and the statistics computed from them. A [`BulkExport`] wraps an
//! unfiltered record set as delivered by the source.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ExportError;
use crate::data::{OptionRecord, RawRecord};
use crate::metrics::Statistics;
use crate::query::{FilterSpec, SortSpec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewExport {
    pub symbol: String,
    pub export_date: DateTime<Utc>,
    pub filters: FilterSpec,
    pub sort: SortSpec,
    /// Filtered and sorted rows.
    pub data: Vec<OptionRecord>,
    pub statistics: Statistics,
}

impl ViewExport {
    pub fn to_json_pretty(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn file_name(&self) -> String {
        view_file_name(&self.symbol, self.export_date.date_naive())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkExport {
    pub export_date: DateTime<Utc>,
    pub total_records: usize,
    pub data: Vec<RawRecord>,
}

impl BulkExport {
    pub fn new(export_date: DateTime<Utc>, data: Vec<RawRecord>) -> Self {
        Self {
            export_date,
            total_records: data.len(),
            data,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn file_name(&self) -> String {
        bulk_file_name(self.export_date.date_naive())
    }
}

/// `options_{SYMBOL}_{YYYY-MM-DD}.csv`
pub fn csv_file_name(symbol: &str, date: NaiveDate) -> String {
    format!("options_{}_{}.csv", symbol, date.format("%Y-%m-%d"))
}

/// `{SYMBOL}_current_view_{YYYY-MM-DD}.json`
pub fn view_file_name(symbol: &str, date: NaiveDate) -> String {
    format!("{}_current_view_{}.json", symbol, date.format("%Y-%m-%d"))
}

/// `all_options_{YYYY-MM-DD}.json`
pub fn bulk_file_name(date: NaiveDate) -> String {
    format!("all_options_{}.json", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OptionType;
    use crate::metrics::aggregate;
    use crate::query::SortField;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};

    fn exported_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 15, 30, 0).unwrap()
    }

    fn view() -> ViewExport {
        let mut record = OptionRecord::new(OptionType::Put, NaiveDate::from_ymd_opt(2024, 1, 19), dec!(50));
        record.implied_volatility = 25.0;
        record.extra.insert("Symbol".into(), json!("BN 240119P50"));
        let data = vec![record];
        ViewExport {
            symbol: "BN".to_string(),
            export_date: exported_at(),
            filters: FilterSpec::new().with_type(OptionType::Put),
            sort: SortSpec::descending(SortField::StrikePrice),
            statistics: aggregate(&data),
            data,
        }
    }

    #[test]
    fn test_view_export_shape() {
        let json: Value = serde_json::from_str(&view().to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["symbol"], "BN");
        assert_eq!(json["exportDate"], "2024-01-10T15:30:00Z");
        assert_eq!(json["filters"], json!({"type": "put"}));
        assert_eq!(json["sort"], json!({"field": "strikePrice", "direction": "desc"}));
        assert_eq!(json["statistics"]["totalPuts"], 1);
        assert_eq!(json["data"][0]["Symbol"], "BN 240119P50");
        assert_eq!(json["data"][0]["expiration_date"], "2024-01-19");
    }

    #[test]
    fn test_view_export_replays() {
        let original = view();
        let back = ViewExport::from_json(&original.to_json_pretty().unwrap()).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_bulk_export() {
        let mut row = RawRecord::new();
        row.insert("Symbol".into(), json!("BN 240119P50"));
        let bulk = BulkExport::new(exported_at(), vec![row.clone(), row]);
        assert_eq!(bulk.total_records, 2);

        let json: Value = serde_json::from_str(&bulk.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["totalRecords"], 2);
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_file_names() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(csv_file_name("BN", date), "options_BN_2024-01-10.csv");
        assert_eq!(view().file_name(), "BN_current_view_2024-01-10.json");
        assert_eq!(bulk_file_name(date), "all_options_2024-01-10.json");
    }
}
