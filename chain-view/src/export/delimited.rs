//! Delimited-text (CSV) export.
//!
//! Columns are the canonical record fields followed by every pass-through
//! field seen in the collection, in first-seen order, minus bookkeeping
//! columns (row ids and timestamps a database adds). Quoting follows standard
//! CSV rules: fields containing the delimiter, a quote or a newline are
//! quoted with internal quotes doubled.

use std::collections::HashSet;

use serde_json::Value;

use super::ExportError;
use crate::data::OptionRecord;

pub const CANONICAL_COLUMNS: &[&str] = &[
    "quote_type",
    "expiration_date",
    "strike_price",
    "bid_price",
    "ask_price",
    "open_interest",
    "implied_volatility",
    "is_weekly",
];

/// Identity and timestamp columns left out of exports by default.
pub const BOOKKEEPING_COLUMNS: &[&str] = &["id", "createdAt", "updatedAt", "created_at", "updated_at"];

/// Header for `records`: canonical columns, then pass-through keys in
/// first-seen order, skipping anything listed in `bookkeeping`.
pub fn export_columns<S: AsRef<str>>(records: &[OptionRecord], bookkeeping: &[S]) -> Vec<String> {
    let skip: HashSet<&str> = bookkeeping.iter().map(|c| c.as_ref()).collect();
    let mut seen: HashSet<&str> = CANONICAL_COLUMNS.iter().copied().collect();
    let mut columns: Vec<String> = CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect();

    for record in records {
        for key in record.extra.keys() {
            if !skip.contains(key.as_str()) && seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn canonical_cell(record: &OptionRecord, column: &str) -> Option<String> {
    let cell = match column {
        "quote_type" => record.quote_type.as_str().to_string(),
        "expiration_date" => record.expiration_label().unwrap_or_default(),
        "strike_price" => record.strike_price.to_string(),
        "bid_price" => record.bid_price.to_string(),
        "ask_price" => record.ask_price.to_string(),
        "open_interest" => record.open_interest.to_string(),
        "implied_volatility" => record.implied_volatility.to_string(),
        "is_weekly" => record.is_weekly.to_string(),
        _ => return None,
    };
    Some(cell)
}

/// Text of a pass-through value. Nested values are written as compact JSON.
fn extra_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Render `records`, in the given order, as CSV with a header row.
pub fn to_csv<S: AsRef<str>>(records: &[OptionRecord], bookkeeping: &[S]) -> Result<String, ExportError> {
    let columns = export_columns(records, bookkeeping);
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(&columns)?;
    for record in records {
        let row = columns.iter().map(|column| {
            canonical_cell(record, column).unwrap_or_else(|| extra_cell(record.extra.get(column)))
        });
        writer.write_record(row)?;
    }
    writer.flush()?;

    let bytes = writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}
