//! Record sources.
//!
//! The derivation pipeline treats raw rows as an already-resolved input.
//! Sources are the boundary where fetching can fail; a failure is reported to
//! the caller and never touches data already loaded elsewhere.
//!
//! `JsonFileSource` reads a directory of JSON exports. Each file holds either
//! a bare array of row objects or an `{"data": [...]}` envelope, the shape the
//! options API and the bulk export both produce. Underlying quotes live in
//! the same shape under a `quotes/` subdirectory.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use super::normalize::{self, RawRecord};
use super::types::{OptionRecord, UnderlyingQuote};

/// Raw field names that carry the contract symbol.
pub const SYMBOL_KEYS: &[&str] = &["Symbol", "symbol"];

/// Subdirectory of the data directory holding underlying quotes.
pub const QUOTES_DIR: &str = "quotes";

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Data directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Missing symbol")]
    MissingSymbol,
}

/// Anything that can hand out raw option rows.
pub trait RecordSource {
    /// Distinct underlying codes, ascending.
    fn symbols(&self) -> Result<Vec<String>, SourceError>;

    /// Rows whose contract belongs to `symbol`, ordered by expiration then
    /// strike.
    fn fetch_symbol(&self, symbol: &str) -> Result<Vec<RawRecord>, SourceError>;

    /// Every row the source currently holds, unfiltered.
    fn fetch_all(&self) -> Result<Vec<RawRecord>, SourceError>;

    /// Rows stored on `day`, ordered by contract symbol, expiration and
    /// strike. This is the bulk export feed.
    fn fetch_day(&self, day: NaiveDate) -> Result<Vec<RawRecord>, SourceError> {
        let mut rows: Vec<RawRecord> = self
            .fetch_all()?
            .into_iter()
            .filter(|row| created_on(row) == Some(day))
            .collect();

        rows.sort_by_cached_key(|row| {
            let record = normalize::normalize(row);
            (
                contract_symbol(row).unwrap_or_default().to_string(),
                record.expiration_date,
                record.strike_price,
            )
        });

        info!("Loaded {} rows stored on {}", rows.len(), day);
        Ok(rows)
    }

    /// Most recent quote for the underlying `symbol`, if the source has one.
    fn latest_quote(&self, _symbol: &str) -> Result<Option<UnderlyingQuote>, SourceError> {
        Ok(None)
    }
}

/// Underlying code of a contract symbol: the text before the first space
/// (`"BTCQ 251017C17.50"` -> `"BTCQ"`).
pub fn symbol_code(contract: &str) -> &str {
    let contract = contract.trim_start();
    contract.split(' ').next().unwrap_or(contract)
}

/// Whether `contract` is a contract on the underlying `code`.
///
/// Requires the code to be followed by a space, so `BN` does not match
/// `BNS 251017C17.50`.
pub fn matches_underlying(contract: &str, code: &str) -> bool {
    contract
        .trim_start()
        .strip_prefix(code)
        .is_some_and(|rest| rest.starts_with(' '))
}

/// Contract symbol of a raw row, if it has one.
pub fn contract_symbol(raw: &RawRecord) -> Option<&str> {
    SYMBOL_KEYS
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_str))
}

/// Calendar date the row was stored, from its `created_at` timestamp.
pub fn created_on(raw: &RawRecord) -> Option<NaiveDate> {
    normalize::CREATED_AT_KEYS
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_str))
        .and_then(normalize::parse_date)
}

/// Keep records expiring in `[today, today + days]`.
///
/// A horizon past the last representable date keeps everything from today on.
pub fn expiring_within(records: &[OptionRecord], today: NaiveDate, days: i64) -> Vec<OptionRecord> {
    let horizon = Duration::try_days(days)
        .and_then(|span| today.checked_add_signed(span))
        .unwrap_or(NaiveDate::MAX);
    records
        .iter()
        .filter(|r| matches!(r.expiration_date, Some(d) if d >= today && d <= horizon))
        .cloned()
        .collect()
}

/// Directory of JSON row files.
pub struct JsonFileSource {
    data_dir: PathBuf,
}

impl JsonFileSource {
    /// Create a source reading `*.json` files from `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// List the JSON files in the data directory, sorted by name.
    pub fn files(&self) -> Result<Vec<PathBuf>, SourceError> {
        json_files(&self.data_dir)
    }

    /// List the JSON files of the quotes subdirectory. Empty when there is
    /// no such directory.
    pub fn quote_files(&self) -> Result<Vec<PathBuf>, SourceError> {
        let dir = self.data_dir.join(QUOTES_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        json_files(&dir)
    }

    /// Load the rows of one file.
    pub fn load_file(&self, path: &Path) -> Result<Vec<RawRecord>, SourceError> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content).map_err(|source| SourceError::Json {
            path: path.display().to_string(),
            source,
        })?;

        let rows = match value {
            Value::Array(rows) => rows,
            Value::Object(mut envelope) => match envelope.shift_remove("data") {
                Some(Value::Array(rows)) => rows,
                _ => {
                    return Err(SourceError::InvalidData(format!(
                        "{}: expected an array or a {{\"data\": [...]}} envelope",
                        path.display()
                    )))
                }
            },
            _ => {
                return Err(SourceError::InvalidData(format!(
                    "{}: expected an array of rows",
                    path.display()
                )))
            }
        };

        let total = rows.len();
        let records: Vec<RawRecord> = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        if records.len() < total {
            warn!(
                "{}: skipped {} non-object rows",
                path.display(),
                total - records.len()
            );
        }
        Ok(records)
    }
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    if !dir.is_dir() {
        return Err(SourceError::DirectoryNotFound(dir.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

impl RecordSource for JsonFileSource {
    fn symbols(&self) -> Result<Vec<String>, SourceError> {
        let codes: BTreeSet<String> = self
            .fetch_all()?
            .iter()
            .filter_map(contract_symbol)
            .map(symbol_code)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect();
        Ok(codes.into_iter().collect())
    }

    fn fetch_symbol(&self, symbol: &str) -> Result<Vec<RawRecord>, SourceError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(SourceError::MissingSymbol);
        }

        let mut rows: Vec<RawRecord> = self
            .fetch_all()?
            .into_iter()
            .filter(|row| contract_symbol(row).is_some_and(|c| matches_underlying(c, symbol)))
            .collect();

        rows.sort_by_cached_key(|row| {
            let record = normalize::normalize(row);
            (record.expiration_date, record.strike_price)
        });

        info!("Loaded {} rows for {}", rows.len(), symbol);
        Ok(rows)
    }

    fn fetch_all(&self) -> Result<Vec<RawRecord>, SourceError> {
        let mut rows = Vec::new();
        for path in self.files()? {
            rows.extend(self.load_file(&path)?);
        }
        Ok(rows)
    }

    fn latest_quote(&self, symbol: &str) -> Result<Option<UnderlyingQuote>, SourceError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(SourceError::MissingSymbol);
        }

        let mut latest: Option<UnderlyingQuote> = None;
        for path in self.quote_files()? {
            for row in self.load_file(&path)? {
                let Some(quote) = normalize::normalize_quote(&row) else {
                    continue;
                };
                if quote.symbol != symbol {
                    continue;
                }
                if latest.as_ref().map_or(true, |best| quote.recency() > best.recency()) {
                    latest = Some(quote);
                }
            }
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, name: &str, value: Value) {
        fs::write(dir.join(name), serde_json::to_string(&value).unwrap()).unwrap();
    }

    #[test]
    fn test_symbol_code() {
        assert_eq!(symbol_code("BTCQ 251017C17.50"), "BTCQ");
        assert_eq!(symbol_code("BTCQ"), "BTCQ");
        assert_eq!(symbol_code(""), "");
    }

    #[test]
    fn test_matches_underlying_requires_separator() {
        assert!(matches_underlying("BN 251017C17.50", "BN"));
        assert!(!matches_underlying("BNS 251017C17.50", "BN"));
        assert!(!matches_underlying("BN", "BN"));
    }

    #[test]
    fn test_missing_directory() {
        let source = JsonFileSource::new("/definitely/not/here");
        assert!(matches!(
            source.fetch_all(),
            Err(SourceError::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn test_fetch_symbol_filters_and_orders() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a.json",
            json!([
                {"Symbol": "BN 240216C30", "Quotes": "call", "Date": "2024-02-16", "Strike_price": "30"},
                {"Symbol": "BNS 240119C60", "Quotes": "call", "Date": "2024-01-19", "Strike_price": "60"},
                {"Symbol": "BN 240119P28", "Quotes": "put", "Date": "2024-01-19", "Strike_price": "28"}
            ]),
        );
        write(
            dir.path(),
            "b.json",
            json!({"data": [
                {"Symbol": "BN 240119C26", "Quotes": "call", "Date": "2024-01-19", "Strike_price": "26"},
                42
            ]}),
        );

        let source = JsonFileSource::new(dir.path());
        assert_eq!(source.symbols().unwrap(), vec!["BN", "BNS"]);

        let rows = source.fetch_symbol("BN").unwrap();
        let symbols: Vec<&str> = rows.iter().filter_map(contract_symbol).collect();
        assert_eq!(
            symbols,
            vec!["BN 240119C26", "BN 240119P28", "BN 240216C30"]
        );

        assert_eq!(source.fetch_all().unwrap().len(), 4);
        assert!(matches!(
            source.fetch_symbol("  "),
            Err(SourceError::MissingSymbol)
        ));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let source = JsonFileSource::new(dir.path());
        assert!(matches!(source.fetch_all(), Err(SourceError::Json { .. })));
    }

    #[test]
    fn test_expiring_within() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let records: Vec<OptionRecord> = [
            NaiveDate::from_ymd_opt(2024, 1, 9),
            NaiveDate::from_ymd_opt(2024, 1, 10),
            NaiveDate::from_ymd_opt(2024, 4, 9),
            NaiveDate::from_ymd_opt(2024, 4, 10),
            None,
        ]
        .into_iter()
        .map(|d| {
            OptionRecord::new(
                crate::data::OptionType::Call,
                d,
                rust_decimal::Decimal::ONE,
            )
        })
        .collect();

        let kept = expiring_within(&records, today, 90);
        let dates: Vec<_> = kept.iter().map(|r| r.expiration_date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 10),
                NaiveDate::from_ymd_opt(2024, 4, 9)
            ]
        );
    }

    #[test]
    fn test_expiring_within_huge_horizon() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let records = vec![
            OptionRecord::new(
                crate::data::OptionType::Call,
                NaiveDate::from_ymd_opt(2024, 1, 9),
                rust_decimal::Decimal::ONE,
            ),
            OptionRecord::new(
                crate::data::OptionType::Put,
                NaiveDate::from_ymd_opt(2200, 6, 1),
                rust_decimal::Decimal::ONE,
            ),
        ];

        for days in [9_223_372_036_854_775, i64::MAX] {
            let kept = expiring_within(&records, today, days);
            assert_eq!(kept.len(), 1);
            assert_eq!(kept[0].expiration_date, NaiveDate::from_ymd_opt(2200, 6, 1));
        }
        assert!(expiring_within(&records, today, i64::MIN).is_empty());
    }

    #[test]
    fn test_fetch_day_keeps_one_day_in_export_order() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "rows.json",
            json!([
                {"Symbol": "BN 240119C30", "Date": "2024-01-19", "Strike_price": "30", "createdAt": "2024-01-02T15:00:00.000Z"},
                {"Symbol": "AB 240216C12", "Date": "2024-02-16", "Strike_price": "12", "created_at": "2024-01-02T09:00:00Z"},
                {"Symbol": "BN 240119C28", "Date": "2024-01-19", "Strike_price": "28", "createdAt": "2024-01-01T23:59:00.000Z"},
                {"Symbol": "AB 240119C14", "Date": "2024-01-19", "Strike_price": "14", "created_at": "2024-01-02"},
                {"Symbol": "BN 240119C26", "Date": "2024-01-19", "Strike_price": "26"}
            ]),
        );

        let source = JsonFileSource::new(dir.path());
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let rows = source.fetch_day(day).unwrap();
        let symbols: Vec<&str> = rows.iter().filter_map(contract_symbol).collect();
        assert_eq!(symbols, vec!["AB 240119C14", "AB 240216C12", "BN 240119C30"]);

        let empty = source
            .fetch_day(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap())
            .unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_latest_quote_prefers_newest_scrape() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(QUOTES_DIR)).unwrap();
        write(
            &dir.path().join(QUOTES_DIR),
            "underlying.json",
            json!([
                {"symbol": "BN", "last_price": "30.10", "bid_price": "30.05", "ask_price": "30.15",
                 "scrape_date": "2024-01-02", "created_at": "2024-01-02T21:00:00Z"},
                {"symbol": "BN", "last_price": "30.40", "bid_price": "30.35", "ask_price": "30.50",
                 "scrape_date": "2024-01-03", "created_at": "2024-01-03T14:00:00Z"},
                {"symbol": "BN", "last_price": "30.60", "bid_price": "30.55", "ask_price": "30.65",
                 "scrape_date": "2024-01-03", "created_at": "2024-01-03T20:00:00Z"},
                {"symbol": "BNS", "last_price": "99", "bid_price": "98", "ask_price": "100",
                 "scrape_date": "2024-02-01"},
                {"last_price": "1"}
            ]),
        );

        let source = JsonFileSource::new(dir.path());
        let quote = source.latest_quote("BN").unwrap().unwrap();
        assert_eq!(quote.last_price, rust_decimal::Decimal::new(3060, 2));
        assert_eq!(quote.spread(), rust_decimal::Decimal::new(10, 2));
        assert_eq!(quote.scrape_date, NaiveDate::from_ymd_opt(2024, 1, 3));

        assert!(source.latest_quote("XYZ").unwrap().is_none());
        assert!(matches!(source.latest_quote(""), Err(SourceError::MissingSymbol)));
    }

    #[test]
    fn test_latest_quote_without_quotes_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonFileSource::new(dir.path());
        assert!(source.latest_quote("BN").unwrap().is_none());
    }
}
