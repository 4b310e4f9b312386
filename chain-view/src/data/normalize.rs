//! Field reconciliation for raw option rows.
//!
//! Record sources disagree on naming (`Strike_price` vs `strike_price` vs
//! `strike`) and on representation (numbers vs numeric strings, `0/1` vs
//! booleans). This module resolves all of that once and produces canonical
//! [`OptionRecord`]s; nothing downstream looks at raw field names again.
//!
//! Normalization never fails and never drops a row. Values that cannot be
//! parsed fall back to their documented default:
//! - prices, strike, volatility, open interest: 0
//! - expiration date: absent (`None`)
//! - type: `Unknown`

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::debug;

use super::types::{OptionRecord, OptionType, UnderlyingQuote};

/// A raw row as delivered by a record source.
pub type RawRecord = Map<String, Value>;

pub const TYPE_KEYS: &[&str] = &["Quotes", "quotes", "type", "Type", "quote_type", "quoteType"];
pub const DATE_KEYS: &[&str] = &[
    "Date",
    "date",
    "expiration",
    "expiration_date",
    "expirationDate",
];
pub const STRIKE_KEYS: &[&str] = &["strikePrice", "strike_price", "Strike_price", "strike", "Strike"];
pub const BID_KEYS: &[&str] = &["bid_price", "bidPrice", "bid"];
pub const ASK_KEYS: &[&str] = &["ask_price", "askPrice", "ask"];
pub const OPEN_INTEREST_KEYS: &[&str] = &["open_interest", "openInterest", "oi"];
pub const VOLATILITY_KEYS: &[&str] = &[
    "volatility",
    "impliedVolatility",
    "implied_volatility",
    "iv",
];
pub const WEEKLY_KEYS: &[&str] = &["is_weekly", "isWeekly", "weekly"];

pub const QUOTE_SYMBOL_KEYS: &[&str] = &["symbol", "Symbol"];
pub const LAST_PRICE_KEYS: &[&str] = &["last_price", "lastPrice", "last"];
pub const SCRAPE_DATE_KEYS: &[&str] = &["scrape_date", "scrapeDate"];
pub const CREATED_AT_KEYS: &[&str] = &["created_at", "createdAt"];

/// Normalize a single raw row.
pub fn normalize(raw: &RawRecord) -> OptionRecord {
    let mut extra = raw.clone();

    let quote_type = match take_field(&mut extra, TYPE_KEYS) {
        Some(Value::String(s)) => OptionType::classify(&s),
        Some(other) => {
            debug!(value = %other, "non-string option type, classifying as unknown");
            OptionType::Unknown
        }
        None => OptionType::Unknown,
    };

    let expiration_date = match take_field(&mut extra, DATE_KEYS) {
        Some(Value::String(s)) => {
            let parsed = parse_date(&s);
            if parsed.is_none() {
                debug!(value = %s, "unparsable expiration date");
            }
            parsed
        }
        Some(other) => {
            debug!(value = %other, "non-string expiration date");
            None
        }
        None => None,
    };

    OptionRecord {
        quote_type,
        expiration_date,
        strike_price: non_negative_decimal(take_field(&mut extra, STRIKE_KEYS), "strike_price"),
        bid_price: non_negative_decimal(take_field(&mut extra, BID_KEYS), "bid_price"),
        ask_price: non_negative_decimal(take_field(&mut extra, ASK_KEYS), "ask_price"),
        open_interest: integer_or_zero(take_field(&mut extra, OPEN_INTEREST_KEYS)),
        implied_volatility: float_or_zero(take_field(&mut extra, VOLATILITY_KEYS)),
        is_weekly: take_field(&mut extra, WEEKLY_KEYS)
            .map(|v| flag(&v))
            .unwrap_or(false),
        extra,
    }
}

/// Normalize a batch of raw rows, preserving order and length.
pub fn normalize_all(raw: &[RawRecord]) -> Vec<OptionRecord> {
    raw.iter().map(normalize).collect()
}

/// Normalize an underlying quote row. Rows without a symbol are rejected;
/// every other field follows the option-row defaults.
pub fn normalize_quote(raw: &RawRecord) -> Option<UnderlyingQuote> {
    let symbol = first_field(raw, QUOTE_SYMBOL_KEYS)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())?
        .to_string();

    let text = |aliases: &[&str]| first_field(raw, aliases).and_then(Value::as_str);

    Some(UnderlyingQuote {
        symbol,
        last_price: non_negative_decimal(first_field(raw, LAST_PRICE_KEYS).cloned(), "last_price"),
        bid_price: non_negative_decimal(first_field(raw, BID_KEYS).cloned(), "bid_price"),
        ask_price: non_negative_decimal(first_field(raw, ASK_KEYS).cloned(), "ask_price"),
        scrape_date: text(SCRAPE_DATE_KEYS).and_then(parse_date),
        created_at: text(CREATED_AT_KEYS).and_then(parse_timestamp),
    })
}

fn first_field<'a>(map: &'a RawRecord, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .find_map(|key| map.get(*key).filter(|v| !v.is_null()))
}

/// Remove every alias of a canonical field from `map`, returning the value of
/// the first alias that is present and not null.
fn take_field(map: &mut RawRecord, aliases: &[&str]) -> Option<Value> {
    let mut found = None;
    for key in aliases {
        if let Some(value) = map.shift_remove(*key) {
            if found.is_none() && !value.is_null() {
                found = Some(value);
            }
        }
    }
    found
}

/// Parse an expiration date.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, RFC 3339 timestamps (the calendar date
/// in the stated offset) and naive `YYYY-MM-DD[T ]HH:MM:SS` timestamps.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%Y/%m/%d").ok()
}

/// Parse a storage timestamp. Naive timestamps are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc())
}

/// Parse a decimal from a JSON number or numeric string.
pub fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn non_negative_decimal(value: Option<Value>, field: &'static str) -> Decimal {
    let Some(value) = value else {
        return Decimal::ZERO;
    };
    match parse_decimal(&value) {
        Some(d) if d >= Decimal::ZERO => d,
        Some(d) => {
            debug!(field, value = %d, "negative value, substituting 0");
            Decimal::ZERO
        }
        None => {
            debug!(field, value = %value, "malformed decimal, substituting 0");
            Decimal::ZERO
        }
    }
}

fn float_or_zero(value: Option<Value>) -> f64 {
    let Some(value) = value else {
        return 0.0;
    };
    let parsed = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => v,
        _ => {
            debug!(field = "implied_volatility", value = %value, "malformed number, substituting 0");
            0.0
        }
    }
}

fn integer_or_zero(value: Option<Value>) -> i64 {
    let Some(value) = value else {
        return 0;
    };
    let parsed = match &value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    };
    match parsed {
        Some(v) if v >= 0 => v,
        _ => {
            debug!(field = "open_interest", value = %value, "malformed integer, substituting 0");
            0
        }
    }
}

/// Interpret a weekly flag: booleans, non-zero numbers, and the strings
/// "1"/"true"/"yes".
fn flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "y"
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_postgres_shaped_row() {
        let row = raw(json!({
            "id": "BTCQ 240119C50",
            "createdAt": "2024-01-02T10:00:00.000Z",
            "Quotes": "Call",
            "Symbol": "BTCQ 240119C50",
            "Date": "2024-01-19T00:00:00.000Z",
            "Strike_price": "50.00",
            "bid_price": 1.2,
            "ask_price": "1.35",
            "open_interest": "1200",
            "is_weekly": 1,
            "volatility": "21.5",
            "nb_trades": 14
        }));

        let record = normalize(&row);
        assert_eq!(record.quote_type, OptionType::Call);
        assert_eq!(record.expiration_date, NaiveDate::from_ymd_opt(2024, 1, 19));
        assert_eq!(record.strike_price, dec!(50.00));
        assert_eq!(record.bid_price, dec!(1.2));
        assert_eq!(record.ask_price, dec!(1.35));
        assert_eq!(record.open_interest, 1200);
        assert!(record.is_weekly);
        assert_eq!(record.implied_volatility, 21.5);

        // Canonical fields are consumed, everything else passes through in order.
        let keys: Vec<&str> = record.extra.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["id", "createdAt", "Symbol", "nb_trades"]);
    }

    #[test]
    fn test_alternate_naming() {
        let row = raw(json!({
            "type": "PUT",
            "expiration": "2024/03/15",
            "strike": 17.5,
            "bid": 0.4,
            "ask": 0.45,
            "openInterest": 30,
            "iv": 44.0,
            "isWeekly": true
        }));

        let record = normalize(&row);
        assert_eq!(record.quote_type, OptionType::Put);
        assert_eq!(record.expiration_date, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(record.strike_price, dec!(17.5));
        assert_eq!(record.open_interest, 30);
        assert!(record.is_weekly);
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_first_alias_wins_and_all_aliases_are_consumed() {
        let row = raw(json!({
            "strike": "55",
            "strike_price": "50",
            "Quotes": "call"
        }));
        let record = normalize(&row);
        assert_eq!(record.strike_price, dec!(50));
        assert!(!record.extra.contains_key("strike"));
    }

    #[test]
    fn test_malformed_fields_default() {
        let row = raw(json!({
            "Quotes": "??",
            "Date": "not a date",
            "Strike_price": "abc",
            "bid_price": -1,
            "open_interest": "n/a",
            "volatility": null,
            "is_weekly": "0"
        }));

        let record = normalize(&row);
        assert_eq!(record.quote_type, OptionType::Unknown);
        assert_eq!(record.expiration_date, None);
        assert_eq!(record.strike_price, Decimal::ZERO);
        assert_eq!(record.bid_price, Decimal::ZERO);
        assert_eq!(record.open_interest, 0);
        assert_eq!(record.implied_volatility, 0.0);
        assert!(!record.is_weekly);
    }

    #[test]
    fn test_empty_row_is_kept() {
        let rows = vec![RawRecord::new(), raw(json!({"Quotes": "put"}))];
        let records = normalize_all(&rows);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].quote_type, OptionType::Unknown);
        assert_eq!(records[1].quote_type, OptionType::Put);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 19);
        assert_eq!(parse_date("2024-01-19"), expected);
        assert_eq!(parse_date(" 2024-01-19 "), expected);
        assert_eq!(parse_date("2024-01-19T00:00:00Z"), expected);
        assert_eq!(parse_date("2024-01-19T23:30:00-05:00"), expected);
        assert_eq!(parse_date("2024-01-19 16:00:00"), expected);
        assert_eq!(parse_date("2024/01/19"), expected);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("19/01/2024"), None);
    }

    #[test]
    fn test_pass_through_keeps_source_order() {
        let row = raw(json!({
            "underlying": "BN",
            "Quotes": "put",
            "last_trade": "2024-01-02",
            "Strike_price": "28",
            "exchange": "TSX",
            "bid_price": "0.5",
            "nb_trades": 3,
            "volatility": 30
        }));

        let keys: Vec<String> = normalize(&row).extra.keys().cloned().collect();
        assert_eq!(keys, vec!["underlying", "last_trade", "exchange", "nb_trades"]);
    }

    #[test]
    fn test_quote_row() {
        let row = raw(json!({
            "symbol": " BN ",
            "last_price": "30.40",
            "bidPrice": 30.35,
            "ask_price": "-1",
            "scrape_date": "2024-01-03",
            "created_at": "2024-01-03 14:00:00"
        }));

        let quote = normalize_quote(&row).unwrap();
        assert_eq!(quote.symbol, "BN");
        assert_eq!(quote.last_price, dec!(30.40));
        assert_eq!(quote.bid_price, dec!(30.35));
        assert_eq!(quote.ask_price, Decimal::ZERO);
        assert_eq!(quote.scrape_date, NaiveDate::from_ymd_opt(2024, 1, 3));
        assert_eq!(
            quote.created_at.map(|t| t.to_rfc3339()),
            Some("2024-01-03T14:00:00+00:00".to_string())
        );

        assert!(normalize_quote(&raw(json!({"last_price": 1}))).is_none());
    }

    #[test]
    fn test_fractional_open_interest_truncates() {
        let row = raw(json!({"open_interest": "12.9"}));
        assert_eq!(normalize(&row).open_interest, 12);
    }
}
