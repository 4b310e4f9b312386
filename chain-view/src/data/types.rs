//! Core data types for options chain views.
//!
//! `OptionRecord` is the canonical shape every stage works on. It is produced
//! once by the normalizer from whatever field naming the record source used,
//! and is never modified afterwards: filters, sorts and projections build new
//! collections instead.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Option type (call or put).
///
/// Records whose type field is missing or garbled are classified as
/// `Unknown` rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
    Unknown,
}

impl OptionType {
    /// Parse a call/put tag, case-insensitively. Anything else is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }

    /// Classify a raw type field, falling back to `Unknown`.
    pub fn classify(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
            Self::Unknown => "unknown",
        }
    }

    /// Upper-case tag used in chart labels.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Call => "CALL",
            Self::Put => "PUT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a call/put tag.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("not an option type: {0:?}")]
pub struct ParseOptionTypeError(pub String);

impl FromStr for OptionType {
    type Err = ParseOptionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseOptionTypeError(s.to_string()))
    }
}

/// A single quoted option contract.
///
/// Canonical fields are typed; every source field the normalizer did not
/// recognise is kept verbatim in `extra` so exports stay faithful to what the
/// source delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionRecord {
    /// Call, put, or unclassifiable.
    pub quote_type: OptionType,

    /// Expiration date. `None` when the source value could not be parsed.
    pub expiration_date: Option<NaiveDate>,

    /// Strike price
    pub strike_price: Decimal,

    /// Bid price
    pub bid_price: Decimal,

    /// Ask price (bid <= ask is not enforced)
    pub ask_price: Decimal,

    /// Open interest
    pub open_interest: i64,

    /// Implied volatility, in percent
    pub implied_volatility: f64,

    /// Weekly expiration flag
    pub is_weekly: bool,

    /// Unrecognised source fields, in source order.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OptionRecord {
    /// A record with the given type, expiration and strike and every other
    /// field at its default.
    pub fn new(quote_type: OptionType, expiration_date: Option<NaiveDate>, strike_price: Decimal) -> Self {
        Self {
            quote_type,
            expiration_date,
            strike_price,
            bid_price: Decimal::ZERO,
            ask_price: Decimal::ZERO,
            open_interest: 0,
            implied_volatility: 0.0,
            is_weekly: false,
            extra: Map::new(),
        }
    }

    pub fn is_call(&self) -> bool {
        self.quote_type == OptionType::Call
    }

    pub fn is_put(&self) -> bool {
        self.quote_type == OptionType::Put
    }

    /// Expiration formatted as `YYYY-MM-DD`, the grouping key for
    /// per-expiration projections.
    pub fn expiration_label(&self) -> Option<String> {
        self.expiration_date.map(|d| d.format("%Y-%m-%d").to_string())
    }
}

/// Quote for the underlying instrument, shown next to its chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderlyingQuote {
    pub symbol: String,
    pub last_price: Decimal,
    pub bid_price: Decimal,
    pub ask_price: Decimal,
    /// Date the quote was scraped
    pub scrape_date: Option<NaiveDate>,
    /// When the row was stored; breaks ties between scrapes of the same day.
    pub created_at: Option<DateTime<Utc>>,
}

impl UnderlyingQuote {
    pub fn spread(&self) -> Decimal {
        self.ask_price.saturating_sub(self.bid_price)
    }

    /// Ordering key for picking the most recent quote.
    pub fn recency(&self) -> (Option<NaiveDate>, Option<DateTime<Utc>>) {
        (self.scrape_date, self.created_at)
    }
}
