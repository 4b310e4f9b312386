//! Record sorting.
//!
//! Sorting is stable: records with equal keys keep their relative order, so
//! sorting an already-sorted collection again changes nothing.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::OptionRecord;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseSortFieldError {
    #[error("unknown sort field: {0}")]
    Unknown(String),
}

/// Column to sort on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    ExpirationDate,
    StrikePrice,
    ImpliedVolatility,
    OpenInterest,
    BidPrice,
    AskPrice,
}

impl SortField {
    pub const ALL: [SortField; 6] = [
        SortField::ExpirationDate,
        SortField::StrikePrice,
        SortField::ImpliedVolatility,
        SortField::OpenInterest,
        SortField::BidPrice,
        SortField::AskPrice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExpirationDate => "expirationDate",
            Self::StrikePrice => "strikePrice",
            Self::ImpliedVolatility => "impliedVolatility",
            Self::OpenInterest => "openInterest",
            Self::BidPrice => "bidPrice",
            Self::AskPrice => "askPrice",
        }
    }

    /// Ascending comparison of two records on this field.
    ///
    /// Records without an expiration sort before every dated record. Volatility
    /// uses the IEEE total order, so a NaN sorts after every number.
    pub fn compare(&self, a: &OptionRecord, b: &OptionRecord) -> Ordering {
        match self {
            Self::ExpirationDate => a.expiration_date.cmp(&b.expiration_date),
            Self::StrikePrice => a.strike_price.cmp(&b.strike_price),
            Self::ImpliedVolatility => a.implied_volatility.total_cmp(&b.implied_volatility),
            Self::OpenInterest => a.open_interest.cmp(&b.open_interest),
            Self::BidPrice => a.bid_price.cmp(&b.bid_price),
            Self::AskPrice => a.ask_price.cmp(&b.ask_price),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortField {
    type Err = ParseSortFieldError;

    /// Accepts canonical names as well as the column names sources use.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "date" | "expiration" | "expirationdate" => Ok(Self::ExpirationDate),
            "strike" | "strikeprice" => Ok(Self::StrikePrice),
            "iv" | "volatility" | "impliedvolatility" => Ok(Self::ImpliedVolatility),
            "oi" | "openinterest" => Ok(Self::OpenInterest),
            "bid" | "bidprice" => Ok(Self::BidPrice),
            "ask" | "askprice" => Ok(Self::AskPrice),
            _ => Err(ParseSortFieldError::Unknown(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

/// Field and direction. Defaults to expiration date, ascending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }

    /// Column-header click: the same field flips direction, a different field
    /// starts ascending.
    pub fn toggled(self, field: SortField) -> Self {
        if self.field == field {
            Self {
                field,
                direction: self.direction.flipped(),
            }
        } else {
            Self::ascending(field)
        }
    }

    pub fn compare(&self, a: &OptionRecord, b: &OptionRecord) -> Ordering {
        self.direction.apply(self.field.compare(a, b))
    }
}

/// A sorted copy of `records`. The input is left untouched.
pub fn sort(records: &[OptionRecord], spec: &SortSpec) -> Vec<OptionRecord> {
    let mut sorted = records.to_vec();
    // `sort_by` is stable, which keeps repeated sorts idempotent.
    sorted.sort_by(|a, b| spec.compare(a, b));
    sorted
}
