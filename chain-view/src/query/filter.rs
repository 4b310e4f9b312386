//! Record filtering.
//!
//! A [`FilterSpec`] is a set of independent, optional constraints. The
//! effective predicate is the conjunction of whichever constraints are set;
//! an empty spec keeps everything.
//!
//! Filter specs usually arrive from form inputs, so deserialization is
//! lenient: empty strings and nulls mean "no constraint", and values that do
//! not parse are dropped with a warning instead of failing the whole spec.

use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::data::{OptionRecord, OptionType};

/// Optional constraints over option records. All bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterSpec {
    /// Only calls or only puts. `None` keeps every type.
    #[serde(
        rename = "type",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient"
    )]
    pub quote_type: Option<OptionType>,

    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub date_min: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub date_max: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub strike_min: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub strike_max: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_finite")]
    pub volatility_min: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_finite")]
    pub volatility_max: Option<f64>,

    /// Weekly (`true`) or standard (`false`) expirations only.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient_flag")]
    pub weekly_only: Option<bool>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, quote_type: OptionType) -> Self {
        self.quote_type = match quote_type {
            OptionType::Unknown => None,
            known => Some(known),
        };
        self
    }

    pub fn with_dates(mut self, min: Option<NaiveDate>, max: Option<NaiveDate>) -> Self {
        self.date_min = min;
        self.date_max = max;
        self
    }

    pub fn with_strikes(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.strike_min = min;
        self.strike_max = max;
        self
    }

    /// Non-finite bounds are treated as unset.
    pub fn with_volatility(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.volatility_min = finite_bound(min);
        self.volatility_max = finite_bound(max);
        self
    }

    pub fn with_weekly(mut self, weekly: bool) -> Self {
        self.weekly_only = Some(weekly);
        self
    }

    /// True when no constraint is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn has_date_bound(&self) -> bool {
        self.date_min.is_some() || self.date_max.is_some()
    }

    /// Whether `record` satisfies every active constraint.
    ///
    /// A record without a parseable expiration fails any active date bound.
    pub fn matches(&self, record: &OptionRecord) -> bool {
        if let Some(quote_type) = self.quote_type {
            if record.quote_type != quote_type {
                return false;
            }
        }

        if self.has_date_bound() {
            let Some(date) = record.expiration_date else {
                return false;
            };
            if self.date_min.is_some_and(|min| date < min) {
                return false;
            }
            if self.date_max.is_some_and(|max| date > max) {
                return false;
            }
        }

        if self.strike_min.is_some_and(|min| record.strike_price < min) {
            return false;
        }
        if self.strike_max.is_some_and(|max| record.strike_price > max) {
            return false;
        }

        if self
            .volatility_min
            .is_some_and(|min| record.implied_volatility < min)
        {
            return false;
        }
        if self
            .volatility_max
            .is_some_and(|max| record.implied_volatility > max)
        {
            return false;
        }

        if let Some(weekly) = self.weekly_only {
            if record.is_weekly != weekly {
                return false;
            }
        }

        true
    }
}

/// Records satisfying `spec`, in their original relative order.
pub fn filter(records: &[OptionRecord], spec: &FilterSpec) -> Vec<OptionRecord> {
    records
        .iter()
        .filter(|record| spec.matches(record))
        .cloned()
        .collect()
}

/// Read a form value as text. Null and blank values are "unset".
fn form_text(value: Option<Value>) -> Option<String> {
    let text = match value? {
        Value::Null => return None,
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let Some(text) = form_text(Option::<Value>::deserialize(deserializer)?) else {
        return Ok(None);
    };
    match text.parse::<T>() {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!("Ignoring filter value {:?}: {}", text, e);
            Ok(None)
        }
    }
}

fn lenient_finite<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient::<D, f64>(deserializer).map(finite_bound)
}

/// NaN and infinite bounds would reject every record, so they mean "unset".
fn finite_bound(bound: Option<f64>) -> Option<f64> {
    match bound {
        Some(value) if !value.is_finite() => {
            warn!("Ignoring non-finite volatility bound {}", value);
            None
        }
        other => other,
    }
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(text) = form_text(Option::<Value>::deserialize(deserializer)?) else {
        return Ok(None);
    };
    match text.to_lowercase().as_str() {
        "1" | "true" | "yes" | "weekly" => Ok(Some(true)),
        "0" | "false" | "no" | "standard" => Ok(Some(false)),
        _ => {
            warn!("Ignoring weekly filter value {:?}", text);
            Ok(None)
        }
    }
}
