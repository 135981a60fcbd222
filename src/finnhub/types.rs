use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::quote::{PriceLevels, Quote};

/// Fields of a Finnhub `/quote` payload that we use.
///
/// Each field is `None` when absent, `null`, or not a JSON number.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawQuote {
    pub current: Option<f64>,
    pub previous_close: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub change_percent: Option<f64>,
    pub volume: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum RawQuoteError {
    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl RawQuote {
    pub fn parse(body: &str) -> Result<Self, RawQuoteError> {
        let root: Value = serde_json::from_str(body)?;
        if !root.is_object() {
            return Err(RawQuoteError::NotAnObject(json_kind(&root)));
        }
        let num = |key: &str| root.get(key).and_then(Value::as_f64);
        Ok(Self {
            current: num("c"),
            previous_close: num("pc"),
            high: num("h"),
            low: num("l"),
            change_percent: num("dp"),
            volume: num("v"),
        })
    }

    pub fn into_quote(self, symbol: impl Into<String>, fetched_at: DateTime<Utc>) -> Quote {
        let prices = PriceLevels {
            current: self.current.unwrap_or(0.0),
            previous_close: self.previous_close.unwrap_or(0.0),
            day_high: self.high.unwrap_or(0.0),
            day_low: self.low.unwrap_or(0.0),
        };
        Quote::new(
            symbol,
            prices,
            self.change_percent,
            self.volume,
            fetched_at,
        )
    }
}
