use std::fmt;

use chrono::{DateTime, Utc};

use crate::metrics::classify_status;

/// Volume reported for a quote whose upstream payload carried no volume.
pub const UNKNOWN_VOLUME: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteStatus {
    Invalid,
    StrongBuy,
    Bullish,
    Positive,
    Neutral,
    Watch,
    Bearish,
    Avoid,
}

impl QuoteStatus {
    pub const ALL: [QuoteStatus; 8] = [
        QuoteStatus::Invalid,
        QuoteStatus::StrongBuy,
        QuoteStatus::Bullish,
        QuoteStatus::Positive,
        QuoteStatus::Neutral,
        QuoteStatus::Watch,
        QuoteStatus::Bearish,
        QuoteStatus::Avoid,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Invalid => "INVALID",
            Self::StrongBuy => "STRONG BUY",
            Self::Bullish => "BULLISH",
            Self::Positive => "POSITIVE",
            Self::Neutral => "NEUTRAL",
            Self::Watch => "WATCH",
            Self::Bearish => "BEARISH",
            Self::Avoid => "AVOID",
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "LOW RISK",
            Self::Medium => "MEDIUM RISK",
            Self::High => "HIGH RISK",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw price levels as reported upstream. Missing fields are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceLevels {
    pub current: f64,
    pub previous_close: f64,
    pub day_high: f64,
    pub day_low: f64,
}

/// One symbol's state as of a single fetch.
///
/// Built once per cycle and never mutated afterwards, so the derived
/// `change_percent` and `status` can never drift from the prices they were
/// computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    symbol: String,
    prices: PriceLevels,
    change_percent: f64,
    volume: Option<f64>,
    status: QuoteStatus,
    last_update: DateTime<Utc>,
}

impl Quote {
    /// `change_percent` falls back to [`derive_change_percent`] when the
    /// upstream did not report it.
    pub fn new(
        symbol: impl Into<String>,
        prices: PriceLevels,
        change_percent: Option<f64>,
        volume: Option<f64>,
        last_update: DateTime<Utc>,
    ) -> Self {
        let change_percent = change_percent
            .unwrap_or_else(|| derive_change_percent(prices.current, prices.previous_close));
        Self {
            symbol: symbol.into(),
            prices,
            change_percent,
            volume,
            status: classify_status(prices.current, change_percent),
            last_update,
        }
    }

    /// Convenience constructor for a quote with only a price and a change.
    pub fn from_change(symbol: impl Into<String>, current: f64, change_percent: f64) -> Self {
        Self::new(
            symbol,
            PriceLevels {
                current,
                ..PriceLevels::default()
            },
            Some(change_percent),
            None,
            Utc::now(),
        )
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn current_price(&self) -> f64 {
        self.prices.current
    }

    pub fn previous_close(&self) -> f64 {
        self.prices.previous_close
    }

    pub fn day_high(&self) -> f64 {
        self.prices.day_high
    }

    pub fn day_low(&self) -> f64 {
        self.prices.day_low
    }

    pub fn change_percent(&self) -> f64 {
        self.change_percent
    }

    /// Reported volume, or [`UNKNOWN_VOLUME`] when upstream omitted it.
    pub fn volume(&self) -> f64 {
        self.volume.unwrap_or(UNKNOWN_VOLUME)
    }

    pub fn reported_volume(&self) -> Option<f64> {
        self.volume
    }

    pub fn status(&self) -> QuoteStatus {
        self.status
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    pub fn is_valid(&self) -> bool {
        self.prices.current > 0.0
    }
}

pub fn derive_change_percent(current: f64, previous_close: f64) -> f64 {
    if previous_close == 0.0 {
        return 0.0;
    }
    (current - previous_close) / previous_close * 100.0
}
