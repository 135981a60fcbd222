use std::fmt;

use crate::model::quote::{Quote, QuoteStatus, RiskLevel};

pub const STRONG_BUY_THRESHOLD: f64 = 3.0;
pub const BUY_THRESHOLD: f64 = 1.0;
pub const SELL_THRESHOLD: f64 = -1.0;
pub const STRONG_SELL_THRESHOLD: f64 = -3.0;

pub const HIGH_RISK_CHANGE: f64 = 5.0;
pub const MEDIUM_RISK_CHANGE: f64 = 2.0;

/// Percent-change bucket for a quote. First matching row wins; a non-positive
/// price is always `Invalid` regardless of change.
pub fn classify_status(current_price: f64, change_percent: f64) -> QuoteStatus {
    if current_price <= 0.0 {
        return QuoteStatus::Invalid;
    }
    let change = change_percent;
    if change >= STRONG_BUY_THRESHOLD {
        QuoteStatus::StrongBuy
    } else if change >= BUY_THRESHOLD {
        QuoteStatus::Bullish
    } else if change > 0.0 {
        QuoteStatus::Positive
    } else if change == 0.0 {
        QuoteStatus::Neutral
    } else if change > SELL_THRESHOLD {
        QuoteStatus::Watch
    } else if change > STRONG_SELL_THRESHOLD {
        QuoteStatus::Bearish
    } else {
        QuoteStatus::Avoid
    }
}

pub fn assess_risk(change_percent: f64) -> RiskLevel {
    let magnitude = change_percent.abs();
    if magnitude >= HIGH_RISK_CHANGE {
        RiskLevel::High
    } else if magnitude >= MEDIUM_RISK_CHANGE {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Risk for a quote; `None` for invalid quotes.
pub fn quote_risk(quote: &Quote) -> Option<RiskLevel> {
    quote
        .is_valid()
        .then(|| assess_risk(quote.change_percent()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    StrongBuy,
    Buy,
    HoldUptick,
    HoldFlat,
    Watch,
    Sell,
    StrongSell,
}

impl Recommendation {
    pub fn label(self) -> &'static str {
        match self {
            Self::StrongBuy => "STRONG BUY - High momentum with strong volume",
            Self::Buy => "BUY - Positive trend with good volume",
            Self::HoldUptick => "HOLD - Slight upward movement",
            Self::HoldFlat => "HOLD - Minimal movement, watch closely",
            Self::Watch => "WATCH - Declining, consider exit strategy",
            Self::Sell => "SELL - Significant decline, limit losses",
            Self::StrongSell => "STRONG SELL - Major decline, exit immediately",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Change-and-volume recommendation. Unknown volume counts as zero, so it
/// can never qualify for the volume-gated buy rows.
pub fn recommend(quote: &Quote) -> Option<Recommendation> {
    if !quote.is_valid() {
        return None;
    }
    let change = quote.change_percent();
    let volume = quote.volume();
    let rec = if change >= 3.0 && volume > 1_000_000.0 {
        Recommendation::StrongBuy
    } else if change >= 1.0 && volume > 500_000.0 {
        Recommendation::Buy
    } else if change >= 0.5 {
        Recommendation::HoldUptick
    } else if change >= -0.5 {
        Recommendation::HoldFlat
    } else if change >= -2.0 {
        Recommendation::Watch
    } else if change >= -5.0 {
        Recommendation::Sell
    } else {
        Recommendation::StrongSell
    };
    Some(rec)
}

/// Placeholder momentum score centred on 50. Not a real RSI: it only scales
/// the day's change.
pub fn rsi_estimate(quote: &Quote) -> f64 {
    if !quote.is_valid() {
        return 50.0;
    }
    50.0 + quote.change_percent() * 5.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricePattern {
    BullishBreakout,
    BearishBreakdown,
    Sideways,
    UpwardTrend,
    DownwardTrend,
}

impl PricePattern {
    pub fn label(self) -> &'static str {
        match self {
            Self::BullishBreakout => "BULLISH BREAKOUT",
            Self::BearishBreakdown => "BEARISH BREAKDOWN",
            Self::Sideways => "SIDEWAYS TREND",
            Self::UpwardTrend => "UPWARD TREND",
            Self::DownwardTrend => "DOWNWARD TREND",
        }
    }
}

impl fmt::Display for PricePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn detect_pattern(quote: &Quote) -> Option<PricePattern> {
    if !quote.is_valid() {
        return None;
    }
    let change = quote.change_percent();
    let current = quote.current_price();
    let midpoint = (quote.day_high() + quote.day_low()) / 2.0;
    let pattern = if change > 2.0 && current > midpoint {
        PricePattern::BullishBreakout
    } else if change < -2.0 && current < midpoint {
        PricePattern::BearishBreakdown
    } else if change.abs() < 0.5 {
        PricePattern::Sideways
    } else if change > 0.0 {
        PricePattern::UpwardTrend
    } else {
        PricePattern::DownwardTrend
    };
    Some(pattern)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportResistance {
    pub support: f64,
    pub resistance: f64,
}

/// 5% below the day low and 5% above the day high.
pub fn support_resistance(quote: &Quote) -> SupportResistance {
    SupportResistance {
        support: quote.day_low() * 0.95,
        resistance: quote.day_high() * 1.05,
    }
}
