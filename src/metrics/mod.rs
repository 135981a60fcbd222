pub mod market;
pub mod quote;

pub use market::{
    average_change, best_performer, bullish_count, diversity_score, market_sentiment,
    most_volatile, sort_by_performance, total_value, unusual_volume, MarketSummary,
    PerformerRef, Sentiment, SentimentCounts,
};
pub use quote::{
    assess_risk, classify_status, detect_pattern, quote_risk, recommend, rsi_estimate,
    support_resistance, PricePattern, Recommendation, SupportResistance,
};
