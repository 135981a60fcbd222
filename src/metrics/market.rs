//! Aggregates over a set of quotes.
//!
//! Every function here skips invalid quotes (non-positive price) on its own,
//! so callers may pass a whole batch. Where a function picks a single quote,
//! ties resolve to the earliest quote in iteration order.

use std::cmp::Ordering;
use std::fmt;

use crate::model::quote::Quote;

pub const SENTIMENT_BULLISH_CHANGE: f64 = 1.0;
pub const SENTIMENT_BEARISH_CHANGE: f64 = -1.0;

fn valid<'a, I>(quotes: I) -> impl Iterator<Item = &'a Quote>
where
    I: IntoIterator<Item = &'a Quote>,
{
    quotes.into_iter().filter(|q| q.is_valid())
}

/// First quote whose `key` strictly exceeds both `floor` and every earlier
/// candidate.
fn first_max_by<'a, I, F>(quotes: I, floor: f64, key: F) -> Option<&'a Quote>
where
    I: IntoIterator<Item = &'a Quote>,
    F: Fn(&Quote) -> f64,
{
    let mut best: Option<(&Quote, f64)> = None;
    for quote in valid(quotes) {
        let value = key(quote);
        let threshold = best.map(|(_, v)| v).unwrap_or(floor);
        if value > threshold {
            best = Some((quote, value));
        }
    }
    best.map(|(quote, _)| quote)
}

pub fn best_performer<'a, I>(quotes: I) -> Option<&'a Quote>
where
    I: IntoIterator<Item = &'a Quote>,
{
    first_max_by(quotes, f64::NEG_INFINITY, Quote::change_percent)
}

/// Largest absolute move. A batch in which every valid quote is flat has no
/// most-volatile quote.
pub fn most_volatile<'a, I>(quotes: I) -> Option<&'a Quote>
where
    I: IntoIterator<Item = &'a Quote>,
{
    first_max_by(quotes, 0.0, |q| q.change_percent().abs())
}

/// Highest reported volume. Quotes with unknown volume never qualify.
pub fn unusual_volume<'a, I>(quotes: I) -> Option<&'a Quote>
where
    I: IntoIterator<Item = &'a Quote>,
{
    first_max_by(quotes, 0.0, Quote::volume)
}

pub fn bullish_count<'a, I>(quotes: I) -> usize
where
    I: IntoIterator<Item = &'a Quote>,
{
    valid(quotes).filter(|q| q.change_percent() > 0.0).count()
}

pub fn average_change<'a, I>(quotes: I) -> f64
where
    I: IntoIterator<Item = &'a Quote>,
{
    let (sum, n) = valid(quotes).fold((0.0, 0usize), |(sum, n), q| {
        (sum + q.change_percent(), n + 1)
    });
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Sum of current prices, one share per symbol.
pub fn total_value<'a, I>(quotes: I) -> f64
where
    I: IntoIterator<Item = &'a Quote>,
{
    valid(quotes).map(Quote::current_price).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    pub fn label(self) -> &'static str {
        match self {
            Self::Bullish => "BULLISH MARKET",
            Self::Bearish => "BEARISH MARKET",
            Self::Neutral => "NEUTRAL MARKET",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentCounts {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
}

impl SentimentCounts {
    pub fn tally<'a, I>(quotes: I) -> Self
    where
        I: IntoIterator<Item = &'a Quote>,
    {
        let mut counts = Self::default();
        for quote in valid(quotes) {
            let change = quote.change_percent();
            if change > SENTIMENT_BULLISH_CHANGE {
                counts.bullish += 1;
            } else if change < SENTIMENT_BEARISH_CHANGE {
                counts.bearish += 1;
            } else {
                counts.neutral += 1;
            }
        }
        counts
    }

    /// The group with a strict majority over both others wins; any tie for
    /// first place is `Neutral`.
    pub fn sentiment(&self) -> Sentiment {
        let Self {
            bullish,
            bearish,
            neutral,
        } = *self;
        if bullish > bearish && bullish > neutral {
            Sentiment::Bullish
        } else if bearish > bullish && bearish > neutral {
            Sentiment::Bearish
        } else {
            Sentiment::Neutral
        }
    }
}

pub fn market_sentiment<'a, I>(quotes: I) -> Sentiment
where
    I: IntoIterator<Item = &'a Quote>,
{
    SentimentCounts::tally(quotes).sentiment()
}

/// Balance between up- and down-movers as a percentage, 50 at an even split.
/// Flat quotes count as down-movers.
pub fn diversity_score<'a, I>(quotes: I) -> f64
where
    I: IntoIterator<Item = &'a Quote>,
{
    let (pos, neg) = valid(quotes).fold((0usize, 0usize), |(pos, neg), q| {
        if q.change_percent() > 0.0 {
            (pos + 1, neg)
        } else {
            (pos, neg + 1)
        }
    });
    let total = pos + neg;
    if total == 0 {
        return 0.0;
    }
    pos.min(neg) as f64 / total as f64 * 100.0
}

/// Stable sort, highest change first. Invalid quotes are kept; callers that
/// publish should pass valid quotes only.
pub fn sort_by_performance<'a, I>(quotes: I) -> Vec<&'a Quote>
where
    I: IntoIterator<Item = &'a Quote>,
{
    let mut sorted: Vec<&Quote> = quotes.into_iter().collect();
    sorted.sort_by(|a, b| {
        b.change_percent()
            .partial_cmp(&a.change_percent())
            .unwrap_or(Ordering::Equal)
    });
    sorted
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformerRef {
    pub symbol: String,
    pub change_percent: f64,
}

impl PerformerRef {
    fn of(quote: &Quote) -> Self {
        Self {
            symbol: quote.symbol().to_string(),
            change_percent: quote.change_percent(),
        }
    }
}

/// Everything the cycle log line reports about a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSummary {
    pub valid_count: usize,
    pub bullish_count: usize,
    pub average_change: f64,
    pub sentiment: Sentiment,
    pub best: Option<PerformerRef>,
    pub most_volatile: Option<PerformerRef>,
    pub unusual_volume: Option<PerformerRef>,
    pub diversity_score: f64,
    pub total_value: f64,
}

impl MarketSummary {
    pub fn from_quotes<'a, I>(quotes: I) -> Self
    where
        I: IntoIterator<Item = &'a Quote> + Clone,
    {
        Self {
            valid_count: valid(quotes.clone()).count(),
            bullish_count: bullish_count(quotes.clone()),
            average_change: average_change(quotes.clone()),
            sentiment: market_sentiment(quotes.clone()),
            best: best_performer(quotes.clone()).map(PerformerRef::of),
            most_volatile: most_volatile(quotes.clone()).map(PerformerRef::of),
            unusual_volume: unusual_volume(quotes.clone()).map(PerformerRef::of),
            diversity_score: diversity_score(quotes.clone()),
            total_value: total_value(quotes),
        }
    }

    pub fn bullish_pct(&self) -> f64 {
        if self.valid_count == 0 {
            0.0
        } else {
            self.bullish_count as f64 * 100.0 / self.valid_count as f64
        }
    }
}
