use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::FetchError;
use crate::metrics::{quote_risk, MarketSummary};
use crate::model::batch::{Batch, BatchSlot};
use crate::model::quote::{Quote, RiskLevel};
use crate::snapshot::SnapshotWriter;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_PACING: Duration = Duration::from_millis(400);

/// Anything that can produce a quote for one symbol.
pub trait QuoteSource {
    fn fetch(&self, symbol: &str) -> impl Future<Output = Result<Quote, FetchError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSettings {
    /// Sleep between the end of one cycle and the start of the next.
    pub interval: Duration,
    /// Pause between consecutive fetches inside a cycle.
    pub pacing: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            pacing: DEFAULT_PACING,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Published,
    /// Every fetch failed; the previous snapshot stays in place.
    NoData,
    WriteFailed(String),
    /// Shutdown arrived before every symbol was attempted.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    pub outcome: CycleOutcome,
    pub summary: Option<MarketSummary>,
}

/// Resolves once shutdown is requested or the sender is gone.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Sleeps for `delay`. Returns `true` if shutdown cut the sleep short.
async fn pause(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = shutdown_requested(shutdown) => true,
    }
}

pub struct RefreshScheduler<S> {
    source: S,
    writer: SnapshotWriter,
    symbols: Vec<String>,
    settings: RefreshSettings,
    cycle: u64,
}

impl<S: QuoteSource> RefreshScheduler<S> {
    pub fn new(
        source: S,
        writer: SnapshotWriter,
        symbols: Vec<String>,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            source,
            writer,
            symbols,
            settings,
            cycle: 0,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetches every symbol in order. A failed symbol leaves its slot empty.
    /// Returns `None` if shutdown was requested before the batch completed.
    pub async fn collect_batch(&self, shutdown: &mut watch::Receiver<bool>) -> Option<Batch> {
        let mut slots = Vec::with_capacity(self.symbols.len());
        for (i, symbol) in self.symbols.iter().enumerate() {
            if i > 0 && !self.settings.pacing.is_zero() && pause(shutdown, self.settings.pacing).await
            {
                return None;
            }

            let result = tokio::select! {
                r = self.source.fetch(symbol) => r,
                _ = shutdown_requested(shutdown) => return None,
            };

            let quote = match result {
                Ok(quote) => {
                    tracing::info!(
                        symbol = %quote.symbol(),
                        price = quote.current_price(),
                        change_percent = quote.change_percent(),
                        status = %quote.status(),
                        risk = quote_risk(&quote).map_or("N/A", RiskLevel::label),
                        "Quote updated"
                    );
                    Some(quote)
                }
                Err(e) => {
                    tracing::warn!(
                        symbol = %symbol,
                        kind = e.kind(),
                        error = %e,
                        "Quote fetch failed, skipping symbol"
                    );
                    None
                }
            };
            slots.push(BatchSlot {
                symbol: symbol.clone(),
                quote,
            });
        }
        Some(Batch::from_slots(slots))
    }

    /// One fetch-analyze-publish pass. Nothing is written unless every
    /// symbol was attempted and at least one fetch succeeded.
    pub async fn run_cycle(&mut self, shutdown: &mut watch::Receiver<bool>) -> CycleReport {
        self.cycle += 1;
        let cycle = self.cycle;

        let Some(batch) = self.collect_batch(shutdown).await else {
            tracing::info!(cycle, "Cycle cancelled before completion");
            return CycleReport {
                cycle,
                succeeded: Vec::new(),
                failed: Vec::new(),
                outcome: CycleOutcome::Cancelled,
                summary: None,
            };
        };

        if batch.is_empty() {
            tracing::warn!(cycle, "Watchlist is empty, nothing to fetch");
            return CycleReport {
                cycle,
                succeeded: Vec::new(),
                failed: Vec::new(),
                outcome: CycleOutcome::NoData,
                summary: None,
            };
        }

        let succeeded: Vec<String> = batch.quotes().map(|q| q.symbol().to_string()).collect();
        let failed: Vec<String> = batch
            .failed_symbols()
            .into_iter()
            .map(str::to_string)
            .collect();

        if succeeded.is_empty() {
            tracing::warn!(
                cycle,
                failed = failed.len(),
                "No data fetched this cycle, keeping previous snapshot"
            );
            return CycleReport {
                cycle,
                succeeded,
                failed,
                outcome: CycleOutcome::NoData,
                summary: None,
            };
        }

        let summary = MarketSummary::from_quotes(batch.valid_quotes());
        log_summary(cycle, &summary, batch.len());

        let outcome = match self.writer.publish(&batch) {
            Ok(()) => {
                tracing::info!(
                    cycle,
                    published = summary.valid_count,
                    path = %self.writer.paths().stocks.display(),
                    "Snapshot updated"
                );
                CycleOutcome::Published
            }
            Err(e) => {
                tracing::error!(
                    cycle,
                    error = %e,
                    "Snapshot write failed, previous snapshot remains"
                );
                CycleOutcome::WriteFailed(e.to_string())
            }
        };

        CycleReport {
            cycle,
            succeeded,
            failed,
            outcome,
            summary: Some(summary),
        }
    }

    /// Runs cycles until shutdown. Overlapping cycles are impossible: the
    /// next one starts only after the previous one and the interval sleep
    /// have both finished.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            symbols = ?self.symbols,
            interval_secs = self.settings.interval.as_secs_f64(),
            pacing_ms = self.settings.pacing.as_millis() as u64,
            "Refresh loop started"
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            let report = self.run_cycle(&mut shutdown).await;
            if report.outcome == CycleOutcome::Cancelled {
                break;
            }
            if pause(&mut shutdown, self.settings.interval).await {
                break;
            }
        }
        tracing::info!(cycles = self.cycle, "Refresh loop stopped");
    }
}

fn log_summary(cycle: u64, summary: &MarketSummary, batch_size: usize) {
    tracing::info!(
        cycle,
        bullish = summary.bullish_count,
        valid = summary.valid_count,
        batch_size,
        bullish_pct = summary.bullish_pct(),
        average_change = summary.average_change,
        sentiment = %summary.sentiment,
        best = summary.best.as_ref().map(|b| b.symbol.as_str()).unwrap_or("N/A"),
        most_volatile = summary
            .most_volatile
            .as_ref()
            .map(|b| b.symbol.as_str())
            .unwrap_or("N/A"),
        unusual_volume = summary
            .unusual_volume
            .as_ref()
            .map(|b| b.symbol.as_str())
            .unwrap_or("N/A"),
        diversity = summary.diversity_score,
        total_value = summary.total_value,
        "Market summary"
    );
}
