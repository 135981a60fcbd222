use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;

use super::types::RawQuote;
use crate::error::FetchError;
use crate::model::quote::Quote;
use crate::scheduler::QuoteSource;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct FinnhubRestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

/// Trim and uppercase a ticker. Anything other than ASCII letters and digits
/// is rejected.
pub fn normalize_symbol(raw: &str) -> Result<String, FetchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(FetchError::InvalidSymbol(raw.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

impl FinnhubRestClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Finnhub HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn compact_error_body(body: &str) -> String {
        let normalized = body.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.chars().count() > 180 {
            let head: String = normalized.chars().take(180).collect();
            format!("{}...", head)
        } else {
            normalized
        }
    }

    /// One GET against the quote endpoint. No retry: a failure here is the
    /// caller's to log and skip.
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, FetchError> {
        let symbol = normalize_symbol(symbol)?;
        let transport = |detail: String| FetchError::Transport {
            symbol: symbol.clone(),
            detail,
        };

        // without_url() keeps the access token out of error messages.
        let response = self
            .http
            .get(&self.base_url)
            .query(&[("symbol", symbol.as_str()), ("token", self.token.as_str())])
            .send()
            .await
            .map_err(|e| transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(transport(format!(
                "status {}: {}",
                status,
                Self::compact_error_body(&body)
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport(e.without_url().to_string()))?;
        let raw = RawQuote::parse(&body).map_err(|e| FetchError::Parse {
            symbol: symbol.clone(),
            detail: e.to_string(),
        })?;

        let quote = raw.into_quote(symbol.as_str(), Utc::now());
        tracing::debug!(
            symbol = %quote.symbol(),
            price = quote.current_price(),
            change_percent = quote.change_percent(),
            "Quote fetched"
        );
        Ok(quote)
    }
}

impl QuoteSource for FinnhubRestClient {
    async fn fetch(&self, symbol: &str) -> Result<Quote, FetchError> {
        self.get_quote(symbol).await
    }
}
