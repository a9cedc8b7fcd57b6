//! Market-data provider trait, fetch errors, and panel download orchestration.
//!
//! Providers fetch per-ticker daily bars; `download_panel` runs a whole
//! universe through a provider and assembles the results into a single price
//! panel on the union of all tickers' trading dates. Dates a ticker did not
//! trade become missing cells.

use crate::indicator::Indicator;
use crate::panel::{Panel, PanelColumn, MISSING};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Raw daily bar for one ticker. All fields are f64 with NaN for missing so
/// they can land in a panel cell unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Cell value for one indicator of this bar.
    pub fn value(&self, indicator: Indicator) -> f64 {
        match indicator {
            Indicator::Open => self.open,
            Indicator::High => self.high,
            Indicator::Low => self.low,
            Indicator::Close => self.close,
            Indicator::AdjClose => self.adj_close,
            Indicator::Volume => self.volume,
        }
    }
}

/// Errors from data providers and the ticker-list source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("ticker not found: {ticker}")]
    TickerNotFound { ticker: String },

    #[error("hard stop: provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("fetch error: {0}")]
    Other(String),
}

/// A source of daily pricing data.
///
/// `fetch` covers the half-open range `[start, end)`. Network and service
/// failures are the provider's concern; the core pipeline only sees the
/// resulting bars or a `FetchError`.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Fetch daily bars for one ticker over `[start, end)`.
    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, FetchError>;

    /// Whether the provider currently accepts requests.
    fn is_available(&self) -> bool;
}

/// Progress callbacks for multi-ticker downloads.
pub trait FetchProgress: Send {
    fn on_start(&self, ticker: &str, index: usize, total: usize);
    fn on_complete(&self, ticker: &str, index: usize, total: usize, result: &Result<(), FetchError>);
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that prints to stdout.
pub struct StdoutProgress;

impl FetchProgress for StdoutProgress {
    fn on_start(&self, ticker: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {ticker}...", index + 1, total);
    }

    fn on_complete(
        &self,
        ticker: &str,
        _index: usize,
        _total: usize,
        result: &Result<(), FetchError>,
    ) {
        match result {
            Ok(()) => println!("  OK: {ticker}"),
            Err(e) => println!("  FAIL: {ticker}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        println!("\nDownload complete: {succeeded}/{total} succeeded, {failed} failed");
    }
}

/// Silent progress reporter for tests and library callers.
pub struct NullProgress;

impl FetchProgress for NullProgress {
    fn on_start(&self, _: &str, _: usize, _: usize) {}
    fn on_complete(&self, _: &str, _: usize, _: usize, _: &Result<(), FetchError>) {}
    fn on_batch_complete(&self, _: usize, _: usize, _: usize) {}
}

/// Summary of a batch download.
#[derive(Debug)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<(String, FetchError)>,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// The assembled panel plus the per-ticker outcome of the batch.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub panel: Panel,
    pub summary: DownloadSummary,
}

/// Download a universe of tickers and assemble the price panel.
///
/// Tickers that fail are recorded in the summary; the panel contains the
/// tickers that succeeded. If the provider becomes unavailable mid-batch
/// (circuit breaker), the remaining tickers are marked failed without
/// further requests.
pub fn download_panel(
    provider: &dyn MarketDataProvider,
    tickers: &[&str],
    start: NaiveDate,
    end: NaiveDate,
    progress: &dyn FetchProgress,
) -> DownloadOutcome {
    let total = tickers.len();
    let mut succeeded = 0;
    let mut failed = 0;
    let mut errors: Vec<(String, FetchError)> = Vec::new();
    let mut series: Vec<(String, Vec<PriceBar>)> = Vec::new();

    for (i, ticker) in tickers.iter().enumerate() {
        progress.on_start(ticker, i, total);

        let result = provider
            .fetch(ticker, start, end)
            .map(|bars| series.push((ticker.to_string(), bars)));
        progress.on_complete(ticker, i, total, &result);

        match result {
            Ok(()) => succeeded += 1,
            Err(e) => {
                errors.push((ticker.to_string(), e));
                failed += 1;
            }
        }

        if !provider.is_available() {
            for rest in &tickers[(i + 1)..total] {
                errors.push((rest.to_string(), FetchError::CircuitBreakerTripped));
                failed += 1;
            }
            break;
        }
    }

    progress.on_batch_complete(succeeded, failed, total);

    DownloadOutcome {
        panel: panel_from_bars(&series),
        summary: DownloadSummary {
            total,
            succeeded,
            failed,
            errors,
        },
    }
}

/// Assemble per-ticker bars into a price panel on the union of all dates.
///
/// Column order is indicator-major in the canonical A-O-H-L-C-V order, with
/// tickers in the given order inside each indicator block.
pub fn panel_from_bars(series: &[(String, Vec<PriceBar>)]) -> Panel {
    let mut all_dates = BTreeSet::new();
    for (_, bars) in series {
        for bar in bars {
            all_dates.insert(bar.date);
        }
    }
    let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

    let lookups: Vec<(&String, HashMap<NaiveDate, &PriceBar>)> = series
        .iter()
        .map(|(ticker, bars)| {
            let mut by_date = HashMap::new();
            for bar in bars {
                by_date.insert(bar.date, bar);
            }
            (ticker, by_date)
        })
        .collect();

    let mut columns = Vec::with_capacity(series.len() * Indicator::ALL.len());
    for indicator in Indicator::ALL {
        for (ticker, by_date) in &lookups {
            let values: Vec<f64> = dates
                .iter()
                .map(|d| by_date.get(d).map(|b| b.value(indicator)).unwrap_or(MISSING))
                .collect();
            columns.push(PanelColumn::new(indicator.label(), (*ticker).clone(), values));
        }
    }

    Panel::new(dates, columns).expect("union-aligned columns match the date index")
}
