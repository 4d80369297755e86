//! Ticker ingestion
//!
//! Fans out one task per ticker, paced by the [`Throttle`], and joins them all
//! before returning. Each task fetches the ticker's daily series, turns it into
//! observations and upserts them as a single unit of work.
//!
//! # Error Handling
//!
//! - A fetch or persistence failure only affects its own ticker; the prior
//!   stored state for that ticker is left untouched
//! - Network failures are retried with linear backoff, each retry taking a
//!   fresh throttle slot
//! - Every fetch is bounded by a timeout so a hung request cannot hold up the barrier

use std::sync::Arc;

use chrono::{Months, NaiveDate, Utc};
use tokio::time::{sleep, timeout, Duration};
use tracing::{error, info, warn};

use crate::external::series_provider::{FetchError, SeriesProvider};
use crate::models::SeriesResult;
use crate::services::throttle::Throttle;
use crate::store::ObservationStore;

pub const DEFAULT_HISTORY_MONTHS: u32 = 10;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct IngestionSettings {
    pub history_months: u32,
    pub fetch_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            history_months: DEFAULT_HISTORY_MONTHS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: RETRY_BACKOFF,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickerOutcome {
    /// Series stored; `rows` counts observations inserted or changed.
    Stored { rows: u64 },
    FetchFailed(FetchError),
    PersistFailed(String),
    /// The task itself died (panic or cancellation) before settling.
    TaskFailed(String),
}

impl TickerOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TickerOutcome::Stored { .. })
    }
}

#[derive(Debug, Clone)]
pub struct TickerReport {
    pub ticker: String,
    pub outcome: TickerOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct IngestionReport {
    pub tickers: Vec<TickerReport>,
}

impl IngestionReport {
    pub fn succeeded(&self) -> usize {
        self.tickers.iter().filter(|t| t.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.tickers.len() - self.succeeded()
    }

    pub fn outcome(&self, ticker: &str) -> Option<&TickerOutcome> {
        self.tickers.iter().find(|t| t.ticker == ticker).map(|t| &t.outcome)
    }
}

/// The fetch window: `months` back from `today` through `today`.
pub fn fetch_window(today: NaiveDate, months: u32) -> (NaiveDate, NaiveDate) {
    let from = today
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN);
    (from, today)
}

#[derive(Clone)]
pub struct IngestionCoordinator {
    provider: Arc<dyn SeriesProvider>,
    store: Arc<dyn ObservationStore>,
    throttle: Arc<Throttle>,
    settings: IngestionSettings,
}

impl IngestionCoordinator {
    pub fn new(
        provider: Arc<dyn SeriesProvider>,
        store: Arc<dyn ObservationStore>,
        throttle: Arc<Throttle>,
        settings: IngestionSettings,
    ) -> Self {
        Self {
            provider,
            store,
            throttle,
            settings,
        }
    }

    /// Ingest every ticker over the default window ending today (UTC).
    pub async fn run(&self, tickers: &[String]) -> IngestionReport {
        let (from, to) = fetch_window(Utc::now().date_naive(), self.settings.history_months);
        self.run_window(tickers, from, to).await
    }

    /// Launch one task per ticker and wait until all of them have settled.
    pub async fn run_window(&self, tickers: &[String], from: NaiveDate, to: NaiveDate) -> IngestionReport {
        info!("📥 Starting ingestion for {} tickers ({} .. {})", tickers.len(), from, to);

        let mut handles = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            self.throttle.acquire().await;

            let this = self.clone();
            let task_ticker = ticker.clone();
            let handle = tokio::spawn(async move { this.ingest_ticker(&task_ticker, from, to).await });
            handles.push((ticker.clone(), handle));
        }

        let settled = futures::future::join_all(handles.into_iter().map(|(ticker, handle)| async move {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("✗ Ingestion task for {} did not complete: {}", ticker, e);
                    TickerOutcome::TaskFailed(e.to_string())
                }
            };
            TickerReport { ticker, outcome }
        }))
        .await;

        let report = IngestionReport { tickers: settled };
        info!(
            "📥 Ingestion finished: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }

    /// Fetch, transform and store a single ticker. Never panics on provider or store errors.
    pub async fn ingest_ticker(&self, ticker: &str, from: NaiveDate, to: NaiveDate) -> TickerOutcome {
        let series = match self.fetch_with_retry(ticker, from, to).await {
            Ok(series) => series,
            Err(e) => {
                error!("✗ Failed to fetch {} ({}): {}", ticker, e.kind(), e);
                return TickerOutcome::FetchFailed(e);
            }
        };

        let observations = series.to_observations();
        match self.store.upsert_observations(ticker, &observations).await {
            Ok(rows) => {
                info!(
                    "✓ Stored {} observations for {} ({} inserted or changed)",
                    observations.len(),
                    ticker,
                    rows
                );
                TickerOutcome::Stored { rows }
            }
            Err(e) => {
                error!("✗ Failed to store observations for {} ({}): {}", ticker, e.kind(), e);
                TickerOutcome::PersistFailed(e.to_string())
            }
        }
    }

    async fn fetch_with_retry(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<SeriesResult, FetchError> {
        let mut attempt = 0;

        loop {
            let result = match timeout(self.settings.fetch_timeout, self.provider.fetch(ticker, from, to)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Network(format!(
                    "request timed out after {}ms",
                    self.settings.fetch_timeout.as_millis()
                ))),
            };

            match result {
                Err(e) if e.is_retryable() && attempt < self.settings.max_retries => {
                    attempt += 1;
                    let delay = self.settings.retry_backoff * attempt;
                    warn!(
                        "Fetch for {} failed ({}), retrying in {}ms (attempt {}/{})",
                        ticker,
                        e,
                        delay.as_millis(),
                        attempt,
                        self.settings.max_retries
                    );
                    sleep(delay).await;
                    self.throttle.acquire().await;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_is_months_back_to_today() {
        let today = NaiveDate::from_ymd_opt(2024, 11, 15).unwrap();
        let (from, to) = fetch_window(today, 10);
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(to, today);
    }

    #[test]
    fn test_window_clamps_to_month_end() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let (from, _) = fetch_window(today, 10);
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_report_counts() {
        let report = IngestionReport {
            tickers: vec![
                TickerReport { ticker: "A".into(), outcome: TickerOutcome::Stored { rows: 3 } },
                TickerReport {
                    ticker: "B".into(),
                    outcome: TickerOutcome::FetchFailed(FetchError::Network("reset".into())),
                },
                TickerReport { ticker: "C".into(), outcome: TickerOutcome::PersistFailed("boom".into()) },
            ],
        };

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.outcome("A"), Some(&TickerOutcome::Stored { rows: 3 }));
        assert_eq!(report.outcome("Z"), None);
    }
}
