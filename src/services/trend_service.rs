use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info};

use crate::errors::AppError;
use crate::models::{Direction, Observation, Trend};
use crate::store::{ObservationStore, TrendStore};

pub const DEFAULT_ANALYSIS_CONCURRENCY: usize = 8;

/// Derive a trend from observations ordered newest first.
///
/// Needs at least two rows; only the first two are compared.
pub fn derive_trend(latest_first: &[Observation]) -> Option<Trend> {
    match latest_first {
        [latest, previous, ..] => Some(Trend {
            ticker: latest.ticker.clone(),
            date: latest.date,
            direction: Direction::between(previous.average_price, latest.average_price),
        }),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrendOutcome {
    Updated(Trend),
    /// Fewer than two observations stored; nothing written.
    Skipped { observations: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisReport {
    pub analyzed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Recomputes the single live trend row for every ticker with stored observations.
///
/// Must only run once ingestion has fully settled; it reads observation rows
/// and owns the trend rows.
pub struct TrendAnalyzer {
    observations: Arc<dyn ObservationStore>,
    trends: Arc<dyn TrendStore>,
    concurrency: usize,
}

impl TrendAnalyzer {
    pub fn new(
        observations: Arc<dyn ObservationStore>,
        trends: Arc<dyn TrendStore>,
        concurrency: usize,
    ) -> Self {
        Self {
            observations,
            trends,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn analyze_ticker(&self, ticker: &str) -> Result<TrendOutcome, AppError> {
        let latest = self.observations.latest_observations(ticker, 2).await?;

        let Some(trend) = derive_trend(&latest) else {
            debug!("Skipping trend for {}: only {} observation(s)", ticker, latest.len());
            return Ok(TrendOutcome::Skipped {
                observations: latest.len(),
            });
        };

        self.trends.upsert_trend(&trend).await?;
        debug!("Trend for {} on {}: {}", ticker, trend.date, trend.direction);
        Ok(TrendOutcome::Updated(trend))
    }

    /// Analyze all tickers. Only failing to list the tickers is an error;
    /// per-ticker failures are logged and counted.
    pub async fn run(&self) -> Result<AnalysisReport, AppError> {
        let tickers = self.observations.tickers_with_observations().await?;
        info!("📈 Analyzing trends for {} tickers", tickers.len());

        let outcomes: Vec<(String, Result<TrendOutcome, AppError>)> = stream::iter(tickers)
            .map(|ticker| async move {
                let outcome = self.analyze_ticker(&ticker).await;
                (ticker, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = AnalysisReport::default();
        for (ticker, outcome) in outcomes {
            match outcome {
                Ok(TrendOutcome::Updated(_)) => report.analyzed += 1,
                Ok(TrendOutcome::Skipped { .. }) => report.skipped += 1,
                Err(e) => {
                    error!("✗ Trend analysis failed for {} ({}): {}", ticker, e.kind(), e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "📈 Trend analysis complete: {} updated, {} skipped, {} failed",
            report.analyzed, report.skipped, report.failed
        );
        Ok(report)
    }
}

/// Read-only lookup of the current trend by ticker symbol.
///
/// The symbol is matched as given; normalizing case is up to the caller.
pub struct TrendQuery {
    trends: Arc<dyn TrendStore>,
}

impl TrendQuery {
    pub fn new(trends: Arc<dyn TrendStore>) -> Self {
        Self { trends }
    }

    /// `Ok(None)` means no trend has been computed for this ticker.
    pub async fn lookup(&self, ticker: &str) -> Result<Option<Trend>, AppError> {
        self.trends.find_trend(ticker).await
    }
}

/// Human-readable answer for the interactive prompt.
pub fn describe(ticker: &str, trend: Option<&Trend>) -> String {
    match trend {
        Some(t) => format!(
            "Stock price for {} {} compared to the previous day ({}).",
            ticker,
            t.direction.verb(),
            t.date
        ),
        None => format!("No data found for ticker {}.", ticker),
    }
}
