use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;

use crate::errors::AppError;
use crate::models::{Observation, Trend};
use crate::store::{ObservationStore, TrendStore};

/// In-process store with the same keyed-upsert semantics as Postgres.
///
/// Used for `STORE_BACKEND=memory` runs and by the test suite. A ticker's
/// batch is applied while holding that ticker's shard entry, which makes it
/// atomic with respect to readers of the same ticker.
#[derive(Clone, Default)]
pub struct MemoryStore {
    observations: Arc<DashMap<String, BTreeMap<NaiveDate, f64>>>,
    trends: Arc<DashMap<String, Trend>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored observation rows for a ticker.
    pub fn observation_count(&self, ticker: &str) -> usize {
        self.observations.get(ticker).map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn has_ticker(&self, ticker: &str) -> bool {
        self.observations.contains_key(ticker)
    }
}

#[async_trait]
impl ObservationStore for MemoryStore {
    async fn upsert_ticker(&self, ticker: &str) -> Result<(), AppError> {
        self.observations.entry(ticker.to_string()).or_default();
        Ok(())
    }

    async fn upsert_observations(
        &self,
        ticker: &str,
        observations: &[Observation],
    ) -> Result<u64, AppError> {
        let mut rows = self.observations.entry(ticker.to_string()).or_default();

        let mut written = 0;
        for o in observations {
            match rows.insert(o.date, o.average_price) {
                Some(previous) if previous == o.average_price => {}
                _ => written += 1,
            }
        }

        Ok(written)
    }

    async fn latest_observations(&self, ticker: &str, n: usize) -> Result<Vec<Observation>, AppError> {
        let Some(rows) = self.observations.get(ticker) else {
            return Ok(Vec::new());
        };

        Ok(rows
            .iter()
            .rev()
            .take(n)
            .map(|(date, average_price)| Observation {
                ticker: ticker.to_string(),
                date: *date,
                average_price: *average_price,
            })
            .collect())
    }

    async fn tickers_with_observations(&self) -> Result<Vec<String>, AppError> {
        let mut tickers: Vec<String> = self
            .observations
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect();
        tickers.sort();
        Ok(tickers)
    }
}

#[async_trait]
impl TrendStore for MemoryStore {
    async fn upsert_trend(&self, trend: &Trend) -> Result<(), AppError> {
        self.trends.insert(trend.ticker.clone(), trend.clone());
        Ok(())
    }

    async fn find_trend(&self, ticker: &str) -> Result<Option<Trend>, AppError> {
        Ok(self.trends.get(ticker).map(|t| t.value().clone()))
    }
}
