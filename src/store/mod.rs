//! Persistence seam for the pipeline.
//!
//! `ObservationStore` owns observation rows and `TrendStore` owns trend rows.
//! Every write is a self-contained unit of work scoped to a single ticker, so
//! concurrent tasks working on different tickers never wait on each other.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{Observation, Trend};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Ensure a ticker record exists; no-op if already present.
    async fn upsert_ticker(&self, ticker: &str) -> Result<(), AppError>;

    /// Write one row per (ticker, date): insert if absent, overwrite the average if present.
    ///
    /// Returns the number of rows inserted or changed. The batch is atomic per ticker.
    async fn upsert_observations(
        &self,
        ticker: &str,
        observations: &[Observation],
    ) -> Result<u64, AppError>;

    /// Up to `n` most recent observations, ordered by date descending.
    async fn latest_observations(&self, ticker: &str, n: usize) -> Result<Vec<Observation>, AppError>;

    async fn tickers_with_observations(&self) -> Result<Vec<String>, AppError>;
}

#[async_trait]
pub trait TrendStore: Send + Sync {
    /// Insert or overwrite the single trend row for `trend.ticker`.
    async fn upsert_trend(&self, trend: &Trend) -> Result<(), AppError>;

    async fn find_trend(&self, ticker: &str) -> Result<Option<Trend>, AppError>;
}

/// Shared handles onto one backend, one per concern.
#[derive(Clone)]
pub struct StoreHandles {
    pub observations: Arc<dyn ObservationStore>,
    pub trends: Arc<dyn TrendStore>,
}

impl StoreHandles {
    pub fn new<S>(store: S) -> Self
    where
        S: ObservationStore + TrendStore + 'static,
    {
        let store = Arc::new(store);
        Self {
            observations: store.clone(),
            trends: store,
        }
    }
}
