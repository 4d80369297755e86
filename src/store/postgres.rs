use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::{observation_queries, stock_queries, trend_queries};
use crate::errors::AppError;
use crate::models::{Observation, Trend};
use crate::store::{ObservationStore, TrendStore};

/// Postgres-backed store. Each call checks out its own pooled connection,
/// and observation batches run in their own transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ObservationStore for PgStore {
    async fn upsert_ticker(&self, ticker: &str) -> Result<(), AppError> {
        stock_queries::upsert_stock(&self.pool, ticker).await?;
        Ok(())
    }

    async fn upsert_observations(
        &self,
        ticker: &str,
        observations: &[Observation],
    ) -> Result<u64, AppError> {
        Ok(observation_queries::upsert_observations(&self.pool, ticker, observations).await?)
    }

    async fn latest_observations(&self, ticker: &str, n: usize) -> Result<Vec<Observation>, AppError> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        Ok(observation_queries::fetch_latest(&self.pool, ticker, limit).await?)
    }

    async fn tickers_with_observations(&self) -> Result<Vec<String>, AppError> {
        Ok(observation_queries::fetch_tickers_with_observations(&self.pool).await?)
    }
}

#[async_trait]
impl TrendStore for PgStore {
    async fn upsert_trend(&self, trend: &Trend) -> Result<(), AppError> {
        trend_queries::upsert_trend(&self.pool, trend).await?;
        Ok(())
    }

    async fn find_trend(&self, ticker: &str) -> Result<Option<Trend>, AppError> {
        Ok(trend_queries::fetch_trend(&self.pool, ticker).await?)
    }
}
