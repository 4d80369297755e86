use sqlx::PgPool;
use tracing::error;

use crate::db::stock_queries;
use crate::models::Observation;

/// Upsert a ticker's observations in a single transaction.
///
/// The stock row is created in the same transaction, so either the whole
/// batch lands or nothing for this ticker changes. Rows whose average is
/// unchanged are left untouched.
pub async fn upsert_observations(
    pool: &PgPool,
    ticker: &str,
    observations: &[Observation],
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await.map_err(|e| {
        error!("Failed to begin transaction for ticker {}: {}", ticker, e);
        e
    })?;

    stock_queries::upsert_stock(&mut *tx, ticker).await?;

    let mut written = 0;
    for (i, o) in observations.iter().enumerate() {
        let result = sqlx::query(
            r#"
            INSERT INTO observations (ticker, date, average_price, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (ticker, date)
            DO UPDATE SET average_price = EXCLUDED.average_price, updated_at = NOW()
            WHERE observations.average_price IS DISTINCT FROM EXCLUDED.average_price
            "#,
        )
        .bind(ticker)
        .bind(o.date)
        .bind(o.average_price)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(
                "Failed to upsert observation {} for ticker {} (date: {}, average: {}): {}",
                i, ticker, o.date, o.average_price, e
            );
            e
        })?;

        written += result.rows_affected();
    }

    tx.commit().await.map_err(|e| {
        error!("Failed to commit transaction for ticker {}: {}", ticker, e);
        e
    })?;

    Ok(written)
}

/// Most recent `limit` observations, newest first.
pub async fn fetch_latest(
    pool: &PgPool,
    ticker: &str,
    limit: i64,
) -> Result<Vec<Observation>, sqlx::Error> {
    sqlx::query_as::<_, Observation>(
        r#"
        SELECT ticker, date, average_price
        FROM observations
        WHERE ticker = $1
        ORDER BY date DESC
        LIMIT $2
        "#,
    )
    .bind(ticker)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn fetch_tickers_with_observations(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT ticker FROM observations ORDER BY ticker",
    )
    .fetch_all(pool)
    .await
}
