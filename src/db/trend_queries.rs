use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};

use crate::models::{Direction, Trend};

#[derive(Debug, FromRow)]
struct TrendRow {
    ticker: String,
    date: NaiveDate,
    direction: String,
}

impl TryFrom<TrendRow> for Trend {
    type Error = sqlx::Error;

    fn try_from(row: TrendRow) -> Result<Self, Self::Error> {
        let direction = row
            .direction
            .parse::<Direction>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        Ok(Trend {
            ticker: row.ticker,
            date: row.date,
            direction,
        })
    }
}

/// Insert or overwrite the single trend row for a ticker.
pub async fn upsert_trend(pool: &PgPool, trend: &Trend) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO trends (ticker, date, direction, updated_at)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (ticker)
        DO UPDATE SET date = EXCLUDED.date,
                      direction = EXCLUDED.direction,
                      updated_at = NOW()
        "#,
    )
    .bind(&trend.ticker)
    .bind(trend.date)
    .bind(trend.direction.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_trend(pool: &PgPool, ticker: &str) -> Result<Option<Trend>, sqlx::Error> {
    let row = sqlx::query_as::<_, TrendRow>(
        "SELECT ticker, date, direction FROM trends WHERE ticker = $1",
    )
    .bind(ticker)
    .fetch_optional(pool)
    .await?;

    row.map(Trend::try_from).transpose()
}
