use sqlx::PgExecutor;

/// Ensure a row exists for the ticker; no-op if it is already there.
pub async fn upsert_stock<'e, E>(executor: E, ticker: &str) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO stocks (ticker) VALUES ($1)
         ON CONFLICT (ticker) DO NOTHING",
    )
    .bind(ticker)
    .execute(executor)
    .await?;

    Ok(())
}
