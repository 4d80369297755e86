use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;

/// Connect to Postgres and bring the schema up to date.
///
/// Any failure here is fatal to the process: nothing can be stored without it.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("✅ Database connected and migrations applied");

    Ok(pool)
}
