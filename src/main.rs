use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use stock_trend::config::{AppConfig, StoreBackend};
use stock_trend::db;
use stock_trend::external::marketdata::MarketDataClient;
use stock_trend::logging::{init_logging, LoggingConfig};
use stock_trend::services::ingestion_service::IngestionCoordinator;
use stock_trend::services::throttle::Throttle;
use stock_trend::services::ticker_list_service;
use stock_trend::services::trend_service::{describe, TrendAnalyzer, TrendQuery};
use stock_trend::store::{MemoryStore, PgStore, StoreHandles};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env()).map_err(|e| anyhow::anyhow!(e))?;

    let config = AppConfig::from_env()?;
    info!("⚙️ Starting with {:?}", config);

    let store = match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config.database_url.as_deref().unwrap_or_default();
            let pool = db::pool::init_pool(database_url, config.db_max_connections)
                .await
                .context("failed to initialize the observation store")?;
            StoreHandles::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            info!("🗃️ Using in-memory store; results are not persisted");
            StoreHandles::new(MemoryStore::new())
        }
    };

    let tickers = ticker_list_service::load_tickers(&config.ticker_file)
        .await
        .with_context(|| format!("failed to read ticker list {}", config.ticker_file.display()))?;

    let provider = MarketDataClient::new(
        &config.provider_base_url,
        config.provider_token.clone(),
        config.fetch_timeout,
    )?;

    let coordinator = IngestionCoordinator::new(
        Arc::new(provider),
        store.observations.clone(),
        Arc::new(Throttle::new(config.throttle_interval)),
        config.ingestion_settings(),
    );

    // Barrier: every ingestion task has settled before analysis reads anything.
    let report = coordinator.run(&tickers).await;
    if report.failed() > 0 {
        let skipped: Vec<&str> = report
            .tickers
            .iter()
            .filter(|t| !t.outcome.is_success())
            .map(|t| t.ticker.as_str())
            .collect();
        warn!("Tickers skipped this run: {}", skipped.join(", "));
    }

    let analyzer = TrendAnalyzer::new(
        store.observations.clone(),
        store.trends.clone(),
        config.analysis_concurrency,
    );
    if let Err(e) = analyzer.run().await {
        error!("✗ Trend analysis could not start: {}", e);
    }

    let query = TrendQuery::new(store.trends.clone());
    prompt_for_ticker(&query).await
}

async fn prompt_for_ticker(query: &TrendQuery) -> anyhow::Result<()> {
    print!("Enter a stock ticker: ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    let ticker = line.trim().to_uppercase();

    let trend = query.lookup(&ticker).await?;
    println!("{}", describe(&ticker, trend.as_ref()));
    Ok(())
}
