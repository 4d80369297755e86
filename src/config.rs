use std::path::PathBuf;
use std::str::FromStr;

use tokio::time::Duration;

use crate::errors::AppError;
use crate::external::marketdata::DEFAULT_BASE_URL;
use crate::services::ingestion_service::{
    IngestionSettings, DEFAULT_FETCH_TIMEOUT, DEFAULT_HISTORY_MONTHS, DEFAULT_MAX_RETRIES,
};
use crate::services::throttle::DEFAULT_INTERVAL;
use crate::services::trend_service::DEFAULT_ANALYSIS_CONCURRENCY;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::Config(format!(
                "Invalid STORE_BACKEND: {}. Must be 'postgres' or 'memory'",
                other
            ))),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub provider_base_url: String,
    pub provider_token: String,
    pub ticker_file: PathBuf,
    pub history_months: u32,
    pub throttle_interval: Duration,
    pub fetch_timeout: Duration,
    pub fetch_max_retries: u32,
    pub analysis_concurrency: usize,
}

// Hand-written so the credential never ends up in logs.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("store_backend", &self.store_backend)
            .field("db_max_connections", &self.db_max_connections)
            .field("provider_base_url", &self.provider_base_url)
            .field("ticker_file", &self.ticker_file)
            .field("history_months", &self.history_months)
            .field("throttle_interval", &self.throttle_interval)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("fetch_max_retries", &self.fetch_max_retries)
            .field("analysis_concurrency", &self.analysis_concurrency)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_backend: StoreBackend = lookup("STORE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .parse()?;

        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(AppError::Config("DATABASE_URL is not set".into()));
        }

        let provider_token = lookup("MARKETDATA_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::Config("MARKETDATA_TOKEN is not set".into()))?;

        let config = Self {
            store_backend,
            database_url,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            provider_base_url: lookup("MARKETDATA_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            provider_token,
            ticker_file: lookup("TICKER_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("ticker.txt")),
            history_months: parse_or(&lookup, "HISTORY_MONTHS", DEFAULT_HISTORY_MONTHS)?,
            throttle_interval: Duration::from_millis(parse_or(
                &lookup,
                "THROTTLE_INTERVAL_MS",
                DEFAULT_INTERVAL.as_millis() as u64,
            )?),
            fetch_timeout: Duration::from_secs(parse_or(
                &lookup,
                "FETCH_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT.as_secs(),
            )?),
            fetch_max_retries: parse_or(&lookup, "FETCH_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            analysis_concurrency: parse_or(&lookup, "ANALYSIS_CONCURRENCY", DEFAULT_ANALYSIS_CONCURRENCY)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.fetch_timeout.is_zero() {
            return Err(AppError::Config("FETCH_TIMEOUT_SECS must be greater than 0".into()));
        }
        if self.db_max_connections == 0 {
            return Err(AppError::Config("DB_MAX_CONNECTIONS must be greater than 0".into()));
        }
        if self.analysis_concurrency == 0 {
            return Err(AppError::Config("ANALYSIS_CONCURRENCY must be greater than 0".into()));
        }
        Ok(())
    }

    pub fn ingestion_settings(&self) -> IngestionSettings {
        IngestionSettings {
            history_months: self.history_months,
            fetch_timeout: self.fetch_timeout,
            max_retries: self.fetch_max_retries,
            ..IngestionSettings::default()
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid {}={}: {}", key, raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/stocks"),
            ("MARKETDATA_TOKEN", "abc"),
        ]))
        .unwrap();

        assert_eq!(config.store_backend, StoreBackend::Postgres);
        assert_eq!(config.throttle_interval, Duration::from_millis(600));
        assert_eq!(config.history_months, 10);
        assert_eq!(config.ticker_file, PathBuf::from("ticker.txt"));
        assert_eq!(config.provider_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = AppConfig::from_lookup(lookup_from(&[("MARKETDATA_TOKEN", "abc")])).unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m.contains("DATABASE_URL")));
    }

    #[test]
    fn test_memory_backend_needs_no_database() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "Memory"),
            ("MARKETDATA_TOKEN", "abc"),
        ]))
        .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_token_is_required() {
        let err = AppConfig::from_lookup(lookup_from(&[("STORE_BACKEND", "memory")])).unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m.contains("MARKETDATA_TOKEN")));
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("MARKETDATA_TOKEN", "abc"),
            ("THROTTLE_INTERVAL_MS", "fast"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m.contains("THROTTLE_INTERVAL_MS")));
    }

    #[test]
    fn test_debug_hides_token() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("MARKETDATA_TOKEN", "super-secret"),
        ]))
        .unwrap();
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
