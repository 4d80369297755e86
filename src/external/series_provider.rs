use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::SeriesResult;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("provider error (status {status}): {message}")]
    ProviderError { status: u16, message: String },
}

impl FetchError {
    /// Transport failures may succeed on a second attempt; everything else
    /// will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Network(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidRequest(_) => "invalid_request",
            FetchError::Network(_) => "network",
            FetchError::MalformedPayload(_) => "malformed_payload",
            FetchError::ProviderError { .. } => "provider_error",
        }
    }
}

/// Source of daily high/low series for a single ticker.
///
/// Implementations are pure reads and must be safe to call from many tasks at once.
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    async fn fetch(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<SeriesResult, FetchError>;
}

/// Shared precondition check for every provider.
pub fn validate_request(ticker: &str, from: NaiveDate, to: NaiveDate) -> Result<(), FetchError> {
    if ticker.trim().is_empty() {
        return Err(FetchError::InvalidRequest("ticker must not be empty".into()));
    }
    if from > to {
        return Err(FetchError::InvalidRequest(format!(
            "window start {} is after window end {}",
            from, to
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_rejects_empty_ticker() {
        let err = validate_request("  ", d(2024, 1, 1), d(2024, 2, 1)).unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest(_)));
    }

    #[test]
    fn test_rejects_inverted_window() {
        let err = validate_request("AAPL", d(2024, 3, 1), d(2024, 2, 1)).unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest(_)));
    }

    #[test]
    fn test_accepts_single_day_window() {
        assert!(validate_request("AAPL", d(2024, 3, 1), d(2024, 3, 1)).is_ok());
    }

    #[test]
    fn test_only_network_errors_are_retryable() {
        assert!(FetchError::Network("reset".into()).is_retryable());
        assert!(!FetchError::MalformedPayload("no h".into()).is_retryable());
        assert!(!FetchError::ProviderError { status: 200, message: "no_data".into() }.is_retryable());
    }
}
