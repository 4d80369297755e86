use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::external::series_provider::{validate_request, FetchError, SeriesProvider};
use crate::models::{SeriesBar, SeriesResult};

pub const DEFAULT_BASE_URL: &str = "https://api.marketdata.app/v1";

/// Daily candles from marketdata.app.
pub struct MarketDataClient {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

impl MarketDataClient {
    pub fn new(base_url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| FetchError::InvalidRequest(format!("invalid provider base url {}: {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            token: token.into(),
        })
    }

    /// `{base}/stocks/candles/D/{ticker}/?from=..&to=..&token=..`
    fn candles_url(&self, ticker: &str, from: NaiveDate, to: NaiveDate) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidRequest(format!("provider base url cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(&["stocks", "candles", "D", ticker, ""]);

        url.query_pairs_mut()
            .append_pair("from", &from.format("%Y-%m-%d").to_string())
            .append_pair("to", &to.format("%Y-%m-%d").to_string())
            .append_pair("token", &self.token);

        Ok(url)
    }
}

// Wire format: status plus index-aligned parallel arrays.
#[derive(Debug, Deserialize)]
struct CandlesResponse {
    s: Option<String>,
    errmsg: Option<String>,
    t: Option<Vec<i64>>,
    h: Option<Vec<f64>>,
    l: Option<Vec<f64>>,
}

/// Decode a candles payload into a validated series.
///
/// Never returns partial data: any missing array, length mismatch or
/// unrepresentable timestamp rejects the whole payload.
pub fn parse_candles(ticker: &str, http_status: u16, body: &str) -> Result<SeriesResult, FetchError> {
    let response: CandlesResponse = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) if (200..300).contains(&http_status) => {
            return Err(FetchError::MalformedPayload(format!("invalid JSON: {}", e)));
        }
        Err(_) => {
            return Err(FetchError::ProviderError {
                status: http_status,
                message: body.chars().take(200).collect(),
            });
        }
    };

    match response.s.as_deref() {
        Some("error") => {
            return Err(FetchError::ProviderError {
                status: http_status,
                message: response.errmsg.unwrap_or_else(|| "unspecified provider error".into()),
            });
        }
        Some("no_data") => {
            return Err(FetchError::ProviderError {
                status: http_status,
                message: "no data for requested window".into(),
            });
        }
        _ => {}
    }

    if !(200..300).contains(&http_status) {
        return Err(FetchError::ProviderError {
            status: http_status,
            message: response.errmsg.unwrap_or_else(|| format!("HTTP {}", http_status)),
        });
    }

    let timestamps = response.t.ok_or_else(|| FetchError::MalformedPayload("missing field `t`".into()))?;
    let highs = response.h.ok_or_else(|| FetchError::MalformedPayload("missing field `h`".into()))?;
    let lows = response.l.ok_or_else(|| FetchError::MalformedPayload("missing field `l`".into()))?;

    if timestamps.len() != highs.len() || timestamps.len() != lows.len() {
        return Err(FetchError::MalformedPayload(format!(
            "array lengths differ: t={}, h={}, l={}",
            timestamps.len(),
            highs.len(),
            lows.len()
        )));
    }

    let bars = timestamps
        .into_iter()
        .zip(highs)
        .zip(lows)
        .map(|((ts, high), low)| {
            SeriesBar::from_millis(ts, high, low)
                .ok_or_else(|| FetchError::MalformedPayload(format!("timestamp out of range: {}", ts)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SeriesResult::new(ticker, bars))
}

#[async_trait]
impl SeriesProvider for MarketDataClient {
    async fn fetch(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<SeriesResult, FetchError> {
        validate_request(ticker, from, to)?;

        let url = self.candles_url(ticker, from, to)?;
        debug!("Requesting candles for {} ({} .. {})", ticker, from, to);

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.without_url().to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Network(e.without_url().to_string()))?;

        parse_candles(ticker, status, &body)
    }
}
