use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::Observation;

/// One trading day as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesBar {
    pub timestamp_ms: i64,
    pub date: NaiveDate,
    pub high: f64,
    pub low: f64,
}

impl SeriesBar {
    /// Returns `None` when the timestamp falls outside chrono's representable range.
    pub fn from_millis(timestamp_ms: i64, high: f64, low: f64) -> Option<Self> {
        let date = DateTime::<Utc>::from_timestamp_millis(timestamp_ms)?.date_naive();
        Some(Self { timestamp_ms, date, high, low })
    }

    pub fn average_price(&self) -> f64 {
        (self.high + self.low) / 2.0
    }
}

/// Validated daily high/low series for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesResult {
    pub ticker: String,
    pub bars: Vec<SeriesBar>,
}

impl SeriesResult {
    pub fn new(ticker: impl Into<String>, bars: Vec<SeriesBar>) -> Self {
        Self { ticker: ticker.into(), bars }
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Collapse the series into one observation per calendar date.
    ///
    /// When two bars land on the same UTC date the later one in the series wins,
    /// matching what a sequence of upserts would leave behind.
    pub fn to_observations(&self) -> Vec<Observation> {
        let mut by_date: std::collections::BTreeMap<NaiveDate, f64> = std::collections::BTreeMap::new();
        for bar in &self.bars {
            by_date.insert(bar.date, bar.average_price());
        }

        by_date
            .into_iter()
            .map(|(date, average_price)| Observation {
                ticker: self.ticker.clone(),
                date,
                average_price,
            })
            .collect()
    }
}
