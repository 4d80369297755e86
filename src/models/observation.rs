use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// One day's derived average price for a ticker. Keyed by (ticker, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Observation {
    pub ticker: String,
    pub date: NaiveDate,
    pub average_price: f64,
}
