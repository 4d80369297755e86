//! Daily price-range ingestion and day-over-day trend derivation.
//!
//! The pipeline reads a ticker list, fetches each ticker's daily high/low
//! series under a launch-rate throttle, upserts one observation per
//! (ticker, date), and once every ticker has settled recomputes a single
//! up/down trend row per ticker from its two most recent observations.

pub mod config;
pub mod db;
pub mod errors;
pub mod external;
pub mod logging;
pub mod models;
pub mod services;
pub mod store;
