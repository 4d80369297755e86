pub mod marketdata;
pub mod series_provider;
