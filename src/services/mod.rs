pub mod ingestion_service;
pub mod throttle;
pub mod ticker_list_service;
pub mod trend_service;
