pub mod observation_queries;
pub mod pool;
pub mod stock_queries;
pub mod trend_queries;
