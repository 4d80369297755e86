mod observation;
mod series;
mod trend;

pub use observation::Observation;
pub use series::{SeriesBar, SeriesResult};
pub use trend::{Direction, Trend};
