pub mod criteria;
pub mod pipeline;

pub use criteria::{MaComparison, MovingAverageSpec, ScreenerCriteria, ScreenerRequest};
pub use pipeline::{run, Filter, Screener, VOLUME_ANOMALY_RATIO};
