pub mod collector;
pub mod distribution;
pub mod finalize;
pub mod percentiles;

pub use collector::{Aggregator, TOTAL_LABEL};
pub use distribution::DistBucket;
pub use percentiles::PercentileSet;
