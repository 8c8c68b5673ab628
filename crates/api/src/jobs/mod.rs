//! Background job scheduler and job implementations.

mod pool_metrics;
mod reevaluate;
mod scheduler;

pub use pool_metrics::PoolMetricsJob;
pub use reevaluate::ReevaluateContainmentJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
