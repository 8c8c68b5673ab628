//! Periodic containment re-evaluation job.
//!
//! Re-derives containment for every subject from its last accepted sample.
//! Containment state already reflects the last known transition, so a quiet
//! interval produces no events; the run surfaces boundary edits and keeps
//! `last_evaluated_at` from going indefinitely stale when no samples
//! arrive.

use std::sync::Arc;

use tracing::info;

use engine::LocationEngine;

use super::scheduler::{Job, JobFrequency};

/// Background job driving the engine's timer-based re-evaluation path.
pub struct ReevaluateContainmentJob {
    engine: Arc<LocationEngine>,
    interval_minutes: u64,
}

impl ReevaluateContainmentJob {
    pub fn new(engine: Arc<LocationEngine>, interval_minutes: u64) -> Self {
        Self {
            engine,
            interval_minutes,
        }
    }
}

#[async_trait::async_trait]
impl Job for ReevaluateContainmentJob {
    fn name(&self) -> &'static str {
        "reevaluate_containment"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.interval_minutes)
    }

    async fn execute(&self) -> Result<(), String> {
        let emitted = self
            .engine
            .reevaluate_all()
            .await
            .map_err(|e| format!("Re-evaluation failed: {e}"))?;

        if emitted > 0 {
            info!(emitted, "Re-evaluation emitted transitions for edited boundaries");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_frequency() {
        let freq = JobFrequency::Minutes(15);
        assert_eq!(freq.duration(), std::time::Duration::from_secs(900));
    }
}
