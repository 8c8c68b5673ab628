//! Significant-change sample filter.
//!
//! Pure decision function deciding whether a raw fix is worth processing
//! further. The caller updates its notion of "previous accepted" only when
//! the filter accepts.

use chrono::{DateTime, Duration, Utc};

use domain::models::location::LocationSample;

use crate::geometry::haversine_distance_meters;

/// Thresholds for the significance filter.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Minimum great-circle distance from the previous accepted sample.
    pub min_distance_meters: f64,
    /// Minimum elapsed time since the previous accepted sample.
    pub min_interval_secs: i64,
    /// Samples with worse reported accuracy are dropped.
    pub max_accuracy_meters: f64,
    /// Samples captured further in the past than this are dropped.
    pub max_staleness_secs: i64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_distance_meters: 100.0,
            min_interval_secs: 30,
            max_accuracy_meters: 100.0,
            max_staleness_secs: 30,
        }
    }
}

/// Why a sample was dropped. Rejection is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Captured too far in the past relative to ingestion time.
    Stale,
    /// Reported accuracy above the sanity bound.
    Inaccurate,
    /// Neither the distance nor the interval threshold was met.
    BelowThresholds,
}

impl RejectReason {
    /// Metric label for this reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Stale => "stale",
            RejectReason::Inaccurate => "inaccurate",
            RejectReason::BelowThresholds => "below_thresholds",
        }
    }
}

/// Significant-change filter.
pub struct SampleFilter {
    config: FilterConfig,
}

impl SampleFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Decides whether `candidate` should be processed further.
    ///
    /// `now` is the ingestion time, used for the staleness bound. The first
    /// sample for a subject (no `previous`) is accepted unconditionally,
    /// provided it passes the sanity checks.
    pub fn accept(
        &self,
        previous: Option<&LocationSample>,
        candidate: &LocationSample,
        now: DateTime<Utc>,
    ) -> Result<(), RejectReason> {
        if candidate.accuracy_meters > self.config.max_accuracy_meters {
            return Err(RejectReason::Inaccurate);
        }

        if now - candidate.captured_at > Duration::seconds(self.config.max_staleness_secs) {
            return Err(RejectReason::Stale);
        }

        let previous = match previous {
            None => return Ok(()),
            Some(p) => p,
        };

        let distance = haversine_distance_meters(
            previous.latitude,
            previous.longitude,
            candidate.latitude,
            candidate.longitude,
        );
        if distance >= self.config.min_distance_meters {
            return Ok(());
        }

        let elapsed = candidate.captured_at - previous.captured_at;
        if elapsed >= Duration::seconds(self.config.min_interval_secs) {
            return Ok(());
        }

        Err(RejectReason::BelowThresholds)
    }
}
