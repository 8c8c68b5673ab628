//! Location-sampling and geofence-transition engine.
//!
//! Turns a noisy, battery-constrained stream of raw position fixes into:
//! - a throttled significant-change feed persisted as one latest-position
//!   record per subject, and
//! - a deterministic, exactly-once enter/exit event stream per
//!   (subject, geofence) pair, driving notifications and presence status.
//!
//! The hot path is entirely in memory. Persistence of events and positions
//! and notification delivery are dispatched after the in-memory state
//! transition commits, so a slow sink never stalls sample evaluation.

pub mod directory;
pub mod engine;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod metrics;
pub mod registry;
pub mod store;
pub mod tracker;

pub use directory::{FamilyDirectory, InMemoryFamilyDirectory};
pub use engine::{EngineConfig, IngestReport, LocationEngine};
pub use error::{EngineError, StoreError};
pub use filter::{FilterConfig, RejectReason, SampleFilter};
pub use registry::{GeofenceRegistry, RegistryChange, RegistrySubscription};
pub use store::{
    EventStore, GeofenceStore, LatestPositionStore, StatusAggregator,
};
pub use tracker::{ContainmentTracker, Transition};
