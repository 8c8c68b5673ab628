//! Database row mappings.

pub mod family_member;
pub mod geofence;
pub mod geofence_event;
pub mod latest_position;

pub use family_member::FamilyMemberRow;
pub use geofence::GeofenceRow;
pub use geofence_event::GeofenceEventRow;
pub use latest_position::LatestPositionRow;
