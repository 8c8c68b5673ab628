//! Domain models.

pub mod containment;
pub mod family;
pub mod geofence;
pub mod geofence_event;
pub mod location;

pub use containment::{Containment, ContainmentState};
pub use family::{Family, FamilyMember, MemberRole};
pub use geofence::Geofence;
pub use geofence_event::{GeofenceEvent, GeofenceTransition, SubjectStatus};
pub use location::{LatestPosition, LocationSample};
