//! PostgreSQL implementations of the engine storage traits.

pub mod family_directory;
pub mod geofence;
pub mod geofence_event;
pub mod latest_position;

pub use family_directory::PostgresFamilyDirectory;
pub use geofence::PostgresGeofenceStore;
pub use geofence_event::PostgresEventStore;
pub use latest_position::PostgresPositionStore;
