//! Engine error taxonomy.
//!
//! Command errors (authorization, geometry) are returned synchronously to the
//! caller. Downstream persistence and notification errors are handled
//! asynchronously and never roll back a committed state transition.

use thiserror::Error;

/// Errors surfaced by storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A persisted record failed to decode. Surfaced as a typed error and
    /// counted; never silently dropped.
    #[error("malformed persisted record: {field} = {value:?}")]
    Decode { field: &'static str, value: String },
}

/// Errors surfaced by engine commands.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The engine has been shut down and no longer ingests samples.
    #[error("engine is suspended")]
    Suspended,

    #[error(transparent)]
    Store(#[from] StoreError),
}
