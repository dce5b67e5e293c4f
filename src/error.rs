//! Error types for depot-notifications.

use thiserror::Error;

use crate::model::Coordinate;

#[derive(Debug, Error)]
pub enum Error {
    /// The project id (and coordinate) does not resolve in the project registry.
    #[error("invalid coordinate for project {project_id}: {coordinate}")]
    InvalidCoordinate {
        project_id: String,
        coordinate: Coordinate,
    },

    /// A notification for the same target is already pending.
    #[error("already queued: {0}")]
    AlreadyQueued(String),

    #[error("invalid timestamp {input:?}: {reason}")]
    InvalidTimestamp { input: String, reason: String },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    #[error("not authorised for role {role}")]
    Unauthorised { role: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the caller may treat this as "your request is already in flight".
    pub fn is_already_queued(&self) -> bool {
        matches!(self, Error::AlreadyQueued(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
