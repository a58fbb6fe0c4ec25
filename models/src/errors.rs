// models/src/errors.rs

use std::io;
pub use thiserror::Error;
use serde_json::Error as SerdeJsonError;

/// Every failure a clinic operation can report. The HTTP layer maps each
/// variant onto exactly one status code.
#[derive(Debug, Error)]
pub enum ClinicError {
    /// Malformed or missing client input, including dangling references
    /// supplied by the client (unknown department, specialty, doctor).
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A resource addressed directly (by path or by the caller's identity) is missing.
    #[error("{0}")]
    NotFound(String),

    /// Unique-key violation. Safe for the client to retry.
    #[error("{0}")]
    Conflict(String),

    /// A collaborator the request needs is not configured or not reachable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("An internal error occurred: {0}")]
    Internal(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ClinicResult<T> = std::result::Result<T, ClinicError>;

impl ClinicError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClinicError::Validation(message.into())
    }

    /// True for the error classes that come from bad client input rather than
    /// from a fault on our side.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ClinicError::Validation(_)
                | ClinicError::Unauthenticated(_)
                | ClinicError::Forbidden(_)
                | ClinicError::NotFound(_)
                | ClinicError::Conflict(_)
        )
    }
}

impl From<SerdeJsonError> for ClinicError {
    fn from(err: SerdeJsonError) -> Self {
        ClinicError::Serialization(err.to_string())
    }
}

#[cfg(feature = "sled-errors")]
impl From<sled::Error> for ClinicError {
    fn from(err: sled::Error) -> Self {
        ClinicError::Storage(err.to_string())
    }
}
