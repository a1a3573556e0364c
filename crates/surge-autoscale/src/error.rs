//! Error types for the partition autoscaler registry.

use thiserror::Error;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate create autoscaler event in partition {0}")]
    Duplicate(String),

    #[error("no autoscaler in partition {0}")]
    NotFound(String),

    #[error("{operation} {object} event not supported")]
    Unsupported {
        operation: &'static str,
        object: &'static str,
    },

    #[error("invalid autoscaler config: {0}")]
    Config(String),
}

impl RegistryError {
    /// None of the registry failures heal on their own: a duplicate or
    /// missing partition is a caller bug, and an unchanged bad payload
    /// decodes the same way every time.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
