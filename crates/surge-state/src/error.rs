//! Error types for the Surge object store.

use thiserror::Error;

/// Result type alias for object store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during object store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: &'static str, key: String },

    #[error("conflict writing {kind} {key}: expected version {expected}, found {found}")]
    Conflict {
        kind: &'static str,
        key: String,
        expected: u64,
        found: u64,
    },
}

impl StateError {
    /// Whether retrying the same call later can succeed.
    ///
    /// `AlreadyExists` counts as transient: a create only fails that way
    /// when the caller's view lagged behind the store, and the next pass
    /// observes the object instead of creating it.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StateError::Transaction(_)
                | StateError::Read(_)
                | StateError::Write(_)
                | StateError::Conflict { .. }
                | StateError::AlreadyExists { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_is_retryable() {
        let err = StateError::Conflict {
            kind: "Revision",
            key: "default/rev".to_string(),
            expected: 1,
            found: 2,
        };
        assert!(err.is_retryable());
        assert!(err.to_string().contains("default/rev"));
    }

    #[test]
    fn decode_failures_are_permanent() {
        assert!(!StateError::Deserialize("bad json".to_string()).is_retryable());
        assert!(!StateError::Serialize("bad value".to_string()).is_retryable());
        assert!(
            !StateError::NotFound {
                kind: "Service",
                key: "default/x".to_string()
            }
            .is_retryable()
        );
    }
}
