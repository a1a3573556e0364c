//! Error types for the revision reconciler.

use std::fmt;

use surge_state::StateError;
use thiserror::Error;

/// Result type alias for reconcile operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Child object kinds a reconcile pass touches, in sync order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildKind {
    PodAutoscaler,
    Deployment,
    Image,
    ConfigMap,
    Service,
    /// Observed only, never written.
    Endpoints,
    /// Written by the HPA-class autoscaler reconciler.
    HorizontalPodAutoscaler,
}

impl ChildKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChildKind::PodAutoscaler => "PodAutoscaler",
            ChildKind::Deployment => "Deployment",
            ChildKind::Image => "Image",
            ChildKind::ConfigMap => "ConfigMap",
            ChildKind::Service => "Service",
            ChildKind::Endpoints => "Endpoints",
            ChildKind::HorizontalPodAutoscaler => "HorizontalPodAutoscaler",
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verb::Get => "get",
            Verb::Create => "create",
            Verb::Update => "update",
            Verb::Delete => "delete",
        })
    }
}

/// One child kind that did not converge during a pass.
#[derive(Debug)]
pub struct ChildFailure {
    pub kind: ChildKind,
    pub verb: Verb,
    pub error: StateError,
}

impl fmt::Display for ChildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.verb, self.kind, self.error)
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Not of the form `namespace/name`. Never retried.
    #[error("invalid resource key: {0:?}")]
    InvalidKey(String),

    #[error("store error: {0}")]
    Store(#[from] StateError),

    /// The referenced build doesn't exist yet.
    #[error("build {namespace}/{name} not found")]
    BuildNotFound { namespace: String, name: String },

    #[error("{} child object(s) failed to converge: {}", .0.len(), join(.0))]
    Children(Vec<ChildFailure>),

    #[error("failed to update revision status: {source}")]
    StatusUpdate {
        source: StateError,
        children: Vec<ChildFailure>,
    },
}

impl ReconcileError {
    /// Whether a work queue should requeue the key with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::InvalidKey(_) => false,
            ReconcileError::Store(e) => e.is_retryable(),
            ReconcileError::BuildNotFound { .. } => true,
            ReconcileError::Children(failures) => failures.iter().any(|f| f.error.is_retryable()),
            ReconcileError::StatusUpdate { source, children } => {
                source.is_retryable() || children.iter().any(|f| f.error.is_retryable())
            }
        }
    }
}

fn join(failures: &[ChildFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
