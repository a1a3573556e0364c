//! Surge revision reconciler.
//!
//! Drives the child objects of each `Revision` toward the state its spec
//! asks for, and folds what it observes back into the revision's
//! conditions.
//!
//! ```text
//!   resync / events ─► WorkQueue ─► worker ─► RevisionReconciler::reconcile(key)
//!                                               │
//!                     resources::make_* ◄───────┤ render desired children
//!                     sync::reconcile_child ◄───┤ create / update / no-op
//!                     ConditionSet ◄────────────┘ fold outcomes, refresh Ready
//! ```
//!
//! # Components
//!
//! - **`revision`** — One reconcile pass per key
//! - **`autoscaling`** — HorizontalPodAutoscalers for HPA-class autoscalers
//! - **`sync`** — Per-kind ownership rules and the create/update/no-op driver
//! - **`resources`** — Pure renderers for desired child objects
//! - **`queue`** / **`controller`** — Deduplicating work queue and worker loop
//! - **`config`** — TOML configuration

pub mod autoscaling;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod key;
pub mod queue;
pub mod resources;
pub mod revision;
pub mod sync;

#[cfg(test)]
mod testing;

pub use client::ObjectClient;
pub use config::ReconcilerConfig;
pub use autoscaling::HpaReconciler;
pub use controller::{Controller, Reconciler};
pub use error::{ChildFailure, ChildKind, ReconcileError, ReconcileResult, Verb};
pub use key::{make_key, split_key};
pub use queue::WorkQueue;
pub use revision::{Clock, RevisionReconciler};
