//! surge-state — embedded object store and condition model for Surge.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for revisions and the child objects reconciled on their behalf
//! (deployments, services, images, config maps, pod autoscalers).
//!
//! # Architecture
//!
//! ```text
//!   Resource (trait) ──► StateStore::{get,list,create,update,delete}
//!        │                        │
//!        │                        ▼
//!        │                 one redb table per kind
//!        │                 key = "{namespace}/{name}"
//!        ▼
//!   ConditionSet<T>  ── typed conditions + derived Ready
//! ```
//!
//! All objects are JSON-serialized into redb's `&[u8]` value columns.
//! Every write bumps `resource_version`; stale updates are rejected.
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across tasks and worker threads.

pub mod conditions;
pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use conditions::{
    Condition, ConditionKind, ConditionSet, ConditionStatus, PodAutoscalerCondition,
    RevisionCondition,
};
pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
