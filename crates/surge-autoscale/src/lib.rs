//! surge-autoscale — per-partition autoscaler registry.
//!
//! The host delivers lifecycle events, stats, and scale queries for
//! traffic partitions. [`PartitionRegistry`] owns one
//! [`AutoscalerInstance`] per partition and serializes work against it;
//! the replica count itself comes from a pluggable [`DecisionFunction`].
//!
//! ```text
//!   Event ──► apply_event ──┬─ CREATE autoscaler ─► create  (Duplicate / Config)
//!                           ├─ UPDATE autoscaler ─► Unsupported
//!                           ├─ DELETE autoscaler ─► delete  (NotFound)
//!                           ├─ pod               ─► instance.observe_pod
//!                           └─ unrecognized      ─► no-op
//!
//!   Stat[] ──► record_stats ─► instance.window      (unknown partition: dropped)
//!   Scale  ──► scale ─► DecisionFunction(snapshot)  (unknown partition: NotFound)
//! ```

pub mod config;
pub mod decision;
pub mod error;
pub mod event;
pub mod instance;
pub mod registry;
pub mod stats;

pub use config::{AutoscalerSpec, RegistryConfig};
pub use decision::{ConcurrencyDecider, DecisionFunction, ScaleDecision, Snapshot};
pub use error::{RegistryError, RegistryResult};
pub use event::{Event, EventKind, Object, Pod, PodPhase};
pub use instance::AutoscalerInstance;
pub use registry::PartitionRegistry;
pub use stats::{MetricType, Stat, StatWindow};
