//! PartitionRegistry — one autoscaler instance per traffic partition.
//!
//! # Locking
//!
//! ```text
//!   autoscalers: RwLock<HashMap<partition, Arc<Mutex<AutoscalerInstance>>>>
//!        │                                        │
//!        │ write: create / delete                 │ per-partition, FIFO:
//!        │ read:  lookup for event / stat / scale │ pod events, stats, scale
//! ```
//!
//! The map lock guards only the map structure. Once a lookup has cloned
//! the entry's `Arc`, the map lock is released and the instance's own
//! mutex serializes work on that partition in arrival order. Different
//! partitions never contend on anything but the brief map lookup.
//!
//! An instance removed by `delete` may still finish one in-flight stat or
//! scale call through an `Arc` cloned before the removal; its result is
//! discarded along with the instance.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::RegistryConfig;
use crate::decision::{ConcurrencyDecider, DecisionFunction};
use crate::error::{RegistryError, RegistryResult};
use crate::event::{Event, EventKind, Object, Pod};
use crate::instance::AutoscalerInstance;
use crate::stats::Stat;

type Slot = Arc<Mutex<AutoscalerInstance>>;

pub struct PartitionRegistry {
    autoscalers: RwLock<HashMap<String, Slot>>,
    decider: Arc<dyn DecisionFunction>,
    config: RegistryConfig,
}

impl Default for PartitionRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl PartitionRegistry {
    /// Create an empty registry using the default decision function.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            autoscalers: RwLock::new(HashMap::new()),
            decider: Arc::new(ConcurrencyDecider),
            config,
        }
    }

    /// Replace the decision function.
    pub fn with_decider(mut self, decider: Arc<dyn DecisionFunction>) -> Self {
        self.decider = decider;
        self
    }

    /// Create the autoscaler for `partition` from a YAML config payload.
    ///
    /// A duplicate partition is reported before the payload is decoded.
    pub async fn create(&self, partition: &str, yaml: &str) -> RegistryResult<()> {
        let mut autoscalers = self.autoscalers.write().await;
        if autoscalers.contains_key(partition) {
            return Err(RegistryError::Duplicate(partition.to_string()));
        }
        let instance = AutoscalerInstance::from_yaml(yaml, &self.config)?;
        autoscalers.insert(partition.to_string(), Arc::new(Mutex::new(instance)));
        info!(partition = %partition, "created autoscaler");
        Ok(())
    }

    /// Remove and discard the autoscaler for `partition`.
    pub async fn delete(&self, partition: &str) -> RegistryResult<()> {
        let mut autoscalers = self.autoscalers.write().await;
        if autoscalers.remove(partition).is_none() {
            return Err(RegistryError::NotFound(partition.to_string()));
        }
        info!(partition = %partition, "deleted autoscaler");
        Ok(())
    }

    /// Dispatch one lifecycle event.
    pub async fn apply_event(&self, partition: &str, event: Event) -> RegistryResult<()> {
        match (event.kind, event.object) {
            (EventKind::Create, Object::Autoscaler { yaml }) => self.create(partition, &yaml).await,
            (EventKind::Update, Object::Autoscaler { .. }) => Err(RegistryError::Unsupported {
                operation: "update",
                object: "autoscaler",
            }),
            (EventKind::Delete, Object::Autoscaler { .. }) => self.delete(partition).await,
            (kind, Object::Pod(pod)) => {
                self.observe_pod(partition, kind, pod).await;
                Ok(())
            }
            (kind, Object::Unrecognized) => {
                debug!(
                    partition = %partition,
                    event = kind.as_str(),
                    "ignoring event for unrecognized object kind"
                );
                Ok(())
            }
        }
    }

    /// Feed stats into the partition's window. Never fails.
    ///
    /// Stats for a partition with no autoscaler are dropped: delivery can
    /// race creation and deletion.
    pub async fn record_stats(&self, partition: &str, stats: Vec<Stat>) {
        let Some(slot) = self.lookup(partition).await else {
            debug!(
                partition = %partition,
                count = stats.len(),
                "dropping stats for unknown partition"
            );
            return;
        };
        let mut instance = slot.lock().await;
        instance.record(stats);
    }

    /// Current replica recommendation for `partition` as of `time`
    /// (unix nanoseconds).
    ///
    /// Fails with `NotFound` when no autoscaler exists: callers must not
    /// ask for a scale before the create event.
    pub async fn scale(&self, partition: &str, time: i64) -> RegistryResult<i32> {
        let slot = self
            .lookup(partition)
            .await
            .ok_or_else(|| RegistryError::NotFound(partition.to_string()))?;
        let instance = slot.lock().await;
        let replicas = instance.recommend(partition, time, self.decider.as_ref());
        Ok(i32::try_from(replicas).unwrap_or(i32::MAX))
    }

    /// Partitions with a live autoscaler, sorted.
    pub async fn partitions(&self) -> Vec<String> {
        let autoscalers = self.autoscalers.read().await;
        let mut names: Vec<String> = autoscalers.keys().cloned().collect();
        names.sort();
        names
    }

    async fn observe_pod(&self, partition: &str, kind: EventKind, pod: Pod) {
        let Some(slot) = self.lookup(partition).await else {
            debug!(
                partition = %partition,
                pod = %pod.name,
                "pod event for unknown partition"
            );
            return;
        };
        let mut instance = slot.lock().await;
        instance.observe_pod(kind, pod);
    }

    async fn lookup(&self, partition: &str) -> Option<Slot> {
        let autoscalers = self.autoscalers.read().await;
        autoscalers.get(partition).cloned()
    }

    #[cfg(test)]
    async fn with_instance<T>(
        &self,
        partition: &str,
        f: impl FnOnce(&AutoscalerInstance) -> T,
    ) -> Option<T> {
        let slot = self.lookup(partition).await?;
        let instance = slot.lock().await;
        Some(f(&instance))
    }
}
