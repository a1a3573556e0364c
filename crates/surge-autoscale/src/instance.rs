//! Per-partition autoscaler state.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::{AutoscalerSpec, RegistryConfig};
use crate::decision::{DecisionFunction, ScaleDecision, Snapshot};
use crate::error::RegistryResult;
use crate::event::{EventKind, Pod, PodPhase};
use crate::stats::{Stat, StatWindow};

/// State owned by one registry entry. Never shared across partitions.
#[derive(Debug)]
pub struct AutoscalerInstance {
    spec: AutoscalerSpec,
    pods: BTreeMap<String, PodPhase>,
    window: StatWindow,
}

impl AutoscalerInstance {
    /// Build an instance from a YAML config payload.
    pub fn from_yaml(yaml: &str, config: &RegistryConfig) -> RegistryResult<Self> {
        let spec = AutoscalerSpec::from_yaml(yaml)?;
        Ok(Self::new(spec, config))
    }

    pub fn new(spec: AutoscalerSpec, config: &RegistryConfig) -> Self {
        let window = StatWindow::new(spec.stable_window(config));
        Self {
            spec,
            pods: BTreeMap::new(),
            window,
        }
    }

    pub fn spec(&self) -> &AutoscalerSpec {
        &self.spec
    }

    /// Pods currently in the `Running` phase.
    pub fn ready_pods(&self) -> u32 {
        let n = self
            .pods
            .values()
            .filter(|p| **p == PodPhase::Running)
            .count();
        u32::try_from(n).unwrap_or(u32::MAX)
    }

    pub fn tracked_pods(&self) -> usize {
        self.pods.len()
    }

    pub fn stat_count(&self) -> usize {
        self.window.len()
    }

    /// Track a pod lifecycle change.
    pub fn observe_pod(&mut self, kind: EventKind, pod: Pod) {
        match kind {
            EventKind::Create | EventKind::Update => {
                self.pods.insert(pod.name, pod.phase);
            }
            EventKind::Delete => {
                self.window.forget_pod(&pod.name);
                self.pods.remove(&pod.name);
            }
        }
    }

    pub fn record(&mut self, stats: impl IntoIterator<Item = Stat>) {
        for stat in stats {
            self.window.record(stat);
        }
    }

    /// Replica recommendation as of `time`.
    ///
    /// `NoChange` from the decision function is reported as the current
    /// ready pod count.
    pub fn recommend(
        &self,
        partition: &str,
        time: i64,
        decider: &dyn DecisionFunction,
    ) -> u32 {
        let snapshot = Snapshot {
            partition,
            time,
            averages: self.window.averages(time),
            ready_pods: self.ready_pods(),
            spec: &self.spec,
        };
        match decider.decide(&snapshot) {
            ScaleDecision::ScaleTo(n) => n,
            ScaleDecision::NoChange => {
                debug!(partition, ready = snapshot.ready_pods, "no scaling change");
                snapshot.ready_pods
            }
        }
    }
}
