//! Reconciler for HPA-class PodAutoscalers.
//!
//! A PodAutoscaler annotated with the HPA class is served by a
//! HorizontalPodAutoscaler of the same name instead of the plugin:
//!
//! ```text
//!   PodAutoscaler absent or not HPA-class ─► delete HPA (if any)
//!   PodAutoscaler HPA-class                ─► sync HPA ─► mark Active
//! ```
//!
//! The PodAutoscaler status is written only when it changed.

use std::collections::BTreeSet;
use std::sync::Arc;

use surge_state::{
    HorizontalPodAutoscaler, PodAutoscaler, PodAutoscalerCondition, HPA_CLASS,
};
use tracing::{info, warn};

use crate::client::ObjectClient;
use crate::controller::Reconciler;
use crate::error::{ChildFailure, ReconcileError, ReconcileResult, Verb};
use crate::key::split_key;
use crate::resources::make_hpa;
use crate::revision::{epoch_secs, Clock};
use crate::sync::{reconcile_child, HpaSync, Synchronizer};

pub struct HpaReconciler<C> {
    client: Arc<C>,
    clock: Clock,
}

impl<C: ObjectClient> HpaReconciler<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            clock: Arc::new(epoch_secs),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Reconcile the PodAutoscaler named by a `namespace/name` key.
    pub fn reconcile(&self, key: &str) -> ReconcileResult<()> {
        let (namespace, name) = split_key(key)?;
        let observed = self.client.get::<PodAutoscaler>(namespace, name)?;
        let Some(original) = observed.filter(|pa| pa.class() == HPA_CLASS) else {
            return self.delete_hpa(namespace, name);
        };

        let now = (self.clock)();
        let mut pa = original.clone();
        pa.status.conditions.initialize(now);

        let outcome = reconcile_child::<HpaSync, _>(self.client.as_ref(), make_hpa(&pa));
        if outcome.object().is_some() {
            pa.status.conditions.mark_true(PodAutoscalerCondition::Active, now);
        }
        pa.status.conditions.refresh_ready(now);
        let failure = outcome.into_failure(HpaSync::KIND);

        if pa.status != original.status {
            if let Err(source) = self.client.update(&pa) {
                return Err(ReconcileError::StatusUpdate {
                    source,
                    children: failure.into_iter().collect(),
                });
            }
            info!(key, "pod autoscaler status updated");
        }

        match failure {
            Some(f) => {
                warn!(key, verb = %f.verb, error = %f.error, "horizontal pod autoscaler sync failed");
                Err(ReconcileError::Children(vec![f]))
            }
            None => Ok(()),
        }
    }

    fn delete_hpa(&self, namespace: &str, name: &str) -> ReconcileResult<()> {
        match self.client.delete::<HorizontalPodAutoscaler>(namespace, name) {
            Ok(existed) => {
                if existed {
                    info!(namespace, name, "deleted horizontal pod autoscaler");
                }
                Ok(())
            }
            Err(error) => Err(ReconcileError::Children(vec![ChildFailure {
                kind: HpaSync::KIND,
                verb: Verb::Delete,
                error,
            }])),
        }
    }
}

impl<C: ObjectClient + 'static> Reconciler for HpaReconciler<C> {
    const NAME: &'static str = "hpa";

    /// Every PodAutoscaler plus every HPA, so HPAs left behind by a
    /// deleted PodAutoscaler are collected.
    fn keys(&self) -> ReconcileResult<Vec<String>> {
        let autoscalers: Vec<PodAutoscaler> = self.client.list()?;
        let hpas: Vec<HorizontalPodAutoscaler> = self.client.list()?;
        let keys: BTreeSet<String> = autoscalers
            .iter()
            .map(|pa| pa.meta.key())
            .chain(hpas.iter().map(|hpa| hpa.meta.key()))
            .collect();
        Ok(keys.into_iter().collect())
    }

    fn reconcile(&self, key: &str) -> ReconcileResult<()> {
        HpaReconciler::reconcile(self, key)
    }
}
