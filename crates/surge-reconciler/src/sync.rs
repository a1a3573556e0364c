//! Child-resource synchronizers.
//!
//! A [`Synchronizer`] knows which fields of one kind this reconciler owns.
//! [`reconcile_child`] drives the create / patch / no-op decision for a
//! rendered desired object:
//!
//! ```text
//!   observed absent            ─► create(desired)           ─► Created | Error(create)
//!   observed, owned fields ==  ─►                              NoOp
//!   observed, owned fields !=  ─► update(merge(desired, obs)) ─► Updated | Error(update)
//! ```
//!
//! Fields owned by other writers (deployment replicas and status, service
//! cluster IP, autoscaler status) are never compared and are carried over
//! from the observed object on update.

use surge_state::{
    ConfigMap, Deployment, HorizontalPodAutoscaler, Image, PodAutoscaler, Resource, Service,
    StateError,
};
use tracing::{debug, info};

use crate::client::ObjectClient;
use crate::error::{ChildKind, ChildFailure, Verb};

/// Result of syncing one child.
#[derive(Debug)]
pub enum Outcome<R> {
    NoOp(R),
    Created(R),
    Updated(R),
    Error { verb: Verb, error: StateError },
}

impl<R> Outcome<R> {
    /// The child as it now exists, if the sync didn't fail.
    pub fn object(&self) -> Option<&R> {
        match self {
            Outcome::NoOp(obj) | Outcome::Created(obj) | Outcome::Updated(obj) => Some(obj),
            Outcome::Error { .. } => None,
        }
    }

    /// Convert a failed outcome into a [`ChildFailure`] for `kind`.
    pub fn into_failure(self, kind: ChildKind) -> Option<ChildFailure> {
        match self {
            Outcome::Error { verb, error } => Some(ChildFailure { kind, verb, error }),
            _ => None,
        }
    }
}

pub trait Synchronizer {
    type Object: Resource;
    const KIND: ChildKind;

    /// Whether every field this reconciler owns matches.
    fn owned_fields_match(desired: &Self::Object, observed: &Self::Object) -> bool;

    /// `observed` with the owned fields of `desired` written over it.
    fn merge(desired: Self::Object, observed: Self::Object) -> Self::Object;
}

/// Converge one child toward `desired`.
pub fn reconcile_child<S, C>(client: &C, desired: S::Object) -> Outcome<S::Object>
where
    S: Synchronizer,
    C: ObjectClient,
{
    let (namespace, name) = {
        let meta = desired.meta();
        (meta.namespace.clone(), meta.name.clone())
    };

    let observed = match client.get::<S::Object>(&namespace, &name) {
        Ok(observed) => observed,
        Err(error) => {
            return Outcome::Error {
                verb: Verb::Get,
                error,
            };
        }
    };

    match observed {
        None => match client.create(&desired) {
            Ok(created) => {
                info!(kind = %S::KIND, namespace = %namespace, name = %name, "created child");
                Outcome::Created(created)
            }
            Err(error) => Outcome::Error {
                verb: Verb::Create,
                error,
            },
        },
        Some(observed) if S::owned_fields_match(&desired, &observed) => Outcome::NoOp(observed),
        Some(observed) => {
            debug!(kind = %S::KIND, namespace = %namespace, name = %name, "child drifted");
            let merged = S::merge(desired, observed);
            match client.update(&merged) {
                Ok(updated) => {
                    info!(kind = %S::KIND, namespace = %namespace, name = %name, "updated child");
                    Outcome::Updated(updated)
                }
                Err(error) => Outcome::Error {
                    verb: Verb::Update,
                    error,
                },
            }
        }
    }
}

// ── Kinds ──────────────────────────────────────────────────────────

pub struct PodAutoscalerSync;

impl Synchronizer for PodAutoscalerSync {
    type Object = PodAutoscaler;
    const KIND: ChildKind = ChildKind::PodAutoscaler;

    fn owned_fields_match(desired: &PodAutoscaler, observed: &PodAutoscaler) -> bool {
        desired.spec == observed.spec && desired.meta.labels == observed.meta.labels
    }

    fn merge(desired: PodAutoscaler, mut observed: PodAutoscaler) -> PodAutoscaler {
        observed.spec = desired.spec;
        observed.meta.labels = desired.meta.labels;
        observed
    }
}

pub struct DeploymentSync;

impl Synchronizer for DeploymentSync {
    type Object = Deployment;
    const KIND: ChildKind = ChildKind::Deployment;

    fn owned_fields_match(desired: &Deployment, observed: &Deployment) -> bool {
        desired.spec.selector == observed.spec.selector
            && desired.spec.template == observed.spec.template
            && desired.spec.progress_deadline_secs == observed.spec.progress_deadline_secs
            && desired.meta.labels == observed.meta.labels
    }

    fn merge(desired: Deployment, mut observed: Deployment) -> Deployment {
        // Replicas belong to the autoscaler once the deployment exists.
        observed.spec.selector = desired.spec.selector;
        observed.spec.template = desired.spec.template;
        observed.spec.progress_deadline_secs = desired.spec.progress_deadline_secs;
        observed.meta.labels = desired.meta.labels;
        observed
    }
}

pub struct ImageSync;

impl Synchronizer for ImageSync {
    type Object = Image;
    const KIND: ChildKind = ChildKind::Image;

    fn owned_fields_match(desired: &Image, observed: &Image) -> bool {
        desired.spec == observed.spec && desired.meta.labels == observed.meta.labels
    }

    fn merge(desired: Image, mut observed: Image) -> Image {
        observed.spec = desired.spec;
        observed.meta.labels = desired.meta.labels;
        observed
    }
}

pub struct ConfigMapSync;

impl Synchronizer for ConfigMapSync {
    type Object = ConfigMap;
    const KIND: ChildKind = ChildKind::ConfigMap;

    fn owned_fields_match(desired: &ConfigMap, observed: &ConfigMap) -> bool {
        desired.data == observed.data
    }

    fn merge(desired: ConfigMap, mut observed: ConfigMap) -> ConfigMap {
        observed.data = desired.data;
        observed
    }
}

pub struct ServiceSync;

impl Synchronizer for ServiceSync {
    type Object = Service;
    const KIND: ChildKind = ChildKind::Service;

    fn owned_fields_match(desired: &Service, observed: &Service) -> bool {
        desired.spec.selector == observed.spec.selector
            && desired.spec.ports == observed.spec.ports
            && desired.meta.labels == observed.meta.labels
    }

    fn merge(desired: Service, mut observed: Service) -> Service {
        observed.spec.selector = desired.spec.selector;
        observed.spec.ports = desired.spec.ports;
        observed.meta.labels = desired.meta.labels;
        observed
    }
}

pub struct HpaSync;

impl Synchronizer for HpaSync {
    type Object = HorizontalPodAutoscaler;
    const KIND: ChildKind = ChildKind::HorizontalPodAutoscaler;

    fn owned_fields_match(
        desired: &HorizontalPodAutoscaler,
        observed: &HorizontalPodAutoscaler,
    ) -> bool {
        desired.spec == observed.spec
            && desired.meta.labels == observed.meta.labels
            && desired.meta.annotations == observed.meta.annotations
    }

    fn merge(
        desired: HorizontalPodAutoscaler,
        mut observed: HorizontalPodAutoscaler,
    ) -> HorizontalPodAutoscaler {
        observed.spec = desired.spec;
        observed.meta.labels = desired.meta.labels;
        observed.meta.annotations = desired.meta.annotations;
        observed
    }
}
