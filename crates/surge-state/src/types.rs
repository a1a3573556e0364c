//! Domain types for the Surge object store.
//!
//! A `Revision` is the owning object; the reconciler drives a set of child
//! objects (autoscaler descriptor, deployment, image cache, log config,
//! service) from its spec. `Endpoints` and `Build` are observed inputs
//! written by other controllers. Every type is JSON-serializable for
//! storage in redb tables.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::conditions::{Condition, ConditionSet, PodAutoscalerCondition, RevisionCondition};
use crate::tables::{self, ObjectTable};

/// Label and annotation maps. Ordered so serialized objects are stable.
pub type Labels = BTreeMap<String, String>;

// ── Metadata ───────────────────────────────────────────────────────

/// Identity and bookkeeping shared by every object kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub namespace: String,
    pub name: String,
    /// Assigned by the store on create when empty.
    #[serde(default)]
    pub uid: String,
    /// Bumped by the store on every successful write.
    #[serde(default)]
    pub resource_version: u64,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub annotations: Labels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerReference>,
}

impl ObjectMeta {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Composite `{namespace}/{name}` key.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Points a child object at the object that controls it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
    pub uid: String,
    pub controller: bool,
}

/// An object kind the store knows how to persist.
pub trait Resource: Serialize + DeserializeOwned + Clone + std::fmt::Debug + Send + Sync + 'static {
    const KIND: &'static str;
    const TABLE: ObjectTable;

    fn meta(&self) -> &ObjectMeta;
    fn meta_mut(&mut self) -> &mut ObjectMeta;
}

macro_rules! impl_resource {
    ($ty:ty, $kind:literal, $table:expr) => {
        impl Resource for $ty {
            const KIND: &'static str = $kind;
            const TABLE: ObjectTable = $table;

            fn meta(&self) -> &ObjectMeta {
                &self.meta
            }

            fn meta_mut(&mut self) -> &mut ObjectMeta {
                &mut self.meta
            }
        }
    };
}

// ── Revision ───────────────────────────────────────────────────────

/// The owning object: an immutable snapshot of a workload's code and config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub meta: ObjectMeta,
    pub spec: RevisionSpec,
    #[serde(default)]
    pub status: RevisionStatus,
}

/// Desired intent, set once by whoever creates the revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionSpec {
    /// Container image reference.
    pub image: String,
    /// Name of a build (same namespace) that must succeed before rollout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_ref: Option<String>,
    /// Maximum in-flight requests per container; 0 means unlimited.
    #[serde(default)]
    pub container_concurrency: u32,
    #[serde(default)]
    pub service_account_name: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Observed state; written only by the revision reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionStatus {
    /// Name of the service fronting this revision, once it exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_url: Option<String>,
    #[serde(default)]
    pub conditions: ConditionSet<RevisionCondition>,
}

impl Revision {
    pub fn new(namespace: &str, name: &str, image: &str) -> Self {
        Self {
            meta: ObjectMeta::new(namespace, name),
            spec: RevisionSpec {
                image: image.to_string(),
                ..RevisionSpec::default()
            },
            status: RevisionStatus::default(),
        }
    }
}

impl_resource!(Revision, "Revision", tables::REVISIONS);

// ── Pod template ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodTemplate {
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub annotations: Labels,
    #[serde(default)]
    pub service_account_name: String,
    pub containers: Vec<Container>,
    #[serde(default)]
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
    #[serde(default)]
    pub volume_mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerPort {
    pub name: String,
    pub container_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub name: String,
    pub mount_path: String,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    pub source: VolumeSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VolumeSource {
    EmptyDir,
    ConfigMap { name: String },
}

// ── Deployment ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub meta: ObjectMeta,
    pub spec: DeploymentSpec,
    #[serde(default)]
    pub status: DeploymentStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    /// Owned by the autoscaler once the deployment exists.
    pub replicas: u32,
    pub selector: Labels,
    pub template: PodTemplate,
    pub progress_deadline_secs: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStatus {
    #[serde(default)]
    pub replicas: u32,
    #[serde(default)]
    pub ready_replicas: u32,
    #[serde(default)]
    pub conditions: Vec<DeploymentCondition>,
}

/// A condition reported by the cluster on a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentCondition {
    /// e.g. "Progressing", "Available".
    pub kind: String,
    pub status: crate::conditions::ConditionStatus,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

impl_resource!(Deployment, "Deployment", tables::DEPLOYMENTS);

// ── Service / Endpoints ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub meta: ObjectMeta,
    pub spec: ServiceSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub selector: Labels,
    pub ports: Vec<ServicePort>,
    /// Assigned by the cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePort {
    pub name: String,
    pub port: u16,
    pub target_port: u16,
}

impl_resource!(Service, "Service", tables::SERVICES);

/// Backends behind a service, named after the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoints {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub subsets: Vec<EndpointSubset>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSubset {
    /// Ready backend addresses (ip:port).
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub not_ready_addresses: Vec<String>,
}

impl Endpoints {
    /// At least one backend is ready to serve.
    pub fn is_ready(&self) -> bool {
        self.subsets.iter().any(|s| !s.addresses.is_empty())
    }
}

impl_resource!(Endpoints, "Endpoints", tables::ENDPOINTS);

// ── Image cache / ConfigMap ────────────────────────────────────────

/// Asks nodes to pre-pull an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub meta: ObjectMeta,
    pub spec: ImageSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub image: String,
    #[serde(default)]
    pub service_account_name: String,
}

impl_resource!(Image, "Image", tables::IMAGES);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMap {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

impl_resource!(ConfigMap, "ConfigMap", tables::CONFIG_MAPS);

// ── PodAutoscaler ──────────────────────────────────────────────────

/// Autoscaler descriptor for one revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodAutoscaler {
    pub meta: ObjectMeta,
    pub spec: PodAutoscalerSpec,
    /// Written by the autoscaler.
    #[serde(default)]
    pub status: PodAutoscalerStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodAutoscalerSpec {
    /// Name of the deployment being scaled.
    pub scale_target: String,
    pub service_name: String,
    #[serde(default)]
    pub container_concurrency: u32,
    #[serde(default)]
    pub serving_state: ServingState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServingState {
    #[default]
    Active,
    Reserve,
}

/// Annotation selecting which autoscaler acts on a PodAutoscaler.
pub const CLASS_ANNOTATION: &str = "autoscaling.surge.dev/class";
/// Concurrency-based autoscaling served by the plugin.
pub const KPA_CLASS: &str = "kpa.autoscaling.surge.dev";
/// Delegated to a HorizontalPodAutoscaler.
pub const HPA_CLASS: &str = "hpa.autoscaling.surge.dev";

pub const MIN_SCALE_ANNOTATION: &str = "autoscaling.surge.dev/minScale";
pub const MAX_SCALE_ANNOTATION: &str = "autoscaling.surge.dev/maxScale";
pub const TARGET_ANNOTATION: &str = "autoscaling.surge.dev/target";

impl PodAutoscaler {
    /// Fill in the class annotation when it is missing. Values already
    /// set are kept.
    pub fn set_defaults(&mut self) {
        self.meta
            .annotations
            .entry(CLASS_ANNOTATION.to_string())
            .or_insert_with(|| KPA_CLASS.to_string());
    }

    /// The autoscaler class, KPA when unannotated.
    pub fn class(&self) -> &str {
        self.meta
            .annotations
            .get(CLASS_ANNOTATION)
            .map_or(KPA_CLASS, String::as_str)
    }

    /// `(min, max)` from the scale annotations. Zero means unbounded;
    /// unparseable values count as unset.
    pub fn scale_bounds(&self) -> (i32, i32) {
        (
            self.int_annotation(MIN_SCALE_ANNOTATION).unwrap_or(0),
            self.int_annotation(MAX_SCALE_ANNOTATION).unwrap_or(0),
        )
    }

    pub fn target(&self) -> Option<i32> {
        self.int_annotation(TARGET_ANNOTATION)
    }

    fn int_annotation(&self, key: &str) -> Option<i32> {
        self.meta.annotations.get(key)?.trim().parse().ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodAutoscalerStatus {
    #[serde(default)]
    pub conditions: ConditionSet<PodAutoscalerCondition>,
}

impl_resource!(PodAutoscaler, "PodAutoscaler", tables::POD_AUTOSCALERS);

// ── HorizontalPodAutoscaler ────────────────────────────────────────

/// Resource-utilization autoscaler for HPA-class PodAutoscalers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizontalPodAutoscaler {
    pub meta: ObjectMeta,
    pub spec: HorizontalPodAutoscalerSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizontalPodAutoscalerSpec {
    /// Name of the deployment being scaled.
    pub scale_target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,
    pub max_replicas: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_cpu_utilization_percentage: Option<i32>,
}

impl_resource!(
    HorizontalPodAutoscaler,
    "HorizontalPodAutoscaler",
    tables::HORIZONTAL_POD_AUTOSCALERS
);

// ── Build ──────────────────────────────────────────────────────────

/// An upstream build a revision may wait on. Tracked, never owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub meta: ObjectMeta,
    #[serde(default)]
    pub status: BuildStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStatus {
    /// Absent until the build controller reports progress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub succeeded: Option<Condition>,
}

impl_resource!(Build, "Build", tables::BUILDS);
