//! Desired-object renderers.
//!
//! Each `make_*` function is a pure function of the revision and the
//! reconciler config. Nothing here reads observed state, so re-rendering
//! never accumulates drift. The image cache is rendered from the desired
//! deployment value rather than from whatever deployment exists.

mod autoscaler;
mod configmap;
mod deployment;
mod image;
pub mod names;
mod service;

pub use autoscaler::{make_hpa, make_pod_autoscaler};
pub use configmap::make_fluentd_config_map;
pub use deployment::make_deployment;
pub use image::make_image_cache;
pub use service::make_service;

use surge_state::{Labels, ObjectMeta, OwnerReference, Revision};

pub const REVISION_LABEL: &str = "surge.dev/revision";
pub const REVISION_UID_LABEL: &str = "surge.dev/revisionUID";

/// Revision labels plus the identifying labels every child carries.
pub fn make_labels(rev: &Revision) -> Labels {
    let mut labels = rev.meta.labels.clone();
    labels.insert(REVISION_LABEL.to_string(), rev.meta.name.clone());
    labels.insert(REVISION_UID_LABEL.to_string(), rev.meta.uid.clone());
    labels
}

/// Selector matching the pods of one revision.
pub fn make_selector(rev: &Revision) -> Labels {
    Labels::from([(REVISION_UID_LABEL.to_string(), rev.meta.uid.clone())])
}

fn owner_ref(rev: &Revision) -> OwnerReference {
    OwnerReference {
        kind: "Revision".to_string(),
        name: rev.meta.name.clone(),
        uid: rev.meta.uid.clone(),
        controller: true,
    }
}

/// Metadata for a child named `name`, owned by `rev`.
fn child_meta(rev: &Revision, name: String) -> ObjectMeta {
    ObjectMeta {
        labels: make_labels(rev),
        annotations: rev.meta.annotations.clone(),
        owner: Some(owner_ref(rev)),
        ..ObjectMeta::new(&rev.meta.namespace, &name)
    }
}
