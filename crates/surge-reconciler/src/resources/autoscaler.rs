use surge_state::{
    HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec, ObjectMeta, OwnerReference,
    PodAutoscaler, PodAutoscalerSpec, PodAutoscalerStatus, Resource, Revision,
};

use super::{child_meta, names};

/// Autoscaler descriptor targeting the revision's deployment, with
/// defaults applied.
pub fn make_pod_autoscaler(rev: &Revision) -> PodAutoscaler {
    let mut pa = PodAutoscaler {
        meta: child_meta(rev, names::pod_autoscaler(rev)),
        spec: PodAutoscalerSpec {
            scale_target: names::deployment(rev),
            service_name: names::service(rev),
            container_concurrency: rev.spec.container_concurrency,
            ..PodAutoscalerSpec::default()
        },
        status: PodAutoscalerStatus::default(),
    };
    pa.set_defaults();
    pa
}

/// HorizontalPodAutoscaler standing in for an HPA-class autoscaler.
///
/// An unset max scale leaves the HPA unbounded above; a min scale of
/// zero is left for the HPA to default.
pub fn make_hpa(pa: &PodAutoscaler) -> HorizontalPodAutoscaler {
    let (min, max) = pa.scale_bounds();
    HorizontalPodAutoscaler {
        meta: ObjectMeta {
            labels: pa.meta.labels.clone(),
            annotations: pa.meta.annotations.clone(),
            owner: Some(OwnerReference {
                kind: PodAutoscaler::KIND.to_string(),
                name: pa.meta.name.clone(),
                uid: pa.meta.uid.clone(),
                controller: true,
            }),
            ..ObjectMeta::new(&pa.meta.namespace, &pa.meta.name)
        },
        spec: HorizontalPodAutoscalerSpec {
            scale_target: pa.spec.scale_target.clone(),
            min_replicas: (min > 0).then_some(min),
            max_replicas: if max == 0 { i32::MAX } else { max },
            target_cpu_utilization_percentage: pa.target(),
        },
    }
}

#[cfg(test)]
mod tests {
    use surge_state::{CLASS_ANNOTATION, HPA_CLASS, KPA_CLASS, MAX_SCALE_ANNOTATION, TARGET_ANNOTATION};

    use super::*;

    fn revision() -> Revision {
        let mut rev = Revision::new("foo", "bar", "busybox");
        rev.meta.uid = "test-uid".into();
        rev
    }

    #[test]
    fn pod_autoscaler_is_defaulted_to_kpa() {
        let pa = make_pod_autoscaler(&revision());
        assert_eq!(pa.meta.name, "bar");
        assert_eq!(pa.spec.scale_target, "bar-deployment");
        assert_eq!(pa.class(), KPA_CLASS);
    }

    #[test]
    fn revision_class_annotation_flows_to_pod_autoscaler() {
        let mut rev = revision();
        rev.meta
            .annotations
            .insert(CLASS_ANNOTATION.into(), HPA_CLASS.into());
        assert_eq!(make_pod_autoscaler(&rev).class(), HPA_CLASS);
    }

    #[test]
    fn hpa_mirrors_pod_autoscaler() {
        let mut pa = make_pod_autoscaler(&revision());
        pa.meta.uid = "pa-uid".into();

        let hpa = make_hpa(&pa);
        assert_eq!(hpa.meta.name, "bar");
        assert_eq!(hpa.meta.labels, pa.meta.labels);
        assert_eq!(hpa.meta.owner.as_ref().unwrap().uid, "pa-uid");
        assert_eq!(hpa.spec.scale_target, "bar-deployment");
        assert_eq!(hpa.spec.min_replicas, None);
        assert_eq!(hpa.spec.max_replicas, i32::MAX);
        assert_eq!(hpa.spec.target_cpu_utilization_percentage, None);

        pa.meta
            .annotations
            .insert(TARGET_ANNOTATION.into(), "50".into());
        pa.meta
            .annotations
            .insert(MAX_SCALE_ANNOTATION.into(), "10".into());
        let hpa = make_hpa(&pa);
        assert_eq!(hpa.spec.max_replicas, 10);
        assert_eq!(hpa.spec.target_cpu_utilization_percentage, Some(50));
    }
}
