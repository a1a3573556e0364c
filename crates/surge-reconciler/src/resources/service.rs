use surge_state::{Revision, Service, ServicePort, ServiceSpec};

use super::deployment::QUEUE_PORT;
use super::{child_meta, make_selector, names};

pub const SERVICE_PORT_NAME: &str = "http";
pub const SERVICE_PORT: u16 = 80;

/// Cluster-internal service routing to the revision's queue proxy.
pub fn make_service(rev: &Revision) -> Service {
    Service {
        meta: child_meta(rev, names::service(rev)),
        spec: ServiceSpec {
            selector: make_selector(rev),
            ports: vec![ServicePort {
                name: SERVICE_PORT_NAME.to_string(),
                port: SERVICE_PORT,
                target_port: QUEUE_PORT,
            }],
            cluster_ip: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_targets_queue_proxy() {
        let mut rev = Revision::new("foo", "bar", "busybox");
        rev.meta.uid = "test-uid".into();

        let svc = make_service(&rev);
        assert_eq!(svc.meta.name, "bar-service");
        assert_eq!(svc.meta.namespace, "foo");
        assert_eq!(svc.spec.ports[0].target_port, QUEUE_PORT);
        assert_eq!(
            svc.spec.selector.get(super::super::REVISION_UID_LABEL).map(String::as_str),
            Some("test-uid")
        );
        assert_eq!(svc.meta.owner.as_ref().unwrap().uid, "test-uid");
    }
}
