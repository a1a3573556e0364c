use surge_state::{
    Container, ContainerPort, Deployment, DeploymentSpec, DeploymentStatus, EnvVar, PodTemplate,
    Revision, Volume, VolumeMount, VolumeSource,
};

use super::{child_meta, make_labels, make_selector, names};
use crate::config::ReconcilerConfig;

pub const USER_CONTAINER_NAME: &str = "user-container";
pub const QUEUE_CONTAINER_NAME: &str = "queue-proxy";
pub const FLUENTD_CONTAINER_NAME: &str = "fluentd-proxy";

/// Port the queue proxy accepts traffic on.
pub const QUEUE_PORT: u16 = 8012;

pub const OUTBOUND_IP_RANGES_ANNOTATION: &str = "traffic.sidecar.istio.io/includeOutboundIPRanges";

const VARLOG_VOLUME: &str = "varlog";
const FLUENTD_CONFIG_VOLUME: &str = "fluentd-config";

/// Deployment running the user container behind the queue proxy, plus
/// the fluentd sidecar when var-log collection is enabled.
pub fn make_deployment(rev: &Revision, config: &ReconcilerConfig) -> Deployment {
    let var_log = config.observability.enable_var_log_collection;

    let mut containers = vec![user_container(rev, config), queue_container(rev, config)];
    let mut volumes = vec![Volume {
        name: VARLOG_VOLUME.to_string(),
        source: VolumeSource::EmptyDir,
    }];
    if var_log {
        containers.push(fluentd_container(rev, config));
        volumes.push(Volume {
            name: FLUENTD_CONFIG_VOLUME.to_string(),
            source: VolumeSource::ConfigMap {
                name: names::fluentd_config_map(rev),
            },
        });
    }

    let mut annotations = rev.meta.annotations.clone();
    if !config.network.istio_outbound_ip_ranges.is_empty() {
        annotations.insert(
            OUTBOUND_IP_RANGES_ANNOTATION.to_string(),
            config.network.istio_outbound_ip_ranges.clone(),
        );
    }

    Deployment {
        meta: child_meta(rev, names::deployment(rev)),
        spec: DeploymentSpec {
            replicas: 1,
            selector: make_selector(rev),
            template: PodTemplate {
                labels: make_labels(rev),
                annotations,
                service_account_name: rev.spec.service_account_name.clone(),
                containers,
                volumes,
            },
            progress_deadline_secs: config.deployment.progress_deadline_secs,
        },
        status: DeploymentStatus::default(),
    }
}

fn user_container(rev: &Revision, config: &ReconcilerConfig) -> Container {
    let port = config.deployment.user_port;
    let mut env: Vec<EnvVar> = rev
        .spec
        .env
        .iter()
        .map(|(name, value)| env_var(name, value))
        .collect();
    env.push(env_var("PORT", &port.to_string()));

    Container {
        name: USER_CONTAINER_NAME.to_string(),
        image: rev.spec.image.clone(),
        args: Vec::new(),
        env,
        ports: vec![ContainerPort {
            name: "user-port".to_string(),
            container_port: port,
        }],
        volume_mounts: vec![VolumeMount {
            name: VARLOG_VOLUME.to_string(),
            mount_path: "/var/log".to_string(),
            read_only: false,
        }],
    }
}

fn queue_container(rev: &Revision, config: &ReconcilerConfig) -> Container {
    Container {
        name: QUEUE_CONTAINER_NAME.to_string(),
        image: config.deployment.queue_sidecar_image.clone(),
        args: Vec::new(),
        env: vec![
            env_var("SERVING_NAMESPACE", &rev.meta.namespace),
            env_var("SERVING_REVISION", &rev.meta.name),
            env_var(
                "CONTAINER_CONCURRENCY",
                &rev.spec.container_concurrency.to_string(),
            ),
            env_var("USER_PORT", &config.deployment.user_port.to_string()),
        ],
        ports: vec![ContainerPort {
            name: "queue-port".to_string(),
            container_port: QUEUE_PORT,
        }],
        volume_mounts: Vec::new(),
    }
}

fn fluentd_container(rev: &Revision, config: &ReconcilerConfig) -> Container {
    Container {
        name: FLUENTD_CONTAINER_NAME.to_string(),
        image: config.observability.fluentd_sidecar_image.clone(),
        args: Vec::new(),
        env: vec![env_var("FLUENTD_ARGS", "--no-supervisor -q")],
        ports: Vec::new(),
        volume_mounts: vec![
            VolumeMount {
                name: VARLOG_VOLUME.to_string(),
                mount_path: format!(
                    "/var/log/revisions/{}/{}/{}",
                    rev.meta.namespace, rev.meta.name, USER_CONTAINER_NAME
                ),
                read_only: true,
            },
            VolumeMount {
                name: FLUENTD_CONFIG_VOLUME.to_string(),
                mount_path: "/etc/fluent/config.d".to_string(),
                read_only: true,
            },
        ],
    }
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: value.to_string(),
    }
}
