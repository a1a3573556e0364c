//! Child object names, derived from the revision name.

use surge_state::Revision;

pub fn deployment(rev: &Revision) -> String {
    format!("{}-deployment", rev.meta.name)
}

pub fn service(rev: &Revision) -> String {
    format!("{}-service", rev.meta.name)
}

pub fn pod_autoscaler(rev: &Revision) -> String {
    rev.meta.name.clone()
}

pub fn image_cache(rev: &Revision) -> String {
    format!("{}-cache", rev.meta.name)
}

pub fn fluentd_config_map(rev: &Revision) -> String {
    format!("{}-fluentd", rev.meta.name)
}
