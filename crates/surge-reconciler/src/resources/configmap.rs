use std::collections::BTreeMap;

use surge_state::{ConfigMap, Revision};

use super::{child_meta, names};
use crate::config::ObservabilityConfig;

pub const FLUENTD_CONFIG_KEY: &str = "varlog.conf";

const FLUENTD_SOURCE: &str = r#"<source>
  @type tail
  path /var/log/revisions/**/*.*
  pos_file /var/log/varlog.log.pos
  tag raw.*
  format none
  read_from_head true
</source>
"#;

/// Fluentd config shipped to the log-collection sidecar.
pub fn make_fluentd_config_map(rev: &Revision, config: &ObservabilityConfig) -> ConfigMap {
    let conf = format!("{FLUENTD_SOURCE}{}", config.fluentd_sidecar_output_config);
    ConfigMap {
        meta: child_meta(rev, names::fluentd_config_map(rev)),
        data: BTreeMap::from([(FLUENTD_CONFIG_KEY.to_string(), conf)]),
    }
}
