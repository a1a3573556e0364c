//! Reconciler configuration (TOML).
//!
//! Every field has a default, so an empty file is a valid config.
//!
//! ```toml
//! service_timeout_secs = 300
//!
//! [observability]
//! logging_url_template = "http://logger.io/${REVISION_UID}"
//! enable_var_log_collection = true
//!
//! [network]
//! istio_outbound_ip_ranges = "*"
//!
//! [deployment]
//! queue_sidecar_image = "surge/queue:latest"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the revision uid in the logging URL template.
pub const REVISION_UID_PLACEHOLDER: &str = "${REVISION_UID}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    pub observability: ObservabilityConfig,
    pub network: NetworkConfig,
    pub deployment: DeploymentConfig,
    /// How long endpoints may stay unready before the revision is marked
    /// with `ServiceTimeout`.
    pub service_timeout_secs: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            observability: ObservabilityConfig::default(),
            network: NetworkConfig::default(),
            deployment: DeploymentConfig::default(),
            service_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Empty disables the log URL.
    pub logging_url_template: String,
    /// Ship `/var/log` from the user container through a fluentd sidecar.
    pub enable_var_log_collection: bool,
    pub fluentd_sidecar_image: String,
    /// Appended to the generated fluentd source config.
    pub fluentd_sidecar_output_config: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            logging_url_template: String::new(),
            enable_var_log_collection: false,
            fluentd_sidecar_image: "fluent/fluentd:v1.16".to_string(),
            fluentd_sidecar_output_config: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Outbound IP ranges routed through the mesh sidecar. Empty omits
    /// the annotation.
    pub istio_outbound_ip_ranges: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    pub queue_sidecar_image: String,
    /// Port the user container listens on.
    pub user_port: u16,
    pub progress_deadline_secs: u32,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            queue_sidecar_image: "surge/queue-proxy:latest".to_string(),
            user_port: 8080,
            progress_deadline_secs: 120,
        }
    }
}

impl ReconcilerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ReconcilerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Log URL for a revision, or `None` when no template is configured.
    pub fn log_url(&self, uid: &str) -> Option<String> {
        let template = &self.observability.logging_url_template;
        if template.is_empty() {
            return None;
        }
        Some(template.replace(REVISION_UID_PLACEHOLDER, uid))
    }
}
