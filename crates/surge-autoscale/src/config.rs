//! Autoscaler configuration decoded from the create-event payload.
//!
//! The payload is a YAML document shaped like a pod autoscaler object:
//!
//! ```yaml
//! metadata:
//!   namespace: default
//!   name: hello-00001
//! spec:
//!   containerConcurrency: 10
//!   minScale: 0
//!   maxScale: 20
//!   target: 7.0
//!   stableWindowSecs: 60
//! ```
//!
//! Everything under `spec` is optional. `target` falls back to the
//! container concurrency, or to [`DEFAULT_TARGET_CONCURRENCY`] when
//! concurrency is unlimited. A `maxScale` of zero means unbounded.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// Per-pod concurrency target used when nothing else is configured.
pub const DEFAULT_TARGET_CONCURRENCY: f64 = 100.0;

/// Registry-wide settings.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Stable window applied to autoscalers that don't set their own.
    pub stable_window: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            stable_window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoscalerMeta {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalerParams {
    /// 0 means unlimited.
    #[serde(default)]
    pub container_concurrency: u32,
    #[serde(default)]
    pub min_scale: u32,
    /// 0 means unbounded.
    #[serde(default)]
    pub max_scale: u32,
    #[serde(default)]
    pub target: Option<f64>,
    #[serde(default)]
    pub stable_window_secs: Option<u64>,
}

/// Decoded autoscaler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoscalerSpec {
    #[serde(default)]
    pub metadata: AutoscalerMeta,
    #[serde(default)]
    pub spec: AutoscalerParams,
}

impl AutoscalerSpec {
    /// Decode and validate a YAML payload.
    pub fn from_yaml(yaml: &str) -> RegistryResult<Self> {
        let spec: AutoscalerSpec =
            serde_yaml::from_str(yaml).map_err(|e| RegistryError::Config(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> RegistryResult<()> {
        let p = &self.spec;
        if let Some(target) = p.target
            && !(target.is_finite() && target > 0.0)
        {
            return Err(RegistryError::Config(format!(
                "target must be a positive number, got {target}"
            )));
        }
        if p.max_scale != 0 && p.max_scale < p.min_scale {
            return Err(RegistryError::Config(format!(
                "maxScale {} is below minScale {}",
                p.max_scale, p.min_scale
            )));
        }
        if p.stable_window_secs == Some(0) {
            return Err(RegistryError::Config(
                "stableWindowSecs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective per-pod concurrency target.
    pub fn target(&self) -> f64 {
        match (self.spec.target, self.spec.container_concurrency) {
            (Some(t), _) => t,
            (None, 0) => DEFAULT_TARGET_CONCURRENCY,
            (None, cc) => f64::from(cc),
        }
    }

    /// Effective stable window, falling back to the registry default.
    pub fn stable_window(&self, config: &RegistryConfig) -> Duration {
        self.spec
            .stable_window_secs
            .map(Duration::from_secs)
            .unwrap_or(config.stable_window)
    }

    /// Clamp a raw replica count into `[min_scale, max_scale]`.
    pub fn clamp(&self, replicas: u32) -> u32 {
        let floor = replicas.max(self.spec.min_scale);
        match self.spec.max_scale {
            0 => floor,
            max => floor.min(max),
        }
    }
}
