//! Plugin protocol handlers.
//!
//! Each handler decodes one request, forwards it to the registry, and
//! answers with the same JSON envelope. Body decode failures are reported
//! through [`PluginError::Decode`] so every error has the same shape.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use surge_autoscale::{Event, Stat};
use tracing::debug;

use crate::PluginState;
use crate::error::{PluginError, PluginResult};
use crate::handshake::{CORE_PROTOCOL_VERSION, PROTOCOL_VERSION};

/// Response wrapper for consistent API format.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }

    pub fn err(msg: String) -> Json<Self> {
        Json(Self {
            success: false,
            data: None,
            error: Some(msg),
        })
    }
}

fn decode<T>(payload: Result<Json<T>, JsonRejection>) -> PluginResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| PluginError::Decode(rejection.body_text()))
}

// ── Event ──────────────────────────────────────────────────────

/// `{"partition": "...", "type": "CREATE", "time": 0, "object": {...}}`
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub partition: String,
    #[serde(flatten)]
    pub event: Event,
}

/// POST /v1/event
pub async fn event(
    State(state): State<PluginState>,
    payload: Result<Json<EventRequest>, JsonRejection>,
) -> PluginResult<Json<ApiResponse<&'static str>>> {
    let req = decode(payload)?;
    debug!(
        partition = %req.partition,
        event = req.event.kind.as_str(),
        object = req.event.object.kind(),
        "event"
    );
    state.registry.apply_event(&req.partition, req.event).await?;
    Ok(ApiResponse::ok("applied"))
}

// ── Stat ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatRequest {
    pub partition: String,
    #[serde(default)]
    pub stats: Vec<Stat>,
}

/// POST /v1/stat — always succeeds once the body decodes.
pub async fn stat(
    State(state): State<PluginState>,
    payload: Result<Json<StatRequest>, JsonRejection>,
) -> PluginResult<Json<ApiResponse<&'static str>>> {
    let req = decode(payload)?;
    state.registry.record_stats(&req.partition, req.stats).await;
    Ok(ApiResponse::ok("recorded"))
}

// ── Scale ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScaleRequest {
    pub partition: String,
    /// Unix nanoseconds.
    pub time: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScaleResponse {
    pub replicas: i32,
}

/// POST /v1/scale
pub async fn scale(
    State(state): State<PluginState>,
    payload: Result<Json<ScaleRequest>, JsonRejection>,
) -> PluginResult<Json<ApiResponse<ScaleResponse>>> {
    let req = decode(payload)?;
    let replicas = state.registry.scale(&req.partition, req.time).await?;
    debug!(partition = %req.partition, replicas, "scale");
    Ok(ApiResponse::ok(ScaleResponse { replicas }))
}

// ── Handshake ──────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandshakeInfo {
    pub core_protocol_version: u32,
    pub protocol_version: u32,
    pub partitions: usize,
}

/// GET /v1/handshake — lets the host confirm the versions over the wire.
pub async fn handshake(State(state): State<PluginState>) -> Json<ApiResponse<HandshakeInfo>> {
    ApiResponse::ok(HandshakeInfo {
        core_protocol_version: CORE_PROTOCOL_VERSION,
        protocol_version: PROTOCOL_VERSION,
        partitions: state.registry.partitions().await.len(),
    })
}
