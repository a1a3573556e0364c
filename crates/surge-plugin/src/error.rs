//! Error types for the plugin boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use surge_autoscale::RegistryError;
use thiserror::Error;

use crate::handlers::ApiResponse;

/// Result type alias for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

#[derive(Debug, Error)]
pub enum PluginError {
    /// Host and plugin cannot talk to each other. Fatal at startup.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Request body didn't decode.
    #[error("malformed request: {0}")]
    Decode(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl PluginError {
    pub fn status(&self) -> StatusCode {
        match self {
            PluginError::Handshake(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PluginError::Decode(_) => StatusCode::BAD_REQUEST,
            PluginError::Registry(e) => match e {
                RegistryError::Duplicate(_) => StatusCode::CONFLICT,
                RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
                RegistryError::Unsupported { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                RegistryError::Config(_) => StatusCode::BAD_REQUEST,
            },
        }
    }
}

impl IntoResponse for PluginError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, ApiResponse::<()>::err(self.to_string())).into_response()
    }
}
