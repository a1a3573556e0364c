//! surge-plugin — the autoscaler plugin protocol.
//!
//! Exposes a [`PartitionRegistry`] to a host process as HTTP+JSON. The
//! host starts the plugin, reads the handshake line from its stdout, and
//! then drives it with three calls.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/v1/event` | Apply a lifecycle event to a partition |
//! | POST | `/v1/stat` | Record stats for a partition (best effort) |
//! | POST | `/v1/scale` | Ask for the replica count of a partition |
//! | GET | `/v1/handshake` | Report protocol versions |

pub mod error;
pub mod handlers;
pub mod handshake;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use surge_autoscale::PartitionRegistry;
use tokio::net::TcpListener;
use tracing::info;

pub use error::{PluginError, PluginResult};

/// Shared state for plugin handlers.
#[derive(Clone)]
pub struct PluginState {
    pub registry: Arc<PartitionRegistry>,
}

/// Build the plugin router.
pub fn build_router(registry: Arc<PartitionRegistry>) -> Router {
    let state = PluginState { registry };
    Router::new()
        .route("/v1/event", post(handlers::event))
        .route("/v1/stat", post(handlers::stat))
        .route("/v1/scale", post(handlers::scale))
        .route("/v1/handshake", get(handlers::handshake))
        .with_state(state)
}

/// Serve the plugin on `listener`, printing the handshake line first.
///
/// `version` is the negotiated protocol version from
/// [`handshake::validate_env`]. Returns when `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    registry: Arc<PartitionRegistry>,
    version: u32,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    println!("{}", handshake::line(version, addr));
    info!(%addr, version, "autoscaler plugin listening");

    axum::serve(listener, build_router(registry))
        .with_graceful_shutdown(shutdown)
        .await
}
