//! Plugin mode — serves one partition registry to the host that
//! launched us.
//!
//! The handshake environment is checked before anything binds: a plugin
//! started by hand, or by a host speaking another protocol version,
//! exits with an error instead of serving.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use surge_autoscale::{PartitionRegistry, RegistryConfig};
use surge_plugin::handshake;
use tracing::info;

pub async fn run_plugin(listen: SocketAddr, stable_window_secs: u64) -> anyhow::Result<()> {
    let version = handshake::validate_env()?;

    if stable_window_secs == 0 {
        anyhow::bail!("--stable-window must be at least one second");
    }
    let registry = Arc::new(PartitionRegistry::new(RegistryConfig {
        stable_window: Duration::from_secs(stable_window_secs),
    }));

    let listener = tokio::net::TcpListener::bind(listen).await?;
    surge_plugin::serve(listener, registry, version, crate::ctrl_c()).await?;

    info!("autoscaler plugin stopped");
    Ok(())
}
