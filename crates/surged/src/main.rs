//! surged — the Surge daemon.
//!
//! One binary, two roles:
//! - `plugin`: the per-partition autoscaler, launched by a host process
//!   and spoken to over the plugin protocol
//! - `controller`: the revision reconciler, driving child objects in the
//!   object store
//!
//! # Usage
//!
//! ```text
//! surged plugin --listen 127.0.0.1:0
//! surged controller --data-dir /var/lib/surge --config surge.toml --workers 4
//! ```

mod controller_mode;
mod plugin_mode;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "surged", about = "Surge daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the autoscaler plugin protocol to a host process.
    Plugin {
        /// Address to listen on. Port 0 picks a free port; the handshake
        /// line reports the one chosen.
        #[arg(long, default_value = "127.0.0.1:0")]
        listen: SocketAddr,

        /// Stable window in seconds for autoscalers that don't set one.
        #[arg(long, default_value = "60")]
        stable_window: u64,
    },

    /// Run the revision controller against the local object store.
    Controller {
        /// Data directory for persistent state.
        #[arg(long, default_value = "/var/lib/surge")]
        data_dir: PathBuf,

        /// Reconciler config (TOML). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Concurrent reconcile workers.
        #[arg(long, default_value = "4")]
        workers: usize,

        /// Seconds between full resyncs of every revision.
        #[arg(long, default_value = "30")]
        resync_interval: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the plugin handshake, so logs always go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,surged=debug,surge=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    match cli.command {
        Command::Plugin {
            listen,
            stable_window,
        } => plugin_mode::run_plugin(listen, stable_window).await,
        Command::Controller {
            data_dir,
            config,
            workers,
            resync_interval,
        } => {
            controller_mode::run_controller(data_dir, config, workers, resync_interval).await
        }
    }
}

/// Resolves on Ctrl-C.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
