//! Controller mode — reconciles every revision in the local store, and
//! the HorizontalPodAutoscalers of HPA-class autoscalers next to it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use surge_reconciler::{Controller, HpaReconciler, ReconcilerConfig, RevisionReconciler};
use surge_state::StateStore;
use tokio::sync::watch;
use tracing::info;

pub async fn run_controller(
    data_dir: PathBuf,
    config_path: Option<PathBuf>,
    workers: usize,
    resync_interval: u64,
) -> anyhow::Result<()> {
    if resync_interval == 0 {
        anyhow::bail!("--resync-interval must be at least one second");
    }
    info!("Surge daemon starting in controller mode");

    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("surge.redb");
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "object store opened");

    let config = match config_path {
        Some(path) => {
            let config = ReconcilerConfig::from_file(&path)?;
            info!(path = ?path, "reconciler config loaded");
            config
        }
        None => ReconcilerConfig::default(),
    };

    let store = Arc::new(store);
    let revisions = Controller::new(RevisionReconciler::new(store.clone(), config));
    let autoscalers = Controller::new(HpaReconciler::new(store));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        crate::ctrl_c().await;
        let _ = shutdown_tx.send(true);
    });

    let resync = Duration::from_secs(resync_interval);
    tokio::join!(
        revisions.run(workers, resync, shutdown_rx.clone()),
        autoscalers.run(workers, resync, shutdown_rx),
    );

    info!("Surge daemon stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_resync_interval_is_rejected_before_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");

        let err = run_controller(data_dir.clone(), None, 1, 0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--resync-interval"));
        assert!(!data_dir.exists());
    }
}
