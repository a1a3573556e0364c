//! Controller loop: workers draining the queue into a reconciler.
//!
//! Reconcile passes do blocking store I/O, so each one runs on the
//! blocking pool. The queue guarantees a key is handled by at most one
//! worker at a time; different keys proceed in parallel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Interval;
use tracing::{debug, error, info, warn};

use crate::error::ReconcileResult;
use crate::queue::WorkQueue;

/// A keyed reconcile pass the controller can drive.
pub trait Reconciler: Send + Sync + 'static {
    /// Controller name used in logs.
    const NAME: &'static str;

    /// Every key a full resync visits.
    fn keys(&self) -> ReconcileResult<Vec<String>>;

    fn reconcile(&self, key: &str) -> ReconcileResult<()>;
}

pub struct Controller<R> {
    reconciler: Arc<R>,
    queue: Arc<WorkQueue>,
}

impl<R: Reconciler> Controller<R> {
    pub fn new(reconciler: R) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            queue: Arc::new(WorkQueue::new()),
        }
    }

    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    /// Queue every key the reconciler knows. Returns how many were added.
    pub fn enqueue_all(&self) -> ReconcileResult<usize> {
        let keys = self.reconciler.keys()?;
        for key in &keys {
            self.queue.add(key);
        }
        Ok(keys.len())
    }

    /// Run `workers` workers, re-listing every key each `resync`,
    /// until `shutdown` fires. A zero `resync` lists once at startup and
    /// never again.
    pub async fn run(
        &self,
        workers: usize,
        resync: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            controller = R::NAME,
            workers,
            resync_secs = resync.as_secs(),
            "controller started"
        );

        let handles: Vec<_> = (0..workers.max(1))
            .map(|id| {
                let reconciler = self.reconciler.clone();
                let queue = self.queue.clone();
                tokio::spawn(async move { worker(id, reconciler, queue).await })
            })
            .collect();

        let mut ticker = (!resync.is_zero()).then(|| tokio::time::interval(resync));
        if ticker.is_none() {
            self.resync();
        }
        loop {
            tokio::select! {
                _ = next_tick(&mut ticker) => self.resync(),
                _ = shutdown.changed() => {
                    info!(controller = R::NAME, "controller shutting down");
                    break;
                }
            }
        }

        self.queue.shut_down();
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task failed");
            }
        }
    }

    fn resync(&self) {
        match self.enqueue_all() {
            Ok(n) => debug!(controller = R::NAME, keys = n, "resync"),
            Err(e) => error!(controller = R::NAME, error = %e, "resync listing failed"),
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn worker<R: Reconciler>(id: usize, reconciler: Arc<R>, queue: Arc<WorkQueue>) {
    let controller = R::NAME;
    while let Some(key) = queue.get().await {
        let pass = {
            let reconciler = reconciler.clone();
            let key = key.clone();
            tokio::task::spawn_blocking(move || reconciler.reconcile(&key))
        };

        match pass.await {
            Ok(Ok(())) => {
                debug!(controller, worker = id, %key, "reconciled");
                queue.forget(&key);
            }
            Ok(Err(e)) if e.is_retryable() => {
                warn!(controller, worker = id, %key, error = %e, "reconcile failed, will retry");
                queue.add_rate_limited(&key);
            }
            Ok(Err(e)) => {
                error!(controller, worker = id, %key, error = %e, "reconcile failed permanently");
                queue.forget(&key);
            }
            Err(e) => {
                error!(controller, worker = id, %key, error = %e, "reconcile pass panicked");
                queue.forget(&key);
            }
        }
        queue.done(&key);
    }
    debug!(controller, worker = id, "worker stopped");
}
