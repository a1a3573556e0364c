//! Decision functions — map a partition's accumulated stats to a replica count.
//!
//! The registry owns no scaling formula. It hands a [`Snapshot`] to a
//! [`DecisionFunction`] and reports whatever comes back.
//! [`ConcurrencyDecider`] is the default.
//!
//! # Default algorithm
//!
//! ```text
//! observed = Σ per-pod mean concurrency over the stable window
//! target   = per-pod concurrency target
//!
//! if no samples in window:       NoChange
//! if observed == 0:              ScaleTo(clamp(0))   // scale-to-zero when min is 0
//! else:                          ScaleTo(clamp(ceil(observed / target)))
//! ```
//!
//! A result equal to the current ready pod count is reported as `NoChange`.

use tracing::debug;

use crate::config::AutoscalerSpec;
use crate::stats::WindowAverages;

/// A scaling decision for a single partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaleDecision {
    /// Scale to the specified replica count.
    ScaleTo(u32),
    /// No change needed.
    NoChange,
}

/// Everything a decision function may look at.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub partition: &'a str,
    /// Unix nanoseconds the decision is made for.
    pub time: i64,
    pub averages: WindowAverages,
    pub ready_pods: u32,
    pub spec: &'a AutoscalerSpec,
}

/// Pluggable scaling algorithm.
///
/// Called with the partition's instance lock held, so implementations
/// must not block.
pub trait DecisionFunction: Send + Sync {
    fn decide(&self, snapshot: &Snapshot<'_>) -> ScaleDecision;
}

impl<F> DecisionFunction for F
where
    F: Fn(&Snapshot<'_>) -> ScaleDecision + Send + Sync,
{
    fn decide(&self, snapshot: &Snapshot<'_>) -> ScaleDecision {
        self(snapshot)
    }
}

/// Concurrency-proportional scaling with min/max clamping.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcurrencyDecider;

impl DecisionFunction for ConcurrencyDecider {
    fn decide(&self, snapshot: &Snapshot<'_>) -> ScaleDecision {
        let avg = &snapshot.averages;
        if avg.samples == 0 {
            return ScaleDecision::NoChange;
        }

        let target = snapshot.spec.target();
        let raw = if avg.concurrency <= 0.0 {
            0
        } else {
            // Saturating float-to-int cast.
            (avg.concurrency / target).ceil() as u32
        };
        let desired = snapshot.spec.clamp(raw);

        if desired == snapshot.ready_pods {
            return ScaleDecision::NoChange;
        }

        debug!(
            partition = %snapshot.partition,
            from = snapshot.ready_pods,
            to = desired,
            observed = avg.concurrency,
            target,
            "scaling decision"
        );
        ScaleDecision::ScaleTo(desired)
    }
}
