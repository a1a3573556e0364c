//! Windowed stat accumulator.
//!
//! Samples are kept for one stable window measured back from the newest
//! sample seen. Out-of-order samples are accepted as long as they still
//! fall inside the window.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which quantity a sample measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// In-flight requests observed on one pod.
    Concurrency,
    /// Requests per second observed on one pod.
    Rps,
}

/// A timestamped usage sample attributed to one pod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    /// Unix nanoseconds.
    pub time: i64,
    pub pod_name: String,
    pub metric: MetricType,
    pub value: f64,
}

/// Aggregates computed over the samples inside the window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowAverages {
    /// Sum across pods of each pod's mean concurrency.
    pub concurrency: f64,
    /// Sum across pods of each pod's mean request rate.
    pub rps: f64,
    pub samples: usize,
}

#[derive(Debug)]
pub struct StatWindow {
    window_nanos: i64,
    newest: Option<i64>,
    samples: VecDeque<Stat>,
}

impl StatWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window_nanos: i64::try_from(window.as_nanos()).unwrap_or(i64::MAX),
            newest: None,
            samples: VecDeque::new(),
        }
    }

    /// Add a sample and drop everything that fell out of the window.
    pub fn record(&mut self, stat: Stat) {
        let newest = self.newest.map_or(stat.time, |n| n.max(stat.time));
        self.newest = Some(newest);
        let cutoff = newest.saturating_sub(self.window_nanos);
        if stat.time >= cutoff {
            self.samples.push_back(stat);
        }
        self.samples.retain(|s| s.time >= cutoff);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Forget every sample from one pod.
    pub fn forget_pod(&mut self, pod_name: &str) {
        self.samples.retain(|s| s.pod_name != pod_name);
    }

    /// Averages over samples within one window before `now`.
    ///
    /// Samples newer than `now` are ignored, so a scale request carrying
    /// an older timestamp sees the world as it was then.
    pub fn averages(&self, now: i64) -> WindowAverages {
        let cutoff = now.saturating_sub(self.window_nanos);
        let mut per_pod: BTreeMap<(&str, MetricType), (f64, u32)> = BTreeMap::new();
        let mut samples = 0;

        for s in self.samples.iter().filter(|s| s.time >= cutoff && s.time <= now) {
            let slot = per_pod
                .entry((s.pod_name.as_str(), s.metric))
                .or_insert((0.0, 0));
            slot.0 += s.value;
            slot.1 += 1;
            samples += 1;
        }

        let mut out = WindowAverages {
            samples,
            ..WindowAverages::default()
        };
        for ((_, metric), (sum, count)) in per_pod {
            let mean = sum / f64::from(count);
            match metric {
                MetricType::Concurrency => out.concurrency += mean,
                MetricType::Rps => out.rps += mean,
            }
        }
        out
    }
}
