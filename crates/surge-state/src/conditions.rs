//! Typed condition sets with a derived `Ready` condition.
//!
//! A [`ConditionSet<T>`] stores one [`Condition`] per sub-condition type
//! `T` plus the derived top-level condition. `Ready` is not a variant of
//! any `T`, so callers cannot set it directly: it only changes through
//! [`ConditionSet::refresh_ready`].
//!
//! # Transition times
//!
//! `last_transition_time` moves only when the status or the reason of a
//! condition changes. Re-asserting the same status and reason leaves it
//! untouched, so a converged object produces no writes.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Tri-state status of a condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionStatus::True => f.write_str("True"),
            ConditionStatus::False => f.write_str("False"),
            ConditionStatus::Unknown => f.write_str("Unknown"),
        }
    }
}

/// A single readiness signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Unix seconds of the last status or reason change.
    #[serde(default)]
    pub last_transition_time: u64,
}

impl Condition {
    pub fn new(
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: 0,
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }

    pub fn is_false(&self) -> bool {
        self.status == ConditionStatus::False
    }

    /// Whether moving to `next` counts as a transition.
    fn transitions_to(&self, next: &Condition) -> bool {
        self.status != next.status || self.reason != next.reason
    }
}

/// A family of sub-conditions that roll up into one `Ready` condition.
pub trait ConditionKind:
    Copy + Ord + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Sub-conditions that feed `Ready`, in precedence order. The first
    /// non-True entry in this order supplies the reason of `Ready`.
    const DEPENDENTS: &'static [Self];

    fn as_str(self) -> &'static str;
}

/// Named sub-conditions plus the derived `Ready` condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ConditionSet<T: ConditionKind> {
    #[serde(default)]
    conditions: BTreeMap<T, Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ready: Option<Condition>,
}

impl<T: ConditionKind> Default for ConditionSet<T> {
    fn default() -> Self {
        Self {
            conditions: BTreeMap::new(),
            ready: None,
        }
    }
}

impl<T: ConditionKind> ConditionSet<T> {
    pub fn get(&self, ty: T) -> Option<&Condition> {
        self.conditions.get(&ty)
    }

    /// The persisted `Ready` condition, as of the last refresh.
    pub fn ready(&self) -> Option<&Condition> {
        self.ready.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.as_ref().is_some_and(Condition::is_true)
    }

    pub fn iter(&self) -> impl Iterator<Item = (T, &Condition)> {
        self.conditions.iter().map(|(ty, c)| (*ty, c))
    }

    /// Seed every dependent that is not tracked yet as Unknown.
    ///
    /// Returns true if anything was added.
    pub fn initialize(&mut self, now: u64) -> bool {
        let mut changed = false;
        for ty in T::DEPENDENTS {
            if !self.conditions.contains_key(ty) {
                self.conditions.insert(
                    *ty,
                    Condition {
                        last_transition_time: now,
                        ..Condition::default()
                    },
                );
                changed = true;
            }
        }
        changed
    }

    /// Update one sub-condition.
    ///
    /// `last_transition_time` becomes `now` only if the status or the
    /// reason changed. Returns true if the stored value changed at all.
    pub fn set(
        &mut self,
        ty: T,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
        now: u64,
    ) -> bool {
        let next = Condition::new(status, reason, message);
        let slot = self.conditions.get(&ty);
        match transition(slot, next, now) {
            Some(updated) => {
                trace!(
                    condition = ty.as_str(),
                    status = ?updated.status,
                    reason = %updated.reason,
                    "condition changed"
                );
                self.conditions.insert(ty, updated);
                true
            }
            None => false,
        }
    }

    pub fn mark_true(&mut self, ty: T, now: u64) -> bool {
        self.set(ty, ConditionStatus::True, "", "", now)
    }

    pub fn mark_unknown(
        &mut self,
        ty: T,
        reason: impl Into<String>,
        message: impl Into<String>,
        now: u64,
    ) -> bool {
        self.set(ty, ConditionStatus::Unknown, reason, message, now)
    }

    pub fn mark_false(
        &mut self,
        ty: T,
        reason: impl Into<String>,
        message: impl Into<String>,
        now: u64,
    ) -> bool {
        self.set(ty, ConditionStatus::False, reason, message, now)
    }

    /// Derive the top-level condition from the dependents.
    ///
    /// True iff every dependent is True. Any False dependent makes it
    /// False and the first False one in precedence order supplies the
    /// reason. Otherwise it is Unknown with the reason of the first
    /// non-True dependent; a missing dependent counts as Unknown.
    ///
    /// The returned condition carries no transition time; see
    /// [`ConditionSet::refresh_ready`].
    pub fn compute_ready(&self) -> Condition {
        let unknown = Condition::default();
        let dependents = T::DEPENDENTS
            .iter()
            .map(|ty| self.conditions.get(ty).unwrap_or(&unknown));

        let mut first_unknown: Option<&Condition> = None;
        for cond in dependents {
            match cond.status {
                ConditionStatus::True => {}
                ConditionStatus::False => {
                    return Condition::new(
                        ConditionStatus::False,
                        cond.reason.clone(),
                        cond.message.clone(),
                    );
                }
                ConditionStatus::Unknown => {
                    first_unknown.get_or_insert(cond);
                }
            }
        }

        match first_unknown {
            Some(cond) => Condition::new(
                ConditionStatus::Unknown,
                cond.reason.clone(),
                cond.message.clone(),
            ),
            None => Condition::new(ConditionStatus::True, "", ""),
        }
    }

    /// Recompute and store `Ready`. Returns true if it changed.
    pub fn refresh_ready(&mut self, now: u64) -> bool {
        let next = self.compute_ready();
        match transition(self.ready.as_ref(), next, now) {
            Some(updated) => {
                self.ready = Some(updated);
                true
            }
            None => false,
        }
    }
}

/// Apply `next` over `current`, returning the value to store or `None`
/// when nothing changes.
fn transition(current: Option<&Condition>, mut next: Condition, now: u64) -> Option<Condition> {
    match current {
        Some(cur) if !cur.transitions_to(&next) => {
            if cur.message == next.message {
                return None;
            }
            next.last_transition_time = cur.last_transition_time;
            Some(next)
        }
        _ => {
            next.last_transition_time = now;
            Some(next)
        }
    }
}

// ── Condition families ─────────────────────────────────────────────

/// Sub-conditions of a Revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RevisionCondition {
    ResourcesAvailable,
    ContainerHealthy,
    Active,
    BuildSucceeded,
}

impl ConditionKind for RevisionCondition {
    const DEPENDENTS: &'static [Self] = &[
        RevisionCondition::ResourcesAvailable,
        RevisionCondition::ContainerHealthy,
        RevisionCondition::Active,
        RevisionCondition::BuildSucceeded,
    ];

    fn as_str(self) -> &'static str {
        match self {
            RevisionCondition::ResourcesAvailable => "ResourcesAvailable",
            RevisionCondition::ContainerHealthy => "ContainerHealthy",
            RevisionCondition::Active => "Active",
            RevisionCondition::BuildSucceeded => "BuildSucceeded",
        }
    }
}

/// Sub-conditions of a PodAutoscaler. Its `Ready` mirrors `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PodAutoscalerCondition {
    Active,
}

impl ConditionKind for PodAutoscalerCondition {
    const DEPENDENTS: &'static [Self] = &[PodAutoscalerCondition::Active];

    fn as_str(self) -> &'static str {
        "Active"
    }
}
