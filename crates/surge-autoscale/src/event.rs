//! Partition events delivered by the host.
//!
//! An [`Event`] is a closed product of [`EventKind`] × [`Object`]. The
//! registry matches on both exhaustively, so adding an object kind means
//! revisiting every dispatch site. Object kinds this build doesn't know
//! decode to [`Object::Unrecognized`] and are accepted as no-ops; unknown
//! event kinds fail to decode.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Create,
    Update,
    Delete,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Create => "create",
            EventKind::Update => "update",
            EventKind::Delete => "delete",
        }
    }
}

/// Lifecycle phase reported for a pod.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    pub name: String,
    #[serde(default)]
    pub phase: PodPhase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Object {
    /// Autoscaler configuration as a YAML document.
    Autoscaler { yaml: String },
    Pod(Pod),
    #[serde(other)]
    Unrecognized,
}

impl Object {
    pub fn kind(&self) -> &'static str {
        match self {
            Object::Autoscaler { .. } => "autoscaler",
            Object::Pod(_) => "pod",
            Object::Unrecognized => "unrecognized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Unix nanoseconds.
    #[serde(default)]
    pub time: i64,
    pub object: Object,
}
