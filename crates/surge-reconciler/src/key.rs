//! Work-queue keys.

use crate::error::{ReconcileError, ReconcileResult};

/// Split a `namespace/name` key.
///
/// Exactly one separator and two non-empty parts are required.
pub fn split_key(key: &str) -> ReconcileResult<(&str, &str)> {
    match key.split_once('/') {
        Some((ns, name)) if !ns.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((ns, name))
        }
        _ => Err(ReconcileError::InvalidKey(key.to_string())),
    }
}

pub fn make_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}
