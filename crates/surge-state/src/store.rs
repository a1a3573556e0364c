//! StateStore — redb-backed object persistence for Surge.
//!
//! Provides typed get/list/create/update/delete over every [`Resource`]
//! kind. Values are JSON-serialized into redb's `&[u8]` value columns.
//! Writes use optimistic concurrency: `update` only succeeds when the
//! caller's `resource_version` matches the stored one, and every
//! successful write bumps it. The store supports both on-disk and
//! in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use redb::{Database, ReadableDatabase, ReadableTable};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables;
use crate::types::Resource;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe object store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "object store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory object store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        for table in tables::ALL {
            txn.open_table(table).map_err(map_err!(Table))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Get an object by namespace and name.
    pub fn get<R: Resource>(&self, namespace: &str, name: &str) -> StateResult<Option<R>> {
        let key = format!("{namespace}/{name}");
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(R::TABLE).map_err(map_err!(Table))?;
        match table.get(key.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let obj: R =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(obj))
            }
            None => Ok(None),
        }
    }

    /// List every object of one kind, ordered by key.
    pub fn list<R: Resource>(&self) -> StateResult<Vec<R>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(R::TABLE).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let obj: R = serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(obj);
        }
        Ok(results)
    }

    /// Insert a new object. Fails if one with the same key exists.
    ///
    /// Returns the stored object, with its uid (if it had none) and
    /// `resource_version` assigned.
    pub fn create<R: Resource>(&self, obj: &R) -> StateResult<R> {
        let key = obj.meta().key();
        let mut stored = obj.clone();
        {
            let meta = stored.meta_mut();
            meta.resource_version = 1;
            if meta.uid.is_empty() {
                meta.uid = new_uid(R::KIND, &key);
            }
        }
        let value = serde_json::to_vec(&stored).map_err(map_err!(Serialize))?;

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(R::TABLE).map_err(map_err!(Table))?;
            if table.get(key.as_str()).map_err(map_err!(Read))?.is_some() {
                return Err(StateError::AlreadyExists { kind: R::KIND, key });
            }
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(kind = R::KIND, %key, "object created");
        Ok(stored)
    }

    /// Replace an existing object.
    ///
    /// Fails with `NotFound` if it doesn't exist and with `Conflict` if
    /// `obj` was read at a different `resource_version` than the stored one.
    pub fn update<R: Resource>(&self, obj: &R) -> StateResult<R> {
        let key = obj.meta().key();
        let expected = obj.meta().resource_version;

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let stored = {
            let mut table = txn.open_table(R::TABLE).map_err(map_err!(Table))?;
            let current: R = match table.get(key.as_str()).map_err(map_err!(Read))? {
                Some(guard) => {
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
                }
                None => return Err(StateError::NotFound { kind: R::KIND, key }),
            };

            let found = current.meta().resource_version;
            if found != expected {
                return Err(StateError::Conflict {
                    kind: R::KIND,
                    key,
                    expected,
                    found,
                });
            }

            let mut next = obj.clone();
            {
                let meta = next.meta_mut();
                meta.resource_version = found + 1;
                meta.uid = current.meta().uid.clone();
            }
            let value = serde_json::to_vec(&next).map_err(map_err!(Serialize))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
            next
        };
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(kind = R::KIND, %key, version = stored.meta().resource_version, "object updated");
        Ok(stored)
    }

    /// Delete an object. Returns true if it existed.
    pub fn delete<R: Resource>(&self, namespace: &str, name: &str) -> StateResult<bool> {
        let key = format!("{namespace}/{name}");
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(R::TABLE).map_err(map_err!(Table))?;
            existed = table.remove(key.as_str()).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(kind = R::KIND, %key, existed, "object deleted");
        Ok(existed)
    }
}

/// Derive a fresh uid from the object's identity and the creation instant.
fn new_uid(kind: &str, key: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let digest = Sha256::digest(format!("{kind}/{key}/{nanos}").as_bytes());
    hex::encode(&digest[..16])
}
