//! Object-store access used by the reconciler.

use surge_state::{Resource, StateResult, StateStore};

/// Typed reads and writes against the object store.
///
/// Every call may fail with a `Conflict` when another writer got there
/// first; callers treat that as transient.
pub trait ObjectClient: Send + Sync {
    fn get<R: Resource>(&self, namespace: &str, name: &str) -> StateResult<Option<R>>;
    fn list<R: Resource>(&self) -> StateResult<Vec<R>>;
    fn create<R: Resource>(&self, obj: &R) -> StateResult<R>;
    fn update<R: Resource>(&self, obj: &R) -> StateResult<R>;
    /// Returns whether the object existed.
    fn delete<R: Resource>(&self, namespace: &str, name: &str) -> StateResult<bool>;
}

impl ObjectClient for StateStore {
    fn get<R: Resource>(&self, namespace: &str, name: &str) -> StateResult<Option<R>> {
        StateStore::get(self, namespace, name)
    }

    fn list<R: Resource>(&self) -> StateResult<Vec<R>> {
        StateStore::list(self)
    }

    fn create<R: Resource>(&self, obj: &R) -> StateResult<R> {
        StateStore::create(self, obj)
    }

    fn update<R: Resource>(&self, obj: &R) -> StateResult<R> {
        StateStore::update(self, obj)
    }

    fn delete<R: Resource>(&self, namespace: &str, name: &str) -> StateResult<bool> {
        StateStore::delete::<R>(self, namespace, name)
    }
}
