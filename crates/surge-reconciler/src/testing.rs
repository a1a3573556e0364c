//! Test double for the object store.
//!
//! [`RecordingClient`] wraps an in-memory [`StateStore`], records every
//! create, update and delete the reconciler attempts (including ones that were
//! made to fail), and can fail calls for a given (verb, kind) pair.

use std::collections::HashSet;
use std::sync::Mutex;

use surge_state::{Resource, StateError, StateResult, StateStore};

use crate::client::ObjectClient;
use crate::error::Verb;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub verb: Verb,
    pub kind: &'static str,
    pub key: String,
}

pub struct RecordingClient {
    store: StateStore,
    failures: Mutex<HashSet<(Verb, &'static str)>>,
    actions: Mutex<Vec<Action>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self {
            store: StateStore::open_in_memory().unwrap(),
            failures: Mutex::new(HashSet::new()),
            actions: Mutex::new(Vec::new()),
        }
    }

    /// Insert an object without recording it.
    pub fn seed<R: Resource>(&self, obj: &R) -> R {
        self.store.create(obj).unwrap()
    }

    /// Overwrite a stored object without recording it.
    pub fn replace<R: Resource>(&self, obj: &R) -> R {
        let current: R = self
            .store
            .get(&obj.meta().namespace, &obj.meta().name)
            .unwrap()
            .unwrap();
        let mut next = obj.clone();
        next.meta_mut().resource_version = current.meta().resource_version;
        self.store.update(&next).unwrap()
    }

    pub fn fetch<R: Resource>(&self, namespace: &str, name: &str) -> Option<R> {
        self.store.get(namespace, name).unwrap()
    }

    /// Make every `verb` call on `kind` fail.
    pub fn induce_failure(&self, verb: Verb, kind: &'static str) {
        self.failures.lock().unwrap().insert((verb, kind));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Forget recorded actions.
    pub fn reset(&self) {
        self.actions.lock().unwrap().clear();
    }

    pub fn actions(&self) -> Vec<Action> {
        self.actions.lock().unwrap().clone()
    }

    /// Kinds of attempted creates, in order.
    pub fn creates(&self) -> Vec<&'static str> {
        self.kinds(Verb::Create)
    }

    /// Kinds of attempted updates, in order.
    pub fn updates(&self) -> Vec<&'static str> {
        self.kinds(Verb::Update)
    }

    /// Kinds of attempted deletes, in order.
    pub fn deletes(&self) -> Vec<&'static str> {
        self.kinds(Verb::Delete)
    }

    fn kinds(&self, verb: Verb) -> Vec<&'static str> {
        self.actions
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.verb == verb)
            .map(|a| a.kind)
            .collect()
    }

    fn record<R: Resource>(&self, verb: Verb, key: String) {
        self.actions.lock().unwrap().push(Action {
            verb,
            kind: R::KIND,
            key,
        });
    }

    fn check<R: Resource>(&self, verb: Verb) -> StateResult<()> {
        if self.failures.lock().unwrap().contains(&(verb, R::KIND)) {
            return Err(StateError::Write(format!("induced {verb} failure for {}", R::KIND)));
        }
        Ok(())
    }
}

impl ObjectClient for RecordingClient {
    fn get<R: Resource>(&self, namespace: &str, name: &str) -> StateResult<Option<R>> {
        self.check::<R>(Verb::Get)?;
        self.store.get(namespace, name)
    }

    fn list<R: Resource>(&self) -> StateResult<Vec<R>> {
        self.check::<R>(Verb::Get)?;
        self.store.list()
    }

    fn create<R: Resource>(&self, obj: &R) -> StateResult<R> {
        self.record::<R>(Verb::Create, obj.meta().key());
        self.check::<R>(Verb::Create)?;
        self.store.create(obj)
    }

    fn update<R: Resource>(&self, obj: &R) -> StateResult<R> {
        self.record::<R>(Verb::Update, obj.meta().key());
        self.check::<R>(Verb::Update)?;
        self.store.update(obj)
    }

    fn delete<R: Resource>(&self, namespace: &str, name: &str) -> StateResult<bool> {
        self.record::<R>(Verb::Delete, format!("{namespace}/{name}"));
        self.check::<R>(Verb::Delete)?;
        self.store.delete::<R>(namespace, name)
    }
}
