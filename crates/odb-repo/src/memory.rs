//! In-memory ref store for tests and synthetic repositories.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::RepoResult;
use crate::names::validate_ref_name;
use crate::traits::RefStore;
use crate::types::{Ref, RefTarget};

/// A [`RefStore`] backed by a sorted map behind a `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryRefStore {
    refs: RwLock<BTreeMap<String, Ref>>,
}

impl InMemoryRefStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a ref.
    pub fn insert(&self, name: &str, target: RefTarget) -> RepoResult<()> {
        validate_ref_name(name)?;
        self.refs
            .write()
            .expect("lock poisoned")
            .insert(name.to_string(), Ref::new(name, target));
        Ok(())
    }

    /// Returns `true` if the ref existed.
    pub fn remove(&self, name: &str) -> bool {
        self.refs
            .write()
            .expect("lock poisoned")
            .remove(name)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.refs.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.read().expect("lock poisoned").is_empty()
    }
}

impl RefStore for InMemoryRefStore {
    fn read_ref(&self, name: &str) -> RepoResult<Option<Ref>> {
        Ok(self.refs.read().expect("lock poisoned").get(name).cloned())
    }

    fn list_refs(&self, prefix: &str) -> RepoResult<Vec<Ref>> {
        Ok(self
            .refs
            .read()
            .expect("lock poisoned")
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(_, r)| r.clone())
            .collect())
    }
}
