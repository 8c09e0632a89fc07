use std::collections::HashMap;
use std::sync::RwLock;

use odb_types::ObjectId;

use crate::commit::Commit;
use crate::error::{ObjectError, ObjectResult};
use crate::hasher::hash_object;
use crate::object::{Object, ObjectKind};
use crate::traits::ObjectSource;

/// In-memory, HashMap-based object source.
///
/// Holds canonical payloads keyed by their computed id. Intended for tests
/// and for embedding small synthetic histories.
pub struct InMemoryObjectSource {
    objects: RwLock<HashMap<ObjectId, (ObjectKind, Vec<u8>)>>,
}

impl InMemoryObjectSource {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Store a payload and return its id. Inserting the same payload twice
    /// is a no-op.
    pub fn insert(&self, kind: ObjectKind, body: Vec<u8>) -> ObjectId {
        let id = hash_object(kind, &body);
        self.objects
            .write()
            .expect("lock poisoned")
            .entry(id)
            .or_insert((kind, body));
        id
    }

    pub fn insert_commit(&self, commit: &Commit) -> ObjectId {
        self.insert(ObjectKind::Commit, commit.encode())
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.read().expect("lock poisoned").contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryObjectSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectSource for InMemoryObjectSource {
    type Error = ObjectError;

    fn open_object(&self, id: &ObjectId) -> ObjectResult<Object> {
        let (kind, body) = self
            .objects
            .read()
            .expect("lock poisoned")
            .get(id)
            .cloned()
            .ok_or(ObjectError::NotFound(*id))?;
        Object::from_bytes(kind, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Signature;

    #[test]
    fn insert_is_idempotent() {
        let source = InMemoryObjectSource::new();
        assert!(source.is_empty());
        let a = source.insert(ObjectKind::Blob, b"x".to_vec());
        let b = source.insert(ObjectKind::Blob, b"x".to_vec());
        assert_eq!(a, b);
        assert_eq!(source.len(), 1);
        assert!(source.contains(&a));
    }

    #[test]
    fn commits_come_back_parsed() {
        let source = InMemoryObjectSource::new();
        let sig = Signature::new("T", "t@example.com", 42, 0);
        let commit = Commit::new(ObjectId::null(), vec![], sig.clone(), sig, "c\n");
        let id = source.insert_commit(&commit);
        assert_eq!(id, commit.id());

        let opened = source.open_object(&id).unwrap().into_commit().unwrap();
        assert_eq!(opened, commit);
    }

    #[test]
    fn works_through_a_reference() {
        fn open_via<S: ObjectSource>(source: S, id: &ObjectId) -> bool {
            source.open_object(id).is_ok()
        }
        let source = InMemoryObjectSource::new();
        let id = source.insert(ObjectKind::Blob, Vec::new());
        assert!(open_via(&source, &id));
    }
}
