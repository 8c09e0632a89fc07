//! Git object model and loose object codec.
//!
//! Every git object is stored as `"<type> <size>\0<payload>"`, zlib
//! compressed, and named by the SHA-1 of the uncompressed bytes. This crate
//! decodes that format into typed [`Object`] values and encodes them back.
//!
//! # Object Types
//!
//! - [`Commit`] -- tree, parents, author/committer and message
//! - [`Tree`] -- lazy iterator over `{mode, name, id}` records
//! - [`Blob`] -- raw content exposed as a `Read` stream
//! - [`Tag`] -- annotated tag pointing at another object
//!
//! # Rules
//!
//! 1. Parsed values are immutable; a tree or blob stream is single-pass.
//! 2. Dropping an [`Object`] releases the reader behind it.
//! 3. Bodies are read through a reader limited to the declared size.
//! 4. Unknown commit and tag header lines are skipped, not rejected.

pub mod blob;
pub mod commit;
pub mod error;
pub mod hasher;
mod header;
pub mod loose;
pub mod memory;
pub mod object;
pub mod signature;
#[cfg(test)]
mod strategies;
pub mod tag;
pub mod traits;
pub mod tree;

pub use blob::Blob;
pub use commit::Commit;
pub use error::{ObjectError, ObjectResult};
pub use hasher::{hash_object, ObjectHasher};
pub use loose::{write_loose_object, LooseHeader};
pub use memory::InMemoryObjectSource;
pub use object::{Object, ObjectKind, ObjectReader};
pub use signature::Signature;
pub use tag::Tag;
pub use traits::ObjectSource;
pub use tree::{encode_tree, Tree, TreeEntry, TREE_MODE};

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    use odb_types::ObjectId;

    fn sig(name: &str, time: i64) -> Signature {
        Signature::new(name, &format!("{}@example.com", name.to_lowercase()), time, 0)
    }

    #[test]
    fn loose_roundtrip_for_every_kind() {
        let dir = tempfile::tempdir().unwrap();
        let objects = dir.path();

        let blob_id = write_loose_object(objects, ObjectKind::Blob, b"hello\n").unwrap();
        let tree_body = encode_tree(&[TreeEntry::new(0o100644, "hello.txt", blob_id)]);
        let tree_id = write_loose_object(objects, ObjectKind::Tree, &tree_body).unwrap();
        let commit = Commit::new(
            tree_id,
            vec![],
            sig("Alice", 1_700_000_000),
            sig("Alice", 1_700_000_000),
            "initial\n",
        );
        let commit_id = write_loose_object(objects, ObjectKind::Commit, &commit.encode()).unwrap();
        assert_eq!(commit_id, commit.id());

        match loose::open(&loose::loose_path(objects, &blob_id)).unwrap() {
            Object::Blob(mut blob) => {
                let mut s = String::new();
                blob.read_to_string(&mut s).unwrap();
                assert_eq!(s, "hello\n");
            }
            other => panic!("expected blob, got {}", other.kind()),
        }

        match loose::open(&loose::loose_path(objects, &tree_id)).unwrap() {
            Object::Tree(tree) => {
                let entries: Vec<TreeEntry> = tree.collect::<Result<_, _>>().unwrap();
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].name, "hello.txt");
                assert_eq!(entries[0].id, blob_id);
                assert_eq!(entries[0].kind, ObjectKind::Blob);
            }
            other => panic!("expected tree, got {}", other.kind()),
        }

        match loose::open(&loose::loose_path(objects, &commit_id)).unwrap() {
            Object::Commit(parsed) => assert_eq!(parsed, commit),
            other => panic!("expected commit, got {}", other.kind()),
        }
    }

    #[test]
    fn in_memory_source_serves_parsed_objects() {
        let source = InMemoryObjectSource::new();
        let blob = source.insert(ObjectKind::Blob, b"data".to_vec());
        let obj = source.open_object(&blob).unwrap();
        assert_eq!(obj.kind(), ObjectKind::Blob);
        assert_eq!(obj.size(), 4);

        let missing = ObjectId::from_raw([0xab; 20]);
        assert!(matches!(
            source.open_object(&missing),
            Err(ObjectError::NotFound(id)) if id == missing
        ));
    }
}
