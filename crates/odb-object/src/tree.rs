use std::io::{self, BufRead, Read, Take};

use odb_types::{ObjectId, ID_LEN};

use crate::error::{ObjectError, ObjectResult};
use crate::object::{ObjectKind, ObjectReader};

/// Mode of a subtree entry. Every other mode is treated as a blob.
pub const TREE_MODE: u32 = 0o40000;

/// One record of a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TreeEntry {
    pub mode: u32,
    pub kind: ObjectKind,
    pub id: ObjectId,
    pub name: String,
}

impl TreeEntry {
    pub fn new(mode: u32, name: &str, id: ObjectId) -> Self {
        Self {
            mode,
            kind: kind_for_mode(mode),
            id,
            name: name.to_string(),
        }
    }
}

fn kind_for_mode(mode: u32) -> ObjectKind {
    if mode == TREE_MODE {
        ObjectKind::Tree
    } else {
        ObjectKind::Blob
    }
}

/// Lazy, single-pass iterator over the entries of a tree object.
///
/// Each call to `next` reads one record from the underlying stream. After the
/// first error the iterator is exhausted.
pub struct Tree {
    size: u64,
    reader: Take<ObjectReader>,
    done: bool,
}

impl Tree {
    pub(crate) fn new(size: u64, reader: ObjectReader) -> Self {
        Self {
            size,
            reader: reader.take(size),
            done: false,
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    fn read_entry(&mut self) -> ObjectResult<Option<TreeEntry>> {
        let mut head = Vec::new();
        if self.reader.read_until(0, &mut head)? == 0 {
            let missing = self.reader.limit();
            if missing > 0 {
                return Err(ObjectError::SizeMismatch {
                    declared: self.size,
                    actual: self.size - missing,
                });
            }
            return Ok(None);
        }
        if head.pop() != Some(0) {
            return Err(ObjectError::TruncatedEntry);
        }

        let sp = head
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| ObjectError::MalformedHeader("tree entry without mode".into()))?;
        let mode = std::str::from_utf8(&head[..sp])
            .ok()
            .and_then(|m| u32::from_str_radix(m, 8).ok())
            .ok_or_else(|| {
                ObjectError::MalformedHeader(format!(
                    "invalid tree entry mode {:?}",
                    String::from_utf8_lossy(&head[..sp])
                ))
            })?;
        let name = String::from_utf8_lossy(&head[sp + 1..]).into_owned();

        let mut raw = [0u8; ID_LEN];
        self.reader.read_exact(&mut raw).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => ObjectError::TruncatedEntry,
            _ => ObjectError::Io(e),
        })?;

        Ok(Some(TreeEntry {
            mode,
            kind: kind_for_mode(mode),
            id: ObjectId::from_raw(raw),
            name,
        }))
    }
}

impl Iterator for Tree {
    type Item = ObjectResult<TreeEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for Tree {}

/// Encode entries in the order given as a tree payload.
pub fn encode_tree(entries: &[TreeEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    for entry in entries {
        out.extend_from_slice(format!("{:o} {}", entry.mode, entry.name).as_bytes());
        out.push(0);
        out.extend_from_slice(entry.id.as_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::hash_object;
    use crate::object::Object;

    const EMPTY_BLOB: &str = "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391";

    fn fixture_entries() -> Vec<TreeEntry> {
        let empty = ObjectId::from_hex(EMPTY_BLOB).unwrap();
        ["G-Node", "ak", "cg", "ck", "ms", "tw"]
            .iter()
            .map(|name| TreeEntry::new(0o100644, name, empty))
            .collect()
    }

    fn tree_from(body: Vec<u8>) -> Tree {
        Object::from_bytes(ObjectKind::Tree, body)
            .unwrap()
            .into_tree()
            .unwrap()
    }

    #[test]
    fn fixture_tree_hashes_to_known_id() {
        let body = encode_tree(&fixture_entries());
        assert_eq!(body.len(), 184);
        assert_eq!(
            hash_object(ObjectKind::Tree, &body).to_hex(),
            "2e2c935aff57a62eceb380f43ed39a09651711ff"
        );
    }

    #[test]
    fn iterates_entries_in_order() {
        let entries: Vec<TreeEntry> = tree_from(encode_tree(&fixture_entries()))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries, fixture_entries());
    }

    #[test]
    fn subtree_mode_maps_to_tree_kind() {
        let id = ObjectId::from_raw([9; 20]);
        let body = encode_tree(&[
            TreeEntry::new(TREE_MODE, "dir", id),
            TreeEntry::new(0o120000, "link", id),
            TreeEntry::new(0o160000, "module", id),
        ]);
        assert!(String::from_utf8_lossy(&body).starts_with("40000 dir"));
        let kinds: Vec<ObjectKind> = tree_from(body).map(|e| e.unwrap().kind).collect();
        assert_eq!(kinds, [ObjectKind::Tree, ObjectKind::Blob, ObjectKind::Blob]);
    }

    #[test]
    fn missing_id_bytes_is_truncated() {
        let mut body = encode_tree(&fixture_entries()[..1]);
        body.truncate(body.len() - 5);
        let mut tree = tree_from(body);
        assert!(matches!(tree.next(), Some(Err(ObjectError::TruncatedEntry))));
        assert!(tree.next().is_none());
    }

    #[test]
    fn missing_name_terminator_is_truncated() {
        let mut tree = tree_from(b"100644 name-without-nul".to_vec());
        assert!(matches!(tree.next(), Some(Err(ObjectError::TruncatedEntry))));
    }

    #[test]
    fn non_octal_mode_is_malformed() {
        let mut body = b"100899 x\0".to_vec();
        body.extend_from_slice(&[0u8; 20]);
        let mut tree = tree_from(body);
        assert!(matches!(tree.next(), Some(Err(ObjectError::MalformedHeader(_)))));
        assert!(tree.next().is_none());
    }

    #[test]
    fn stream_shorter_than_declared_size_is_an_error() {
        let body = encode_tree(&fixture_entries()[..1]);
        let mut tree = Tree::new(57, Box::new(std::io::Cursor::new(body)));
        assert!(matches!(tree.next(), Some(Ok(_))));
        assert!(matches!(
            tree.next(),
            Some(Err(ObjectError::SizeMismatch { declared: 57, actual: 34 }))
        ));
        assert!(tree.next().is_none());
    }

    #[test]
    fn empty_tree_yields_nothing() {
        assert_eq!(tree_from(Vec::new()).count(), 0);
    }
}
