use std::fmt;
use std::io::{BufRead, Read};

use crate::blob::Blob;
use crate::commit::Commit;
use crate::error::{ObjectError, ObjectResult};
use crate::tag::Tag;
use crate::tree::Tree;

/// Boxed payload stream handed to the type-specific parsers.
pub type ObjectReader = Box<dyn BufRead + Send>;

/// The four git object types.
///
/// The discriminants are the type codes used in pack entry headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Commit = 1,
    Tree = 2,
    Blob = 3,
    Tag = 4,
}

impl ObjectKind {
    /// Parse the textual name used in object headers.
    pub fn from_name(name: &str) -> ObjectResult<Self> {
        match name {
            "commit" => Ok(Self::Commit),
            "tree" => Ok(Self::Tree),
            "blob" => Ok(Self::Blob),
            "tag" => Ok(Self::Tag),
            other => Err(ObjectError::UnknownObjectType(other.to_string())),
        }
    }

    /// Map a pack type code to a kind. Delta codes (6, 7) are not kinds.
    pub fn from_type_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Commit),
            2 => Some(Self::Tree),
            3 => Some(Self::Blob),
            4 => Some(Self::Tag),
            _ => None,
        }
    }

    pub fn type_code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded git object.
///
/// Commits and tags are fully parsed. Trees and blobs keep the payload
/// stream open and are consumed lazily; dropping the value closes it.
pub enum Object {
    Commit(Commit),
    Tree(Tree),
    Blob(Blob),
    Tag(Tag),
}

impl Object {
    /// Dispatch a payload stream of `size` bytes to the parser for `kind`.
    pub fn parse(kind: ObjectKind, size: u64, reader: ObjectReader) -> ObjectResult<Self> {
        Ok(match kind {
            ObjectKind::Commit => Self::Commit(Commit::parse(size, &read_body(reader, size)?)?),
            ObjectKind::Tag => Self::Tag(Tag::parse(size, &read_body(reader, size)?)?),
            ObjectKind::Tree => Self::Tree(Tree::new(size, reader)),
            ObjectKind::Blob => Self::Blob(Blob::new(size, reader)),
        })
    }

    /// Parse an in-memory payload.
    pub fn from_bytes(kind: ObjectKind, body: Vec<u8>) -> ObjectResult<Self> {
        let size = body.len() as u64;
        Self::parse(kind, size, Box::new(std::io::Cursor::new(body)))
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Commit(_) => ObjectKind::Commit,
            Self::Tree(_) => ObjectKind::Tree,
            Self::Blob(_) => ObjectKind::Blob,
            Self::Tag(_) => ObjectKind::Tag,
        }
    }

    /// Payload size in bytes (after any delta resolution).
    pub fn size(&self) -> u64 {
        match self {
            Self::Commit(c) => c.size,
            Self::Tree(t) => t.size(),
            Self::Blob(b) => b.size(),
            Self::Tag(t) => t.size,
        }
    }

    pub fn into_commit(self) -> Option<Commit> {
        match self {
            Self::Commit(c) => Some(c),
            _ => None,
        }
    }

    pub fn into_tree(self) -> Option<Tree> {
        match self {
            Self::Tree(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_blob(self) -> Option<Blob> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_tag(self) -> Option<Tag> {
        match self {
            Self::Tag(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commit(c) => f.debug_tuple("Commit").field(c).finish(),
            Self::Tag(t) => f.debug_tuple("Tag").field(t).finish(),
            Self::Tree(t) => write!(f, "Tree({} bytes)", t.size()),
            Self::Blob(b) => write!(f, "Blob({} bytes)", b.size()),
        }
    }
}

/// Read exactly `size` bytes of a commit or tag body.
fn read_body(reader: ObjectReader, size: u64) -> ObjectResult<Vec<u8>> {
    let mut body = Vec::with_capacity(size.min(1 << 20) as usize);
    reader.take(size).read_to_end(&mut body)?;
    if body.len() as u64 != size {
        return Err(ObjectError::SizeMismatch {
            declared: size,
            actual: body.len() as u64,
        });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_roundtrip() {
        for kind in [
            ObjectKind::Commit,
            ObjectKind::Tree,
            ObjectKind::Blob,
            ObjectKind::Tag,
        ] {
            assert_eq!(ObjectKind::from_name(kind.name()).unwrap(), kind);
            assert_eq!(ObjectKind::from_type_code(kind.type_code()), Some(kind));
        }
    }

    #[test]
    fn unknown_names_and_codes() {
        assert!(matches!(
            ObjectKind::from_name("blub"),
            Err(ObjectError::UnknownObjectType(name)) if name == "blub"
        ));
        assert_eq!(ObjectKind::from_type_code(0), None);
        assert_eq!(ObjectKind::from_type_code(6), None);
    }

    #[test]
    fn short_commit_body_is_size_mismatch() {
        let reader: ObjectReader = Box::new(std::io::Cursor::new(b"tree ".to_vec()));
        let err = Object::parse(ObjectKind::Commit, 100, reader).unwrap_err();
        assert!(matches!(
            err,
            ObjectError::SizeMismatch { declared: 100, actual: 5 }
        ));
    }

    #[test]
    fn blob_size_is_known_before_reading() {
        let obj = Object::from_bytes(ObjectKind::Blob, vec![7; 42]).unwrap();
        assert_eq!(obj.kind(), ObjectKind::Blob);
        assert_eq!(obj.size(), 42);
        assert!(obj.into_commit().is_none());
    }
}
