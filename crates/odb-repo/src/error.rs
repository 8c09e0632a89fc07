//! Error types for repository operations.

use std::path::PathBuf;

use odb_graph::GraphError;
use odb_object::{ObjectError, ObjectKind};
use odb_pack::PackError;
use odb_types::{ObjectId, TypeError};
use thiserror::Error;

/// Errors that can occur while reading a repository.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The object is neither loose nor in any pack.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// No ref matches the given name.
    #[error("ref matching {name:?} not found")]
    UnknownRef { name: String },

    /// More than one ref matches and none is preferred.
    #[error("ambiguous ref name {name:?}, matches: {}", candidates.join(", "))]
    AmbiguousRef {
        name: String,
        candidates: Vec<String>,
    },

    /// Following symbolic refs exceeded the configured depth.
    #[error("symbolic ref {name:?} nests deeper than {depth}")]
    SymbolicRefCycle { name: String, depth: usize },

    /// The ref name is invalid or its contents cannot be parsed.
    #[error("malformed ref {name:?}: {reason}")]
    MalformedRef { name: String, reason: String },

    /// The directory does not look like a git directory.
    #[error("not a git repository: {}", path.display())]
    NotARepository { path: PathBuf },

    /// The configuration could not be read or is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The object exists but has a different kind than required.
    #[error("object {id} is a {actual}, expected a {expected}")]
    WrongKind {
        id: ObjectId,
        actual: ObjectKind,
        expected: ObjectKind,
    },

    /// A symlink blob is larger than `max_link_size`.
    #[error("link target {id} is {size} bytes, limit is {limit}")]
    LinkTooLarge { id: ObjectId, size: u64, limit: u64 },

    /// The annex key has no `backend--name` shape.
    #[error("malformed annex key {key:?}: {reason}")]
    MalformedAnnexKey { key: String, reason: String },

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Object(#[from] ObjectError),

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification for callers that map errors onto a service
/// boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    NotFound,
    BadRequest,
    Internal,
}

impl RepoError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RepoError::ObjectNotFound(_)
            | RepoError::UnknownRef { .. }
            | RepoError::NotARepository { .. }
            | RepoError::Pack(PackError::ObjectNotFound(_))
            | RepoError::Object(ObjectError::NotFound(_)) => ErrorClass::NotFound,
            RepoError::AmbiguousRef { .. }
            | RepoError::MalformedRef { .. }
            | RepoError::WrongKind { .. }
            | RepoError::LinkTooLarge { .. }
            | RepoError::MalformedAnnexKey { .. }
            | RepoError::Config(_)
            | RepoError::Type(_) => ErrorClass::BadRequest,
            RepoError::Graph(GraphError::NotACommit { .. }) => ErrorClass::BadRequest,
            _ => ErrorClass::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }
}

/// Convenience alias for repository results.
pub type RepoResult<T> = Result<T, RepoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        let id = ObjectId::null();
        assert_eq!(RepoError::ObjectNotFound(id).class(), ErrorClass::NotFound);
        assert_eq!(
            RepoError::UnknownRef { name: "x".into() }.class(),
            ErrorClass::NotFound
        );
        assert_eq!(
            RepoError::AmbiguousRef {
                name: "x".into(),
                candidates: vec![]
            }
            .class(),
            ErrorClass::BadRequest
        );
        assert_eq!(
            RepoError::SymbolicRefCycle {
                name: "HEAD".into(),
                depth: 5
            }
            .class(),
            ErrorClass::Internal
        );
        assert_eq!(
            RepoError::Pack(PackError::ObjectNotFound(id)).class(),
            ErrorClass::NotFound
        );
        assert_eq!(
            RepoError::Pack(PackError::VarintOverflow).class(),
            ErrorClass::Internal
        );
    }

    #[test]
    fn ambiguous_lists_candidates() {
        let err = RepoError::AmbiguousRef {
            name: "main".into(),
            candidates: vec!["refs/remotes/a/main".into(), "refs/tags/main".into()],
        };
        assert_eq!(
            err.to_string(),
            "ambiguous ref name \"main\", matches: refs/remotes/a/main, refs/tags/main"
        );
    }
}
