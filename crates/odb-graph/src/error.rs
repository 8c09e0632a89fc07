//! Error types for commit graph walks.

use odb_object::ObjectKind;
use odb_types::ObjectId;

/// Errors that can occur while building or walking a commit graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The object exists but is not a commit.
    #[error("object {id} is a {kind}, not a commit")]
    NotACommit { id: ObjectId, kind: ObjectKind },

    /// The object source failed to produce the object.
    #[error("failed to load commit {id}: {source}")]
    Source {
        id: ObjectId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The id has not been loaded into this graph.
    #[error("commit {0} is not part of the graph")]
    UnknownNode(ObjectId),
}

/// Convenience alias for graph results.
pub type GraphResult<T> = Result<T, GraphError>;
