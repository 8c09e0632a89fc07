//! Memoized commit nodes. Edges are ids into the graph's node map.

use odb_object::Commit;
use odb_types::ObjectId;

use crate::flags::NodeFlags;

/// A commit loaded into a [`CommitGraph`](crate::CommitGraph).
#[derive(Clone, Debug)]
pub struct CommitNode {
    pub id: ObjectId,
    pub commit: Commit,
    /// Set once the parents have been loaded into the graph.
    parents: Option<Vec<ObjectId>>,
    pub flags: NodeFlags,
    /// Live heap entries for this node during a paint.
    pub(crate) queued: usize,
}

impl CommitNode {
    pub(crate) fn new(id: ObjectId, commit: Commit) -> Self {
        Self {
            id,
            commit,
            parents: None,
            flags: NodeFlags::NONE,
            queued: 0,
        }
    }

    /// Committer timestamp, the walk priority.
    pub fn time(&self) -> i64 {
        self.commit.committer.time
    }

    /// Parent ids in commit order, whether or not they are loaded yet.
    pub fn parent_ids(&self) -> &[ObjectId] {
        &self.commit.parents
    }

    /// Loaded parent links, `None` until the walk has reached this node.
    pub fn parents(&self) -> Option<&[ObjectId]> {
        self.parents.as_deref()
    }

    pub(crate) fn set_parents(&mut self, parents: Vec<ObjectId>) {
        self.parents = Some(parents);
    }

    pub fn is_root(&self) -> bool {
        self.commit.parents.is_empty()
    }
}
