//! The commit graph and its two walks.
//!
//! [`CommitGraph`] memoizes commits loaded from an [`ObjectSource`] and
//! walks them youngest-first by committer time, loading parent links only
//! when a node is dequeued.
//!
//! # Invariants
//!
//! - Each commit id maps to exactly one [`CommitNode`].
//! - Colour bits only ever accumulate during a paint; they are not reset
//!   between calls.
//! - The `SEEN` bit is cleared on every node at the start of each visit.
//! - Heap ties on committer time break by id, so walk order is
//!   deterministic.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use odb_object::{Object, ObjectSource};
use odb_types::ObjectId;
use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::flags::NodeFlags;
use crate::node::CommitNode;

/// Heap entry. Orders by committer time, then id, so the max-heap yields the
/// youngest commit first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Queued {
    time: i64,
    id: ObjectId,
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Commit ancestry over an object source.
pub struct CommitGraph<S: ObjectSource> {
    source: S,
    nodes: HashMap<ObjectId, CommitNode>,
    tips: Vec<ObjectId>,
}

impl<S: ObjectSource> CommitGraph<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            nodes: HashMap::new(),
            tips: Vec::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Number of commits loaded so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn tips(&self) -> &[ObjectId] {
        &self.tips
    }

    pub fn node(&self, id: &ObjectId) -> Option<&CommitNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CommitNode> {
        self.nodes.values()
    }

    // ---------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------

    /// Load `id` (once) and register it as a walk start.
    pub fn add_tip(&mut self, id: ObjectId) -> GraphResult<&CommitNode> {
        self.load(&id)?;
        if !self.tips.contains(&id) {
            self.tips.push(id);
        }
        self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))
    }

    /// Load `id` as a tip and OR `flags` into it.
    pub fn add_tip_with_flags(&mut self, id: ObjectId, flags: NodeFlags) -> GraphResult<()> {
        self.add_tip(id)?;
        self.set_flags(&id, flags)
    }

    /// OR `flags` into an already loaded node.
    pub fn set_flags(&mut self, id: &ObjectId, flags: NodeFlags) -> GraphResult<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or(GraphError::UnknownNode(*id))?;
        node.flags |= flags;
        Ok(())
    }

    fn load(&mut self, id: &ObjectId) -> GraphResult<()> {
        if self.nodes.contains_key(id) {
            return Ok(());
        }
        let object = self
            .source
            .open_object(id)
            .map_err(|e| GraphError::Source {
                id: *id,
                source: Box::new(e),
            })?;
        let commit = match object {
            Object::Commit(commit) => commit,
            other => {
                return Err(GraphError::NotACommit {
                    id: *id,
                    kind: other.kind(),
                })
            }
        };
        self.nodes.insert(*id, CommitNode::new(*id, commit));
        Ok(())
    }

    /// Load every parent of `id` and link them. Returns the parent ids.
    fn load_parents(&mut self, id: &ObjectId) -> GraphResult<Vec<ObjectId>> {
        let node = self.nodes.get(id).ok_or(GraphError::UnknownNode(*id))?;
        if let Some(parents) = node.parents() {
            return Ok(parents.to_vec());
        }
        let parents = node.parent_ids().to_vec();
        for parent in &parents {
            self.load(parent)?;
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.set_parents(parents.clone());
        }
        Ok(parents)
    }

    fn queued(&self, id: &ObjectId) -> GraphResult<Queued> {
        let node = self.nodes.get(id).ok_or(GraphError::UnknownNode(*id))?;
        Ok(Queued {
            time: node.time(),
            id: *id,
        })
    }

    // ---------------------------------------------------------------
    // Walks
    // ---------------------------------------------------------------

    /// Propagate the tips' colours down the ancestry.
    ///
    /// A node popped while exactly red and green gains blue and is recorded
    /// as a convergence point. A parent is re-queued only when the colours
    /// change its flags. The walk ends once every queued entry is white.
    /// Returns the convergence points in the order they were found.
    pub fn paint_down_to_common(&mut self) -> GraphResult<Vec<ObjectId>> {
        let mut heap = BinaryHeap::new();
        // Queued entries whose node is not yet white.
        let mut non_white = 0usize;
        let mut found = Vec::new();
        let mut popped = 0usize;

        for node in self.nodes.values_mut() {
            node.queued = 0;
        }
        for tip in self.tips.clone() {
            self.push_paint(&mut heap, &mut non_white, &tip)?;
        }

        while non_white > 0 {
            let Some(Queued { id, .. }) = heap.pop() else {
                break;
            };
            popped += 1;

            let node = self
                .nodes
                .get_mut(&id)
                .ok_or(GraphError::UnknownNode(id))?;
            node.queued -= 1;
            if !node.flags.is_white() {
                non_white -= 1;
            }
            if node.flags.colors() == NodeFlags::YELLOW {
                node.flags |= NodeFlags::BLUE;
                non_white -= node.queued;
                found.push(id);
                debug!(commit = %id.short_hex(), "paint converged");
            }
            let flags = node.flags.colors();

            for parent_id in self.load_parents(&id)? {
                let parent = self
                    .nodes
                    .get_mut(&parent_id)
                    .ok_or(GraphError::UnknownNode(parent_id))?;
                let merged = parent.flags | flags;
                if merged == parent.flags {
                    continue;
                }
                if !parent.flags.is_white() && merged.is_white() {
                    non_white -= parent.queued;
                }
                parent.flags = merged;
                self.push_paint(&mut heap, &mut non_white, &parent_id)?;
            }
        }

        debug!(
            popped,
            remaining = heap.len(),
            converged = found.len(),
            loaded = self.nodes.len(),
            "paint finished"
        );
        Ok(found)
    }

    fn push_paint(
        &mut self,
        heap: &mut BinaryHeap<Queued>,
        non_white: &mut usize,
        id: &ObjectId,
    ) -> GraphResult<()> {
        let entry = self.queued(id)?;
        let node = self
            .nodes
            .get_mut(id)
            .ok_or(GraphError::UnknownNode(*id))?;
        node.queued += 1;
        if !node.flags.is_white() {
            *non_white += 1;
        }
        heap.push(entry);
        Ok(())
    }

    /// Visit every commit reachable from the tips, youngest first, at most
    /// once each. Stops as soon as `visitor` returns `true`.
    pub fn visit_commits<F>(&mut self, mut visitor: F) -> GraphResult<()>
    where
        F: FnMut(&CommitNode) -> bool,
    {
        for node in self.nodes.values_mut() {
            node.flags.remove(NodeFlags::SEEN);
        }

        let mut heap = BinaryHeap::new();
        for tip in self.tips.clone() {
            self.mark_seen(&mut heap, &tip)?;
        }

        let mut visited = 0usize;
        while let Some(Queued { id, .. }) = heap.pop() {
            let node = self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))?;
            visited += 1;
            if visitor(node) {
                debug!(visited, commit = %id.short_hex(), "visit stopped by visitor");
                return Ok(());
            }
            for parent in self.load_parents(&id)? {
                self.mark_seen(&mut heap, &parent)?;
            }
        }
        debug!(visited, "visit finished");
        Ok(())
    }

    fn mark_seen(&mut self, heap: &mut BinaryHeap<Queued>, id: &ObjectId) -> GraphResult<()> {
        let entry = self.queued(id)?;
        let node = self
            .nodes
            .get_mut(id)
            .ok_or(GraphError::UnknownNode(*id))?;
        if !node.flags.contains(NodeFlags::SEEN) {
            node.flags.insert(NodeFlags::SEEN);
            heap.push(entry);
        }
        Ok(())
    }
}

impl<S: ObjectSource> std::fmt::Debug for CommitGraph<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitGraph")
            .field("nodes", &self.nodes.len())
            .field("tips", &self.tips)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odb_object::{Commit, InMemoryObjectSource, ObjectKind, Signature};

    fn commit(store: &InMemoryObjectSource, parents: &[ObjectId], time: i64, msg: &str) -> ObjectId {
        let tree = store.insert(ObjectKind::Tree, Vec::new());
        let sig = Signature::new("Walker", "walker@example.com", time, 0);
        store.insert_commit(&Commit::new(tree, parents.to_vec(), sig.clone(), sig, msg))
    }

    #[test]
    fn diamond_visits_shared_ancestor_once_and_last() {
        let store = InMemoryObjectSource::new();
        let a = commit(&store, &[], 100, "a\n");
        let b = commit(&store, &[a], 300, "b\n");
        let c = commit(&store, &[a], 200, "c\n");
        let d = commit(&store, &[b, c], 400, "d\n");

        let mut graph = CommitGraph::new(&store);
        graph.add_tip(d).unwrap();
        let mut order = Vec::new();
        graph
            .visit_commits(|node| {
                order.push(node.id);
                false
            })
            .unwrap();
        assert_eq!(order, vec![d, b, c, a]);

        // A second walk starts from a clean visited state.
        let mut again = 0;
        graph
            .visit_commits(|_| {
                again += 1;
                false
            })
            .unwrap();
        assert_eq!(again, 4);
    }

    #[test]
    fn visit_stops_when_visitor_returns_true() {
        let store = InMemoryObjectSource::new();
        let a = commit(&store, &[], 100, "a\n");
        let b = commit(&store, &[a], 200, "b\n");
        let c = commit(&store, &[b], 300, "c\n");

        let mut graph = CommitGraph::new(&store);
        graph.add_tip(c).unwrap();
        let mut seen = Vec::new();
        graph
            .visit_commits(|node| {
                seen.push(node.id);
                node.id == b
            })
            .unwrap();
        assert_eq!(seen, vec![c, b]);
        // b's parents were never needed.
        assert!(graph.node(&b).unwrap().parents().is_none());
    }

    #[test]
    fn equal_times_break_ties_by_id() {
        let store = InMemoryObjectSource::new();
        let root = commit(&store, &[], 100, "root\n");
        let x = commit(&store, &[root], 200, "x\n");
        let y = commit(&store, &[root], 200, "y\n");
        let tip = commit(&store, &[x, y], 300, "tip\n");

        let mut graph = CommitGraph::new(&store);
        graph.add_tip(tip).unwrap();
        let mut order = Vec::new();
        graph
            .visit_commits(|node| {
                order.push(node.id);
                false
            })
            .unwrap();
        let (hi, lo) = if x > y { (x, y) } else { (y, x) };
        assert_eq!(order, vec![tip, hi, lo, root]);
    }

    #[test]
    fn paint_marks_common_ancestor_white() {
        let store = InMemoryObjectSource::new();
        let base = commit(&store, &[], 50, "base\n");
        let root = commit(&store, &[base], 100, "root\n");
        let a = commit(&store, &[root], 200, "a\n");
        let a2 = commit(&store, &[a], 300, "a2\n");
        let b = commit(&store, &[root], 250, "b\n");

        let mut graph = CommitGraph::new(&store);
        graph.add_tip_with_flags(a2, NodeFlags::RED).unwrap();
        graph.add_tip_with_flags(b, NodeFlags::GREEN).unwrap();
        let found = graph.paint_down_to_common().unwrap();

        assert_eq!(found, vec![root]);
        assert!(graph.node(&root).unwrap().flags.is_white());
        assert!(graph.node(&base).unwrap().flags.is_white());
        assert_eq!(graph.node(&a).unwrap().flags.colors(), NodeFlags::RED);
        assert_eq!(graph.node(&b).unwrap().flags.colors(), NodeFlags::GREEN);
    }

    #[test]
    fn paint_without_common_history_drains_the_queue() {
        let store = InMemoryObjectSource::new();
        let left = commit(&store, &[], 100, "left\n");
        let right = commit(&store, &[], 200, "right\n");

        let mut graph = CommitGraph::new(&store);
        graph.add_tip_with_flags(left, NodeFlags::RED).unwrap();
        graph.add_tip_with_flags(right, NodeFlags::GREEN).unwrap();
        assert!(graph.paint_down_to_common().unwrap().is_empty());
        assert!(!graph.node(&left).unwrap().flags.is_white());
    }

    #[test]
    fn paint_handles_long_histories() {
        let store = InMemoryObjectSource::new();
        let mut chain = Vec::with_capacity(10_000);
        let mut parent: Option<ObjectId> = None;
        for i in 0..10_000i64 {
            let parents: Vec<ObjectId> = parent.into_iter().collect();
            let id = commit(&store, &parents, 1_000 + i, &format!("c{i}\n"));
            chain.push(id);
            parent = Some(id);
        }
        let side = commit(&store, &[chain[0]], 50_000, "side\n");

        let mut graph = CommitGraph::new(&store);
        graph.add_tip_with_flags(chain[9_999], NodeFlags::RED).unwrap();
        graph.add_tip_with_flags(side, NodeFlags::GREEN).unwrap();
        let found = graph.paint_down_to_common().unwrap();

        assert_eq!(found, vec![chain[0]]);
        assert_eq!(graph.len(), 10_001);
        assert!(graph.node(&chain[0]).unwrap().flags.is_white());

        let mut count = 0;
        graph
            .visit_commits(|_| {
                count += 1;
                false
            })
            .unwrap();
        assert_eq!(count, 10_001);
    }

    #[test]
    fn non_commit_tip_is_rejected() {
        let store = InMemoryObjectSource::new();
        let blob = store.insert(ObjectKind::Blob, b"not a commit".to_vec());
        let mut graph = CommitGraph::new(&store);
        let err = graph.add_tip(blob).unwrap_err();
        assert!(matches!(
            err,
            GraphError::NotACommit { kind: ObjectKind::Blob, .. }
        ));
    }

    #[test]
    fn missing_parent_aborts_the_walk() {
        let store = InMemoryObjectSource::new();
        let ghost = ObjectId::from_raw([0x42; 20]);
        let tip = commit(&store, &[ghost], 100, "orphan\n");

        let mut graph = CommitGraph::new(&store);
        graph.add_tip(tip).unwrap();
        let err = graph.visit_commits(|_| false).unwrap_err();
        match err {
            GraphError::Source { id, .. } => assert_eq!(id, ghost),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn set_flags_requires_a_loaded_node() {
        let store = InMemoryObjectSource::new();
        let mut graph = CommitGraph::new(&store);
        let err = graph
            .set_flags(&ObjectId::null(), NodeFlags::RED)
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownNode(_)));
    }
}
