//! Commit ancestry graph for the object database.
//!
//! Commits are loaded lazily from any [`ObjectSource`](odb_object::ObjectSource)
//! and walked in committer-time order:
//!
//! - [`CommitGraph::paint_down_to_common`] propagates colour flags from the
//!   tips and reports where the colours meet.
//! - [`CommitGraph::visit_commits`] visits each reachable commit once.

pub mod error;
pub mod flags;
pub mod graph;
pub mod node;

pub use error::{GraphError, GraphResult};
pub use flags::NodeFlags;
pub use graph::CommitGraph;
pub use node::CommitNode;
