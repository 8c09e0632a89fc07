//! Core ref types.
//!
//! A ref is a name under the git directory pointing either straight at an
//! object or, symbolically, at another ref.

use std::fmt;

use odb_types::ObjectId;

use crate::error::{RepoError, RepoResult};

/// What a ref points at.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RefTarget {
    /// An object id.
    Direct(ObjectId),
    /// The full name of another ref (`ref: refs/heads/main`).
    Symbolic(String),
}

/// Where a ref lives in the `refs/` hierarchy.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// A top-level name such as `HEAD`.
    Special,
    /// `refs/heads/*`, a local branch.
    Branch,
    /// Any other `refs/<ns>/*`, for example `tags` or `remotes`.
    Other(String),
}

/// A named ref, identified by its full name (e.g. `refs/heads/main`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ref {
    pub name: String,
    pub target: RefTarget,
}

impl Ref {
    pub fn new(name: impl Into<String>, target: RefTarget) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }

    pub fn direct(name: impl Into<String>, id: ObjectId) -> Self {
        Self::new(name, RefTarget::Direct(id))
    }

    pub fn symbolic(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, RefTarget::Symbolic(target.into()))
    }

    /// Parse the contents of a loose ref file: `ref: <name>` or a hex id.
    pub fn parse(name: &str, contents: &str) -> RepoResult<Self> {
        if let Some(symbol) = contents.strip_prefix("ref:") {
            let symbol = symbol.trim();
            if symbol.is_empty() {
                return Err(RepoError::MalformedRef {
                    name: name.to_string(),
                    reason: "empty symbolic target".into(),
                });
            }
            return Ok(Self::symbolic(name, symbol));
        }
        let id = ObjectId::from_hex(contents).map_err(|_| RepoError::MalformedRef {
            name: name.to_string(),
            reason: format!("unknown ref contents {:?}", contents.trim()),
        })?;
        Ok(Self::direct(name, id))
    }

    pub fn namespace(&self) -> Namespace {
        let mut parts = self.name.split('/');
        match (parts.next(), parts.next()) {
            (_, None) => Namespace::Special,
            (_, Some("heads")) => Namespace::Branch,
            (_, Some(ns)) => Namespace::Other(ns.to_string()),
        }
    }

    /// The name without `refs/<ns>/`.
    pub fn short_name(&self) -> &str {
        self.name.splitn(3, '/').nth(2).unwrap_or(&self.name)
    }

    pub fn is_branch(&self) -> bool {
        self.namespace() == Namespace::Branch
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self.target, RefTarget::Symbolic(_))
    }

    /// The id for a direct ref.
    pub fn id(&self) -> Option<ObjectId> {
        match self.target {
            RefTarget::Direct(id) => Some(id),
            RefTarget::Symbolic(_) => None,
        }
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            RefTarget::Direct(id) => write!(f, "{id} {}", self.name),
            RefTarget::Symbolic(target) => write!(f, "ref: {target} {}", self.name),
        }
    }
}
