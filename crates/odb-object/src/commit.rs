use std::fmt::Write as _;

use odb_types::ObjectId;

use crate::error::{ObjectError, ObjectResult};
use crate::hasher::hash_object;
use crate::header::{header_id, split_headers};
use crate::object::ObjectKind;
use crate::signature::Signature;

/// A parsed commit object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    /// Payload size in bytes.
    pub size: u64,
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    /// Everything after the blank line that ends the headers, verbatim.
    pub message: String,
}

impl Commit {
    /// Build a commit; `size` is taken from its canonical encoding.
    pub fn new(
        tree: ObjectId,
        parents: Vec<ObjectId>,
        author: Signature,
        committer: Signature,
        message: &str,
    ) -> Self {
        let mut commit = Self {
            size: 0,
            tree,
            parents,
            author,
            committer,
            message: message.to_string(),
        };
        commit.size = commit.encode().len() as u64;
        commit
    }

    /// Parse a commit body of `size` bytes.
    pub fn parse(size: u64, body: &[u8]) -> ObjectResult<Self> {
        let (headers, message) = split_headers(body);

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        for (key, value) in headers {
            match key {
                b"tree" => tree = Some(header_id("tree", value)?),
                b"parent" => parents.push(header_id("parent", value)?),
                b"author" => author = Some(Signature::parse(&String::from_utf8_lossy(value))?),
                b"committer" => {
                    committer = Some(Signature::parse(&String::from_utf8_lossy(value))?)
                }
                _ => {}
            }
        }

        let missing = |key: &str| ObjectError::MalformedHeader(format!("commit without {key}"));
        Ok(Self {
            size,
            tree: tree.ok_or_else(|| missing("tree"))?,
            parents,
            author: author.ok_or_else(|| missing("author"))?,
            committer: committer.ok_or_else(|| missing("committer"))?,
            message: String::from_utf8_lossy(message).into_owned(),
        })
    }

    /// Canonical payload, as hashed and stored by git.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        let _ = writeln!(out, "tree {}", self.tree);
        for parent in &self.parents {
            let _ = writeln!(out, "parent {parent}");
        }
        let _ = writeln!(out, "author {}", self.author);
        let _ = write!(out, "committer {}\n\n{}", self.committer, self.message);
        out.into_bytes()
    }

    /// The id of this commit's canonical encoding.
    pub fn id(&self) -> ObjectId {
        hash_object(ObjectKind::Commit, &self.encode())
    }

    /// The first line of the message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}
