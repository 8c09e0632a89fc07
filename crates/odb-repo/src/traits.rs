//! The [`RefStore`] trait: read access to named refs, plus the lookup and
//! resolution rules shared by every backend.

use odb_types::ObjectId;
use tracing::debug;

use crate::error::{RepoError, RepoResult};
use crate::names::{is_special_name, validate_ref_name};
use crate::types::{Ref, RefTarget};

/// Storage backend for named refs.
///
/// The namespace follows git's layout: `HEAD` and other special names at
/// the top, then `refs/heads/*`, `refs/tags/*`, `refs/remotes/*`.
pub trait RefStore {
    /// Read a ref by its full name. `Ok(None)` if it does not exist.
    fn read_ref(&self, name: &str) -> RepoResult<Option<Ref>>;

    /// All refs whose full name starts with `prefix`, sorted by name.
    fn list_refs(&self, prefix: &str) -> RepoResult<Vec<Ref>>;

    /// Find the ref a user-supplied name refers to.
    ///
    /// `HEAD` and full names match exactly. Otherwise every ref whose full
    /// name ends in `/<name>` is a candidate; a single local branch wins,
    /// then a single candidate of any kind.
    fn open_ref(&self, name: &str) -> RepoResult<Ref> {
        validate_ref_name(name)?;
        let unknown = || RepoError::UnknownRef {
            name: name.to_string(),
        };

        if is_special_name(name) {
            return self.read_ref(name)?.ok_or_else(unknown);
        }
        if name.starts_with("refs/") {
            if let Some(found) = self.read_ref(name)? {
                return Ok(found);
            }
        }

        let suffix = format!("/{name}");
        let matches: Vec<Ref> = self
            .list_refs("refs/")?
            .into_iter()
            .filter(|r| r.name.ends_with(&suffix))
            .collect();

        let mut locals = matches.iter().filter(|r| r.is_branch());
        if let (Some(local), None) = (locals.next(), locals.next()) {
            return Ok(local.clone());
        }

        match matches.len() {
            0 => Err(unknown()),
            1 => Ok(matches.into_iter().next().ok_or_else(unknown)?),
            _ => Err(RepoError::AmbiguousRef {
                name: name.to_string(),
                candidates: matches.into_iter().map(|r| r.name).collect(),
            }),
        }
    }

    /// Resolve `name` to an object id, following at most `max_depth`
    /// symbolic links.
    fn resolve(&self, name: &str, max_depth: usize) -> RepoResult<ObjectId> {
        let mut current = self.open_ref(name)?;
        let mut depth = 0;
        loop {
            match current.target {
                RefTarget::Direct(id) => {
                    debug!(name, depth, id = %id.short_hex(), "resolved ref");
                    return Ok(id);
                }
                RefTarget::Symbolic(target) => {
                    depth += 1;
                    if depth > max_depth {
                        return Err(RepoError::SymbolicRefCycle {
                            name: name.to_string(),
                            depth: max_depth,
                        });
                    }
                    validate_ref_name(&target)?;
                    current = self
                        .read_ref(&target)?
                        .ok_or(RepoError::UnknownRef { name: target })?;
                }
            }
        }
    }

    /// Local branches.
    fn branches(&self) -> RepoResult<Vec<Ref>> {
        self.list_refs("refs/heads/")
    }

    /// Tags.
    fn tags(&self) -> RepoResult<Vec<Ref>> {
        self.list_refs("refs/tags/")
    }
}

impl<T: RefStore + ?Sized> RefStore for &T {
    fn read_ref(&self, name: &str) -> RepoResult<Option<Ref>> {
        (**self).read_ref(name)
    }

    fn list_refs(&self, prefix: &str) -> RepoResult<Vec<Ref>> {
        (**self).list_refs(prefix)
    }
}
