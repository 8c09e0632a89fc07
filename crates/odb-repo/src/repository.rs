//! The repository façade: object lookup across loose and packed storage,
//! ref resolution, and the small extras a hosting service needs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use odb_graph::{CommitGraph, NodeFlags};
use odb_object::{loose, Object, ObjectError, ObjectKind, ObjectSource};
use odb_pack::{BaseResolver, PackResult, PackSet};
use odb_types::{ObjectId, ID_HEX_LEN};
use tracing::{debug, error};

use crate::config::RepoConfig;
use crate::error::{RepoError, RepoResult};
use crate::refs::FileRefStore;
use crate::traits::RefStore;
use crate::types::Ref;

/// A git directory opened for reading.
#[derive(Debug)]
pub struct Repository {
    path: PathBuf,
    config: RepoConfig,
    packs: PackSet,
    refs: FileRefStore,
}

/// `objects/` plus either `HEAD` or `refs/`.
fn looks_like_git_dir(path: &Path) -> bool {
    path.join("objects").is_dir() && (path.join("HEAD").is_file() || path.join("refs").is_dir())
}

impl Repository {
    /// Open the git directory at `path`. Packs are indexed once here.
    pub fn open(path: impl AsRef<Path>, config: RepoConfig) -> RepoResult<Self> {
        let path = path.as_ref();
        if !looks_like_git_dir(path) {
            return Err(RepoError::NotARepository {
                path: path.to_path_buf(),
            });
        }
        let path = fs::canonicalize(path)?;
        let packs = PackSet::load(&path.join("objects"), config.pack_options())?;
        debug!(
            path = %path.display(),
            packs = packs.pack_count(),
            packed_objects = packs.total_objects(),
            "opened repository"
        );
        Ok(Self {
            refs: FileRefStore::new(&path),
            path,
            config,
            packs,
        })
    }

    /// Walk up from `start` looking for `.git` or a bare git directory.
    pub fn discover(start: impl AsRef<Path>, config: RepoConfig) -> RepoResult<Self> {
        let start = start.as_ref();
        for dir in start.ancestors() {
            let dot_git = dir.join(".git");
            if looks_like_git_dir(&dot_git) {
                return Self::open(dot_git, config);
            }
            if looks_like_git_dir(dir) {
                return Self::open(dir, config);
            }
        }
        Err(RepoError::NotARepository {
            path: start.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn packs(&self) -> &PackSet {
        &self.packs
    }

    pub fn refs(&self) -> &FileRefStore {
        &self.refs
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.path.join("objects")
    }

    // ---------------------------------------------------------------
    // Objects
    // ---------------------------------------------------------------

    /// Open `id` from loose storage, falling back to the packs.
    pub fn open_object(&self, id: &ObjectId) -> RepoResult<Object> {
        let objects_dir = self.objects_dir();
        let path = loose::loose_path(&objects_dir, id);
        match loose::open(&path) {
            Ok(object) => return Ok(object),
            Err(ObjectError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                error!(
                    id = %id,
                    path = %path.display(),
                    error = %e,
                    "corrupt loose object"
                );
                return Err(e.into());
            }
        }

        let bases = LooseBases {
            objects_dir: &objects_dir,
        };
        match self.packs.read_raw(id, &bases)? {
            Some((kind, body)) => Ok(Object::from_bytes(kind, body)?),
            None => Err(RepoError::ObjectNotFound(*id)),
        }
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        loose::loose_path(&self.objects_dir(), id).is_file() || self.packs.contains(id)
    }

    /// Target of a symlink blob.
    pub fn readlink(&self, id: &ObjectId) -> RepoResult<String> {
        let blob = match self.open_object(id)? {
            Object::Blob(blob) => blob,
            other => {
                return Err(RepoError::WrongKind {
                    id: *id,
                    actual: other.kind(),
                    expected: ObjectKind::Blob,
                })
            }
        };
        let limit = self.config.max_link_size;
        if blob.size() > limit {
            return Err(RepoError::LinkTooLarge {
                id: *id,
                size: blob.size(),
                limit,
            });
        }
        let bytes = blob.into_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    // ---------------------------------------------------------------
    // Refs
    // ---------------------------------------------------------------

    pub fn open_ref(&self, name: &str) -> RepoResult<Ref> {
        self.refs.open_ref(name)
    }

    /// Resolve a ref name, or a full hex id, to an object id.
    pub fn resolve(&self, name: &str) -> RepoResult<ObjectId> {
        match full_hex_id(name) {
            Some(id) => Ok(id),
            None => self.refs.resolve(name, self.config.max_symref_depth),
        }
    }

    /// Like [`resolve`](Self::resolve), also returning the ref that matched.
    /// A full hex id matches no ref.
    pub fn rev_parse(&self, name: &str) -> RepoResult<(Option<Ref>, ObjectId)> {
        if let Some(id) = full_hex_id(name) {
            return Ok((None, id));
        }
        let found = self.refs.open_ref(name)?;
        let id = self.refs.resolve(&found.name, self.config.max_symref_depth)?;
        Ok((Some(found), id))
    }

    /// Every ref under `refs/`, sorted by name.
    pub fn list_refs(&self) -> RepoResult<Vec<Ref>> {
        self.refs.list_refs("refs/")
    }

    // ---------------------------------------------------------------
    // Metadata
    // ---------------------------------------------------------------

    /// Contents of the `description` file; empty when there is none.
    pub fn read_description(&self) -> String {
        fs::read_to_string(self.path.join("description")).unwrap_or_default()
    }

    pub fn has_annex(&self) -> bool {
        self.path.join("annex").is_dir()
    }

    // ---------------------------------------------------------------
    // History
    // ---------------------------------------------------------------

    pub fn commit_graph(&self) -> CommitGraph<&Self> {
        CommitGraph::new(self)
    }

    /// Commits where the histories of `a` and `b` meet.
    pub fn merge_base_candidates(&self, a: &ObjectId, b: &ObjectId) -> RepoResult<Vec<ObjectId>> {
        let mut graph = self.commit_graph();
        graph.add_tip_with_flags(*a, NodeFlags::RED)?;
        graph.add_tip_with_flags(*b, NodeFlags::GREEN)?;
        Ok(graph.paint_down_to_common()?)
    }
}

impl ObjectSource for Repository {
    type Error = RepoError;

    fn open_object(&self, id: &ObjectId) -> RepoResult<Object> {
        Repository::open_object(self, id)
    }
}

fn full_hex_id(name: &str) -> Option<ObjectId> {
    if name.len() != ID_HEX_LEN {
        return None;
    }
    ObjectId::from_hex(name).ok()
}

/// REF delta bases from loose storage.
struct LooseBases<'a> {
    objects_dir: &'a Path,
}

impl BaseResolver for LooseBases<'_> {
    fn resolve_base(&self, id: &ObjectId) -> PackResult<Option<(ObjectKind, Vec<u8>)>> {
        match loose::read_raw(&loose::loose_path(self.objects_dir, id)) {
            Ok(raw) => Ok(Some(raw)),
            Err(ObjectError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    #[test]
    fn open_rejects_plain_directories() {
        let dir = tempfile::tempdir().unwrap();
        let err = Repository::open(dir.path(), RepoConfig::default()).unwrap_err();
        assert!(matches!(err, RepoError::NotARepository { .. }));

        fs::create_dir(dir.path().join("objects")).unwrap();
        assert!(Repository::open(dir.path(), RepoConfig::default()).is_err());

        fs::create_dir(dir.path().join("refs")).unwrap();
        assert!(Repository::open(dir.path(), RepoConfig::default()).is_ok());
    }

    #[test]
    fn discover_finds_dot_git_above() {
        let dir = tempfile::tempdir().unwrap();
        let git_dir = dir.path().join(".git");
        fs::create_dir_all(git_dir.join("objects")).unwrap();
        fs::write(git_dir.join("HEAD"), "ref: refs/heads/master\n").unwrap();
        let nested = dir.path().join("src/deep");
        fs::create_dir_all(&nested).unwrap();

        let repo = Repository::discover(&nested, RepoConfig::default()).unwrap();
        assert_eq!(repo.path(), fs::canonicalize(&git_dir).unwrap());
    }

    #[test]
    fn discover_fails_outside_repositories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Repository::discover(dir.path(), RepoConfig::default()).unwrap_err(),
            RepoError::NotARepository { .. }
        ));
    }

    #[test]
    fn corrupt_loose_object_is_internal() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("objects")).unwrap();
        fs::create_dir_all(dir.path().join("refs")).unwrap();
        let repo = Repository::open(dir.path(), RepoConfig::default()).unwrap();

        let id = ObjectId::from_raw([0x5a; 20]);
        let path = loose::loose_path(&repo.objects_dir(), &id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not a zlib stream").unwrap();

        let err = repo.open_object(&id).unwrap_err();
        assert!(matches!(err, RepoError::Object(ObjectError::Io(_))), "{err:?}");
        assert_eq!(err.class(), ErrorClass::Internal);

        fs::write(&path, loose::encode(ObjectKind::Blob, b"x").unwrap()[..4].to_vec()).unwrap();
        let err = repo.open_object(&id).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Internal);
        assert!(!err.is_not_found());
    }

    #[test]
    fn description_and_annex() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("objects")).unwrap();
        fs::create_dir_all(dir.path().join("refs")).unwrap();
        let repo = Repository::open(dir.path(), RepoConfig::default()).unwrap();
        assert_eq!(repo.read_description(), "");
        assert!(!repo.has_annex());

        fs::write(dir.path().join("description"), "test repository\n").unwrap();
        fs::create_dir(dir.path().join("annex")).unwrap();
        assert_eq!(repo.read_description(), "test repository\n");
        assert!(repo.has_annex());
    }
}
