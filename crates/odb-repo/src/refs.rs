//! Refs on disk: loose files under the git directory plus `packed-refs`.
//!
//! Loose refs shadow packed ones of the same name. Lines in `packed-refs`
//! are `<hex> <name>`; comments (`#`) and peeled lines (`^`) are skipped.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use odb_types::ObjectId;
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{RepoError, RepoResult};
use crate::names::validate_ref_name;
use crate::traits::RefStore;
use crate::types::Ref;

pub const PACKED_REFS: &str = "packed-refs";

/// A [`RefStore`] reading a git directory.
#[derive(Clone, Debug)]
pub struct FileRefStore {
    git_dir: PathBuf,
}

impl FileRefStore {
    pub fn new(git_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
        }
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn read_loose(&self, name: &str) -> RepoResult<Option<Ref>> {
        let path = self.git_dir.join(name);
        if !path.is_file() {
            return Ok(None);
        }
        match fs::read_to_string(&path) {
            Ok(contents) => Ref::parse(name, &contents).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Every entry of `packed-refs`; empty when the file is absent.
    pub fn read_packed(&self) -> RepoResult<Vec<Ref>> {
        let contents = match fs::read_to_string(self.git_dir.join(PACKED_REFS)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        parse_packed_refs(&contents)
    }

    fn loose_refs(&self) -> RepoResult<Vec<Ref>> {
        let root = self.git_dir.join("refs");
        if !root.is_dir() {
            return Ok(Vec::new());
        }

        let mut refs = Vec::new();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                RepoError::Io(
                    e.into_io_error()
                        .unwrap_or_else(|| io::Error::other("ref directory loop")),
                )
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.git_dir) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if validate_ref_name(&name).is_err() {
                continue;
            }
            match fs::read_to_string(entry.path())
                .map_err(RepoError::from)
                .and_then(|contents| Ref::parse(&name, &contents))
            {
                Ok(found) => refs.push(found),
                Err(e) => warn!("skipping unreadable ref {name}: {e}"),
            }
        }
        Ok(refs)
    }
}

impl RefStore for FileRefStore {
    fn read_ref(&self, name: &str) -> RepoResult<Option<Ref>> {
        validate_ref_name(name)?;
        if let Some(found) = self.read_loose(name)? {
            return Ok(Some(found));
        }
        Ok(self.read_packed()?.into_iter().find(|r| r.name == name))
    }

    fn list_refs(&self, prefix: &str) -> RepoResult<Vec<Ref>> {
        let mut all: BTreeMap<String, Ref> = BTreeMap::new();
        for packed in self.read_packed()? {
            all.insert(packed.name.clone(), packed);
        }
        for loose in self.loose_refs()? {
            all.insert(loose.name.clone(), loose);
        }
        Ok(all
            .into_values()
            .filter(|r| r.name.starts_with(prefix))
            .collect())
    }
}

/// Parse the contents of a `packed-refs` file.
pub fn parse_packed_refs(contents: &str) -> RepoResult<Vec<Ref>> {
    let mut refs = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') || line.starts_with('^') {
            continue;
        }
        let malformed = |reason: String| RepoError::MalformedRef {
            name: PACKED_REFS.to_string(),
            reason: format!("line {}: {reason}", lineno + 1),
        };
        let (hex, name) = line
            .split_once(' ')
            .ok_or_else(|| malformed("expected '<id> <name>'".into()))?;
        let id = ObjectId::from_hex(hex).map_err(|e| malformed(e.to_string()))?;
        refs.push(Ref::direct(name, id));
    }
    Ok(refs)
}
