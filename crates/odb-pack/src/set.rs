use std::path::{Path, PathBuf};

use odb_object::ObjectKind;
use odb_types::ObjectId;
use tracing::{debug, warn};

use crate::error::PackResult;
use crate::pack::{BaseResolver, Pack, PackOptions};

/// Every pack under `objects/pack`, searched in path order.
#[derive(Debug, Default)]
pub struct PackSet {
    pack_dir: PathBuf,
    packs: Vec<Pack>,
}

impl PackSet {
    /// Load all packs below `objects_dir/pack`. Packs that fail to open are
    /// skipped with a warning; a missing directory yields an empty set.
    pub fn load(objects_dir: &Path, options: PackOptions) -> PackResult<Self> {
        let pack_dir = objects_dir.join("pack");
        let mut packs = Vec::new();

        if pack_dir.is_dir() {
            let mut paths = Vec::new();
            for entry in std::fs::read_dir(&pack_dir)? {
                let path = entry?.path();
                if path.extension().is_some_and(|e| e == "idx") {
                    paths.push(path);
                }
            }
            paths.sort();

            for path in paths {
                match Pack::open_with(&path, options) {
                    Ok(pack) => packs.push(pack),
                    Err(e) => warn!("skipping unreadable pack {:?}: {}", path, e),
                }
            }
        }

        debug!(dir = %pack_dir.display(), packs = packs.len(), "loaded packs");
        Ok(Self { pack_dir, packs })
    }

    pub fn from_packs(packs: Vec<Pack>) -> Self {
        Self {
            pack_dir: PathBuf::new(),
            packs,
        }
    }

    pub fn pack_dir(&self) -> &Path {
        &self.pack_dir
    }

    pub fn packs(&self) -> &[Pack] {
        &self.packs
    }

    pub fn pack_count(&self) -> usize {
        self.packs.len()
    }

    pub fn total_objects(&self) -> usize {
        self.packs.iter().map(Pack::len).sum()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.packs.iter().any(|p| p.contains(id))
    }

    /// Kind and payload of `id` from the first pack that has it.
    ///
    /// REF delta bases missing from that pack are looked up in the other
    /// packs and then in `external`. Bases found in another pack resolve
    /// their own chains against `external` only.
    pub fn read_raw(
        &self,
        id: &ObjectId,
        external: &dyn BaseResolver,
    ) -> PackResult<Option<(ObjectKind, Vec<u8>)>> {
        let Some(home) = self.packs.iter().position(|p| p.contains(id)) else {
            return Ok(None);
        };
        let resolver = CrossPack {
            set: self,
            skip: home,
            external,
        };
        self.packs[home].read_raw_with(id, &resolver).map(Some)
    }
}

struct CrossPack<'a> {
    set: &'a PackSet,
    skip: usize,
    external: &'a dyn BaseResolver,
}

impl BaseResolver for CrossPack<'_> {
    fn resolve_base(&self, id: &ObjectId) -> PackResult<Option<(ObjectKind, Vec<u8>)>> {
        for (i, pack) in self.set.packs.iter().enumerate() {
            if i != self.skip && pack.contains(id) {
                return pack.read_raw_with(id, self.external).map(Some);
            }
        }
        self.external.resolve_base(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{Delta, DeltaOp};
    use crate::fixture::PackBuilder;
    use crate::pack::NoExternalBases;
    use odb_object::hash_object;

    #[test]
    fn empty_set() {
        let set = PackSet::default();
        assert_eq!(set.pack_count(), 0);
        assert_eq!(set.total_objects(), 0);
        assert!(!set.contains(&ObjectId::null()));
        assert!(set
            .read_raw(&ObjectId::null(), &NoExternalBases)
            .unwrap()
            .is_none());
    }

    #[test]
    fn missing_pack_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = PackSet::load(dir.path(), PackOptions::default()).unwrap();
        assert_eq!(set.pack_count(), 0);
    }

    #[test]
    fn skips_broken_packs_and_reads_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let pack_dir = dir.path().join("pack");
        std::fs::create_dir_all(&pack_dir).unwrap();

        let mut builder = PackBuilder::new();
        let (id, _) = builder.add_object(ObjectKind::Blob, b"packed");
        builder.write(&pack_dir, "pack-good").unwrap();
        std::fs::write(pack_dir.join("pack-bad.idx"), b"garbage").unwrap();

        let set = PackSet::load(dir.path(), PackOptions::default()).unwrap();
        assert_eq!(set.pack_count(), 1);
        assert_eq!(set.total_objects(), 1);
        let (kind, body) = set.read_raw(&id, &NoExternalBases).unwrap().unwrap();
        assert_eq!(kind, ObjectKind::Blob);
        assert_eq!(body, b"packed");
    }

    #[test]
    fn ref_bases_resolve_across_packs() {
        let dir = tempfile::tempdir().unwrap();
        let pack_dir = dir.path().join("pack");
        std::fs::create_dir_all(&pack_dir).unwrap();

        let mut first = PackBuilder::new();
        let (base_id, _) = first.add_object(ObjectKind::Blob, b"shared base");
        first.write(&pack_dir, "pack-1").unwrap();

        let delta = Delta {
            source_size: 11,
            target_size: 6,
            ops: vec![DeltaOp::Copy { offset: 7, size: 4 }, DeltaOp::Insert(b"!!".to_vec())],
        };
        let target_id = hash_object(ObjectKind::Blob, b"base!!");
        let mut second = PackBuilder::new();
        second.add_ref_delta(target_id, base_id, &delta.encode());
        second.write(&pack_dir, "pack-2").unwrap();

        let set = PackSet::load(dir.path(), PackOptions::default()).unwrap();
        assert_eq!(set.pack_count(), 2);
        let (_, body) = set.read_raw(&target_id, &NoExternalBases).unwrap().unwrap();
        assert_eq!(body, b"base!!");
    }
}
