use std::fmt;
use std::path::{Path, PathBuf};

use odb_object::{Object, ObjectHasher, ObjectKind};
use odb_types::ObjectId;
use tracing::{debug, error};

use crate::delta::{apply_delta, Delta};
use crate::error::{PackError, PackResult};
use crate::file::{EntryKind, PackEntry, PackFile};
use crate::index::PackIndex;

/// Default limit on delta chain length.
pub const DEFAULT_MAX_DELTA_CHAIN: usize = 4096;

/// Supplies REF delta bases that are not in the pack being read.
pub trait BaseResolver {
    /// Kind and full payload of `id`, or `None` when it is unknown here too.
    fn resolve_base(&self, id: &ObjectId) -> PackResult<Option<(ObjectKind, Vec<u8>)>>;
}

/// Resolver for self-contained packs.
pub struct NoExternalBases;

impl BaseResolver for NoExternalBases {
    fn resolve_base(&self, _id: &ObjectId) -> PackResult<Option<(ObjectKind, Vec<u8>)>> {
        Ok(None)
    }
}

impl<F> BaseResolver for F
where
    F: Fn(&ObjectId) -> PackResult<Option<(ObjectKind, Vec<u8>)>>,
{
    fn resolve_base(&self, id: &ObjectId) -> PackResult<Option<(ObjectKind, Vec<u8>)>> {
        self(id)
    }
}

/// Options applied when opening a pack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackOptions {
    pub max_delta_chain: usize,
    /// Recompute the pack SHA-1 on open and reject mismatches.
    pub verify_checksum: bool,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            max_delta_chain: DEFAULT_MAX_DELTA_CHAIN,
            verify_checksum: false,
        }
    }
}

/// An index paired with its pack data.
#[derive(Debug)]
pub struct Pack {
    index: PackIndex,
    file: PackFile,
    options: PackOptions,
}

impl Pack {
    /// Open `<base>.idx` and `<base>.pack`. `base` may carry either
    /// extension.
    pub fn open(base: &Path) -> PackResult<Self> {
        Self::open_with(base, PackOptions::default())
    }

    pub fn open_with(base: &Path, options: PackOptions) -> PackResult<Self> {
        let base = strip_pack_extension(base);
        let index = PackIndex::open(&base)?;
        let file = PackFile::open(&base)?;
        if options.verify_checksum && file.checksum() != file.compute_checksum() {
            return Err(PackError::ChecksumMismatch {
                path: file.path().to_path_buf(),
            });
        }
        Ok(Self {
            index,
            file,
            options,
        })
    }

    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    pub fn file(&self) -> &PackFile {
        &self.file
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.index.contains(id)
    }

    /// Read and fully resolve `id`, which must be in this pack.
    pub fn read_object(&self, id: &ObjectId) -> PackResult<Object> {
        self.read_object_with(id, &NoExternalBases)
    }

    pub fn read_object_with(&self, id: &ObjectId, bases: &dyn BaseResolver) -> PackResult<Object> {
        let (kind, body) = self.read_raw_with(id, bases)?;
        Ok(Object::from_bytes(kind, body)?)
    }

    /// Read the object whose entry starts at `offset`.
    pub fn read_object_at(&self, offset: u64) -> PackResult<Object> {
        let (kind, body) = self.resolve(offset, &NoExternalBases)?;
        Ok(Object::from_bytes(kind, body)?)
    }

    /// Kind and payload of `id` after delta resolution.
    pub fn read_raw(&self, id: &ObjectId) -> PackResult<(ObjectKind, Vec<u8>)> {
        self.read_raw_with(id, &NoExternalBases)
    }

    pub fn read_raw_with(
        &self,
        id: &ObjectId,
        bases: &dyn BaseResolver,
    ) -> PackResult<(ObjectKind, Vec<u8>)> {
        let offset = self.index.find_offset(id)?;
        self.resolve(offset, bases).inspect_err(|e| {
            if e.is_corruption() {
                error!(
                    id = %id,
                    pack = %self.path().display(),
                    offset,
                    error = %e,
                    "corrupt pack object"
                );
            }
        })
    }

    /// Follow the delta chain from `offset` down to a full object, then
    /// replay the deltas from the base up.
    fn resolve(&self, offset: u64, bases: &dyn BaseResolver) -> PackResult<(ObjectKind, Vec<u8>)> {
        let mut chain: Vec<PackEntry> = Vec::new();
        let mut entry = self.file.entry_at(offset)?;

        let (kind, mut current) = loop {
            if chain.len() > self.options.max_delta_chain {
                return Err(PackError::CorruptEntry {
                    offset,
                    reason: format!(
                        "delta chain longer than {}",
                        self.options.max_delta_chain
                    ),
                });
            }
            match entry.kind {
                EntryKind::Object(kind) => break (kind, self.file.inflate(&entry)?),
                EntryKind::OfsDelta { base_offset } => {
                    chain.push(entry);
                    entry = self.file.entry_at(base_offset)?;
                }
                EntryKind::RefDelta { base } => {
                    chain.push(entry);
                    match self.index.find_offset(&base) {
                        Ok(base_offset) => entry = self.file.entry_at(base_offset)?,
                        Err(PackError::ObjectNotFound(_)) => match bases.resolve_base(&base)? {
                            Some(found) => break found,
                            None => return Err(PackError::DanglingDelta(base)),
                        },
                        Err(e) => return Err(e),
                    }
                }
            }
        };

        if !chain.is_empty() {
            debug!(offset, depth = chain.len(), kind = %kind, "resolving delta chain");
        }

        let mut scratch = Vec::new();
        for link in chain.iter().rev() {
            let delta = self.file.inflate(link)?;
            apply_delta(&current, &delta, &mut scratch)?;
            std::mem::swap(&mut current, &mut scratch);
        }
        Ok((kind, current))
    }

    /// Header, delta metadata and instruction listing for the entry at
    /// `offset`.
    pub fn describe(&self, offset: u64) -> PackResult<EntryDescription> {
        let entry = self.file.entry_at(offset)?;
        let delta = match entry.kind {
            EntryKind::Object(_) => None,
            _ => Some(Delta::parse(&self.file.inflate(&entry)?)?),
        };
        Ok(EntryDescription { entry, delta })
    }

    /// Check the pack trailer, every entry's CRC32 (v2 indexes only), and
    /// that every resolvable entry hashes to its indexed id.
    pub fn verify(&self) -> PackResult<VerifyReport> {
        let expected = self.file.checksum();
        let actual = self.file.compute_checksum();

        let mut offsets = Vec::with_capacity(self.index.len());
        for (pos, id) in self.index.iter() {
            offsets.push((self.index.offset(pos)?, pos, id));
        }
        offsets.sort_unstable();

        let mut crc_checked = 0;
        let mut crc_mismatches = Vec::new();
        for (i, &(offset, pos, id)) in offsets.iter().enumerate() {
            let Some(stored) = self.index.crc32(pos)? else {
                continue;
            };
            let end = offsets
                .get(i + 1)
                .map_or(self.file.data_end(), |&(next, _, _)| next);
            let raw = self.file.bytes(offset, end)?;
            crc_checked += 1;
            if crc32fast::hash(raw) != stored {
                crc_mismatches.push(id);
            }
        }

        let mut hash_checked = 0;
        let mut hash_mismatches = Vec::new();
        for &(offset, _, id) in &offsets {
            match self.resolve(offset, &NoExternalBases) {
                Ok((kind, body)) => {
                    hash_checked += 1;
                    if !ObjectHasher::verify(kind, &body, &id) {
                        hash_mismatches.push(id);
                    }
                }
                // Thin pack: the base lives elsewhere.
                Err(PackError::DanglingDelta(_)) => {}
                Err(e) => {
                    debug!(id = %id, offset, error = %e, "unreadable pack entry");
                    hash_checked += 1;
                    hash_mismatches.push(id);
                }
            }
        }

        Ok(VerifyReport {
            path: self.path().to_path_buf(),
            objects: self.index.len(),
            checksum_ok: expected == actual,
            index_matches_pack: self.index.pack_checksum() == expected,
            crc_checked,
            crc_mismatches,
            hash_checked,
            hash_mismatches,
        })
    }
}

fn strip_pack_extension(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == "idx" || ext == "pack" => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}

/// Output of [`Pack::describe`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryDescription {
    pub entry: PackEntry,
    pub delta: Option<Delta>,
}

impl fmt::Display for EntryDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry = &self.entry;
        writeln!(f, "offset:  {}", entry.offset)?;
        writeln!(f, "type:    {}", entry.kind)?;
        writeln!(f, "size:    {}", entry.size)?;
        writeln!(f, "header:  {} bytes", entry.header_len())?;
        if let Some(delta) = &self.delta {
            writeln!(f, "source:  {}", delta.source_size)?;
            writeln!(f, "target:  {}", delta.target_size)?;
            for op in &delta.ops {
                writeln!(f, "  {op}")?;
            }
        }
        Ok(())
    }
}

/// Outcome of [`Pack::verify`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyReport {
    pub path: PathBuf,
    pub objects: usize,
    /// The trailing SHA-1 matches the pack contents.
    pub checksum_ok: bool,
    /// The index trailer names this pack's checksum.
    pub index_matches_pack: bool,
    /// Entries whose CRC32 was checked (zero for v1 indexes).
    pub crc_checked: usize,
    pub crc_mismatches: Vec<ObjectId>,
    /// Entries resolved and re-hashed. REF deltas on external bases are skipped.
    pub hash_checked: usize,
    /// Entries that failed to resolve or hash to a different id.
    pub hash_mismatches: Vec<ObjectId>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.checksum_ok
            && self.index_matches_pack
            && self.crc_mismatches.is_empty()
            && self.hash_mismatches.is_empty()
    }
}
