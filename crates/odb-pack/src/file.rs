use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use memmap2::Mmap;
use odb_object::ObjectKind;
use odb_types::{ObjectId, ID_LEN};
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::error::{PackError, PackResult};
use crate::varint::{read_entry_header, read_offset};

/// `PACK`, version, object count.
pub const PACK_HEADER_LEN: u64 = 12;
const PACK_SIGNATURE: &[u8; 4] = b"PACK";

/// What a pack entry holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// A complete object of the given kind.
    Object(ObjectKind),
    /// A delta against the entry at `base_offset` in the same pack.
    OfsDelta { base_offset: u64 },
    /// A delta against the object named `base`.
    RefDelta { base: ObjectId },
}

impl EntryKind {
    pub fn is_delta(&self) -> bool {
        !matches!(self, Self::Object(_))
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(kind) => write!(f, "{kind}"),
            Self::OfsDelta { base_offset } => write!(f, "ofs-delta (base at {base_offset})"),
            Self::RefDelta { base } => write!(f, "ref-delta (base {base})"),
        }
    }
}

/// Decoded header of the entry at `offset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackEntry {
    pub offset: u64,
    pub kind: EntryKind,
    /// Inflated payload size: the object size, or the delta size for deltas.
    pub size: u64,
    /// Where the zlib stream starts.
    pub data_offset: u64,
}

impl PackEntry {
    /// Length of the header, including any delta base reference.
    pub fn header_len(&self) -> u64 {
        self.data_offset - self.offset
    }
}

/// A memory-mapped `.pack` file.
pub struct PackFile {
    path: PathBuf,
    map: Mmap,
    count: u32,
}

impl PackFile {
    /// Open a pack data file, appending `.pack` when needed, and check its
    /// signature and version.
    pub fn open(path: &Path) -> PackResult<Self> {
        let path = with_pack_extension(path);
        let file = File::open(&path)?;
        // SAFETY: read-only mapping; git never rewrites packs in place.
        let map = unsafe { Mmap::map(&file)? };

        if map.len() < PACK_HEADER_LEN as usize + ID_LEN || &map[..4] != PACK_SIGNATURE {
            return Err(PackError::InvalidSignature { path });
        }
        let version = u32::from_be_bytes([map[4], map[5], map[6], map[7]]);
        if version != 2 {
            return Err(PackError::UnsupportedVersion {
                what: "pack",
                version,
            });
        }
        let count = u32::from_be_bytes([map[8], map[9], map[10], map[11]]);

        debug!(path = %path.display(), objects = count, bytes = map.len(), "opened pack");
        Ok(Self { path, map, count })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Object count declared in the header. Diagnostic only; lookups go
    /// through the index.
    pub fn declared_count(&self) -> u32 {
        self.count
    }

    /// End of entry data, where the trailing checksum begins.
    pub fn data_end(&self) -> u64 {
        (self.map.len() - ID_LEN) as u64
    }

    /// The trailing SHA-1 over everything before it.
    pub fn checksum(&self) -> ObjectId {
        let mut raw = [0u8; ID_LEN];
        raw.copy_from_slice(&self.map[self.map.len() - ID_LEN..]);
        ObjectId::from_raw(raw)
    }

    /// Recompute the SHA-1 of the pack contents.
    pub fn compute_checksum(&self) -> ObjectId {
        let digest = Sha1::digest(&self.map[..self.data_end() as usize]);
        let mut raw = [0u8; ID_LEN];
        raw.copy_from_slice(&digest);
        ObjectId::from_raw(raw)
    }

    /// Raw bytes in `range`, bounds-checked against the entry area.
    pub fn bytes(&self, start: u64, end: u64) -> PackResult<&[u8]> {
        if start > end || end > self.data_end() {
            return Err(PackError::CorruptEntry {
                offset: start,
                reason: format!("range {start}..{end} outside pack data"),
            });
        }
        Ok(&self.map[start as usize..end as usize])
    }

    /// Decode the entry header at `offset`.
    pub fn entry_at(&self, offset: u64) -> PackResult<PackEntry> {
        if offset < PACK_HEADER_LEN || offset >= self.data_end() {
            return Err(PackError::CorruptEntry {
                offset,
                reason: "offset outside pack data".into(),
            });
        }
        let data = &self.map[offset as usize..self.data_end() as usize];

        let (type_code, size, mut used) =
            read_entry_header(data).map_err(|e| PackError::entry_varint(offset, e))?;

        let kind = match type_code {
            6 => {
                let (distance, n) =
                    read_offset(&data[used..]).map_err(|e| PackError::entry_varint(offset, e))?;
                used += n;
                if distance == 0 || distance >= offset {
                    return Err(PackError::CorruptEntry {
                        offset,
                        reason: format!("delta base distance {distance} out of range"),
                    });
                }
                EntryKind::OfsDelta {
                    base_offset: offset - distance,
                }
            }
            7 => {
                let raw = data
                    .get(used..used + ID_LEN)
                    .ok_or_else(|| PackError::CorruptEntry {
                        offset,
                        reason: "truncated delta base id".into(),
                    })?;
                used += ID_LEN;
                let mut id = [0u8; ID_LEN];
                id.copy_from_slice(raw);
                EntryKind::RefDelta {
                    base: ObjectId::from_raw(id),
                }
            }
            code => match ObjectKind::from_type_code(code) {
                Some(kind) => EntryKind::Object(kind),
                None => {
                    return Err(PackError::CorruptEntry {
                        offset,
                        reason: format!("invalid type code {code}"),
                    })
                }
            },
        };

        Ok(PackEntry {
            offset,
            kind,
            size,
            data_offset: offset + used as u64,
        })
    }

    /// Inflate an entry's payload and check it against the declared size.
    pub fn inflate(&self, entry: &PackEntry) -> PackResult<Vec<u8>> {
        let compressed = self.bytes(entry.data_offset, self.data_end())?;
        let mut out = Vec::with_capacity(entry.size.min(1 << 24) as usize);
        ZlibDecoder::new(compressed)
            .take(entry.size + 1)
            .read_to_end(&mut out)
            .map_err(|e| PackError::CorruptEntry {
                offset: entry.offset,
                reason: format!("inflate failed: {e}"),
            })?;
        if out.len() as u64 != entry.size {
            return Err(PackError::CorruptEntry {
                offset: entry.offset,
                reason: format!(
                    "inflated {} bytes, header declares {}",
                    out.len(),
                    entry.size
                ),
            });
        }
        Ok(out)
    }
}

fn with_pack_extension(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "pack") {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(".pack");
    PathBuf::from(name)
}

impl fmt::Debug for PackFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackFile")
            .field("path", &self.path)
            .field("count", &self.count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::PackBuilder;
    use crate::varint::encode_entry_header;

    fn open_built(builder: PackBuilder) -> (tempfile::TempDir, PackFile) {
        let dir = tempfile::tempdir().unwrap();
        let base = builder.write(dir.path(), "pack-test").unwrap();
        let pack = PackFile::open(&base).unwrap();
        (dir, pack)
    }

    #[test]
    fn reads_object_entries() {
        let mut builder = PackBuilder::new();
        let (_, offset) = builder.add_object(ObjectKind::Blob, b"hello pack");
        let (dir, pack) = open_built(builder);
        assert_eq!(pack.declared_count(), 1);

        let entry = pack.entry_at(offset).unwrap();
        assert_eq!(offset, 12);
        assert_eq!(entry.kind, EntryKind::Object(ObjectKind::Blob));
        assert_eq!(entry.size, 10);
        assert_eq!(entry.header_len(), 1);
        assert_eq!(pack.inflate(&entry).unwrap(), b"hello pack");
        assert_eq!(pack.checksum(), pack.compute_checksum());
        drop(dir);
    }

    #[test]
    fn decodes_delta_headers() {
        let mut builder = PackBuilder::new();
        let (base_id, base_offset) = builder.add_object(ObjectKind::Blob, b"base");
        let ofs = builder.add_ofs_delta(ObjectId::from_raw([1; 20]), base_offset, &[4, 4, 0x90, 4]);
        let refd = builder.add_ref_delta(ObjectId::from_raw([2; 20]), base_id, &[4, 4, 0x90, 4]);
        let (_dir, pack) = open_built(builder);

        let entry = pack.entry_at(ofs).unwrap();
        assert_eq!(entry.kind, EntryKind::OfsDelta { base_offset });
        assert!(entry.kind.is_delta());
        assert_eq!(entry.size, 4);

        let entry = pack.entry_at(refd).unwrap();
        assert_eq!(entry.kind, EntryKind::RefDelta { base: base_id });
        assert_eq!(entry.header_len(), 21);
    }

    #[test]
    fn invalid_type_codes_are_corrupt() {
        for code in [0u8, 5] {
            let mut builder = PackBuilder::new();
            let mut raw = encode_entry_header(code, 0);
            raw.extend_from_slice(&[0x78, 0x9c, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]);
            let offset = builder.add_raw(ObjectId::from_raw([3; 20]), &raw);
            let (_dir, pack) = open_built(builder);
            assert!(matches!(
                pack.entry_at(offset),
                Err(PackError::CorruptEntry { .. })
            ));
        }
    }

    #[test]
    fn base_distance_must_stay_inside_pack() {
        let mut builder = PackBuilder::new();
        let mut raw = encode_entry_header(6, 4);
        raw.extend(crate::varint::encode_offset(500));
        let offset = builder.add_raw(ObjectId::from_raw([4; 20]), &raw);
        let (_dir, pack) = open_built(builder);
        assert!(matches!(
            pack.entry_at(offset),
            Err(PackError::CorruptEntry { .. })
        ));
    }

    #[test]
    fn size_mismatch_on_inflate_is_corrupt() {
        let mut builder = PackBuilder::new();
        let (_, offset) = builder.add_object(ObjectKind::Blob, b"twelve bytes");
        let (_dir, pack) = open_built(builder);
        let mut entry = pack.entry_at(offset).unwrap();
        entry.size = 5;
        assert!(matches!(
            pack.inflate(&entry),
            Err(PackError::CorruptEntry { .. })
        ));
    }

    #[test]
    fn offsets_outside_data_are_rejected() {
        let mut builder = PackBuilder::new();
        builder.add_object(ObjectKind::Blob, b"x");
        let (_dir, pack) = open_built(builder);
        for offset in [0, 11, pack.data_end(), u64::MAX] {
            assert!(matches!(
                pack.entry_at(offset),
                Err(PackError::CorruptEntry { .. })
            ));
        }
    }

    #[test]
    fn signature_and_version_are_checked() {
        let dir = tempfile::tempdir().unwrap();
        let bad_sig = dir.path().join("a.pack");
        std::fs::write(&bad_sig, [b'K'; 40]).unwrap();
        assert!(matches!(
            PackFile::open(&bad_sig),
            Err(PackError::InvalidSignature { .. })
        ));

        let mut v3 = b"PACK".to_vec();
        v3.extend_from_slice(&3u32.to_be_bytes());
        v3.extend_from_slice(&[0; 28]);
        let v3_path = dir.path().join("b.pack");
        std::fs::write(&v3_path, v3).unwrap();
        assert!(matches!(
            PackFile::open(&v3_path),
            Err(PackError::UnsupportedVersion { version: 3, .. })
        ));
    }
}
