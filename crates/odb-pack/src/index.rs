use std::cmp::Ordering;
use std::ffi::OsString;
use std::fs::File;
use std::ops::Range;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use odb_types::{ObjectId, ID_LEN};
use tracing::debug;

use crate::error::{PackError, PackResult};

/// Signature at the start of a version 2 (and later) index.
pub const IDX_SIGNATURE: [u8; 4] = [0xff, b't', b'O', b'c'];

const FAN_OUT_LEN: usize = 256 * 4;
/// Pack checksum followed by index checksum.
const TRAILER_LEN: usize = 2 * ID_LEN;
const V1_RECORD_LEN: usize = 4 + ID_LEN;
const V2_HEADER_LEN: usize = 8;
const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

/// Cumulative object counts per leading id byte.
///
/// `counts[b]` is the number of ids whose first byte is `<= b`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FanOut {
    counts: [u32; 256],
}

impl FanOut {
    fn parse(data: &[u8]) -> Option<Self> {
        let mut counts = [0u32; 256];
        for (slot, chunk) in counts.iter_mut().zip(data.chunks_exact(4)) {
            *slot = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        counts.windows(2).all(|w| w[0] <= w[1]).then_some(Self { counts })
    }

    /// Zero-based, half-open range of positions whose ids start with `byte`.
    pub fn bounds(&self, byte: u8) -> Range<usize> {
        let end = self.counts[byte as usize] as usize;
        let start = match byte {
            0 => 0,
            b => self.counts[b as usize - 1] as usize,
        };
        start..end
    }

    /// Total number of ids.
    pub fn total(&self) -> usize {
        self.counts[255] as usize
    }
}

/// A memory-mapped `.idx` file, version 1 or 2.
///
/// ```text
/// v1: fan-out[256] (offset:u32, id:[u8;20])*N            trailer
/// v2: \xfftOc version:u32 fan-out[256] id*N crc32*N offset*N [offset64*M] trailer
/// ```
pub struct PackIndex {
    path: PathBuf,
    map: Mmap,
    version: u32,
    fan_out: FanOut,
    count: usize,
}

impl PackIndex {
    /// Open and validate an index. `.idx` is appended when `path` has a
    /// different (or no) extension.
    pub fn open(path: &Path) -> PackResult<Self> {
        let path = with_idx_extension(path);
        let file = File::open(&path)?;
        // SAFETY: the mapping is read-only and pack index files are never
        // modified in place by git.
        let map = unsafe { Mmap::map(&file)? };

        let corrupt = |reason: String| PackError::CorruptIndex {
            path: path.clone(),
            reason,
        };

        if map.len() < 4 {
            return Err(corrupt(format!("file is only {} bytes", map.len())));
        }

        let (version, fan_start) = if map[..4] == IDX_SIGNATURE {
            if map.len() < V2_HEADER_LEN {
                return Err(corrupt("truncated header".into()));
            }
            let version = u32::from_be_bytes([map[4], map[5], map[6], map[7]]);
            if version != 2 {
                return Err(PackError::UnsupportedVersion {
                    what: "pack index",
                    version,
                });
            }
            (2, V2_HEADER_LEN)
        } else {
            (1, 0)
        };

        let fan_bytes = map
            .get(fan_start..fan_start + FAN_OUT_LEN)
            .ok_or_else(|| corrupt("truncated fan-out table".into()))?;
        let fan_out =
            FanOut::parse(fan_bytes).ok_or_else(|| corrupt("fan-out is not monotonic".into()))?;
        let count = fan_out.total();

        let tables = match version {
            1 => count * V1_RECORD_LEN,
            _ => count * (ID_LEN + 4 + 4),
        };
        let needed = fan_start + FAN_OUT_LEN + tables + TRAILER_LEN;
        if map.len() < needed {
            return Err(corrupt(format!(
                "{count} objects need {needed} bytes, file has {}",
                map.len()
            )));
        }

        debug!(path = %path.display(), version, objects = count, "opened pack index");
        Ok(Self {
            path,
            map,
            version,
            fan_out,
            count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn fan_out(&self) -> &FanOut {
        &self.fan_out
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn tables_start(&self) -> usize {
        match self.version {
            1 => FAN_OUT_LEN,
            _ => V2_HEADER_LEN + FAN_OUT_LEN,
        }
    }

    /// Raw id bytes at `pos`. Callers guarantee `pos < count`; `open`
    /// checked the file covers every table.
    fn id_bytes(&self, pos: usize) -> &[u8] {
        let start = match self.version {
            1 => self.tables_start() + pos * V1_RECORD_LEN + 4,
            _ => self.tables_start() + pos * ID_LEN,
        };
        &self.map[start..start + ID_LEN]
    }

    fn be_u32(&self, at: usize) -> u32 {
        u32::from_be_bytes([
            self.map[at],
            self.map[at + 1],
            self.map[at + 2],
            self.map[at + 3],
        ])
    }

    fn check_position(&self, pos: usize) -> PackResult<()> {
        if pos >= self.count {
            return Err(PackError::CorruptIndex {
                path: self.path.clone(),
                reason: format!("position {pos} out of range for {} objects", self.count),
            });
        }
        Ok(())
    }

    pub fn object_id(&self, pos: usize) -> PackResult<ObjectId> {
        self.check_position(pos)?;
        Ok(ObjectId::from_raw(raw_id(self.id_bytes(pos))))
    }

    /// Pack data offset of the object at `pos`.
    pub fn offset(&self, pos: usize) -> PackResult<u64> {
        self.check_position(pos)?;
        let raw = match self.version {
            1 => self.be_u32(self.tables_start() + pos * V1_RECORD_LEN),
            _ => self.be_u32(self.tables_start() + self.count * (ID_LEN + 4) + pos * 4),
        };
        if self.version == 2 && raw & LARGE_OFFSET_FLAG != 0 {
            return Err(PackError::UnsupportedOffsetWidth { position: pos });
        }
        Ok(u64::from(raw))
    }

    /// CRC32 of the packed entry at `pos`. Version 1 indexes carry none.
    pub fn crc32(&self, pos: usize) -> PackResult<Option<u32>> {
        self.check_position(pos)?;
        Ok(match self.version {
            1 => None,
            _ => Some(self.be_u32(self.tables_start() + self.count * ID_LEN + pos * 4)),
        })
    }

    /// Position of `id` in the sorted id table.
    ///
    /// Binary search confined to the fan-out bucket of the id's first byte.
    pub fn find_position(&self, id: &ObjectId) -> PackResult<usize> {
        let Range { mut start, mut end } = self.fan_out.bounds(id.first_byte());
        let target = id.as_bytes().as_slice();
        while start < end {
            let mid = start + (end - start) / 2;
            match self.id_bytes(mid).cmp(target) {
                Ordering::Less => start = mid + 1,
                Ordering::Greater => end = mid,
                Ordering::Equal => return Ok(mid),
            }
        }
        Err(PackError::ObjectNotFound(*id))
    }

    pub fn find_offset(&self, id: &ObjectId) -> PackResult<u64> {
        self.offset(self.find_position(id)?)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.find_position(id).is_ok()
    }

    /// Ids in index order, paired with their positions.
    pub fn iter(&self) -> impl Iterator<Item = (usize, ObjectId)> + '_ {
        (0..self.count).map(move |pos| (pos, ObjectId::from_raw(raw_id(self.id_bytes(pos)))))
    }

    /// Checksum of the pack this index describes, from the trailer.
    pub fn pack_checksum(&self) -> ObjectId {
        let start = self.map.len() - TRAILER_LEN;
        ObjectId::from_raw(raw_id(&self.map[start..start + ID_LEN]))
    }
}

fn raw_id(bytes: &[u8]) -> [u8; ID_LEN] {
    let mut raw = [0u8; ID_LEN];
    raw.copy_from_slice(bytes);
    raw
}

fn with_idx_extension(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == "idx") {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(".idx");
    PathBuf::from(name)
}

impl std::fmt::Debug for PackIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackIndex")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("count", &self.count)
            .finish()
    }
}
