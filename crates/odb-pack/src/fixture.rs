//! Hand-assembled packs and indexes for tests.
//!
//! Only compiled for this crate's tests or with the `test-support` feature.
//! Nothing here is used to write packs in a real repository.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use odb_object::{hash_object, ObjectKind};
use odb_types::ObjectId;
use sha1::{Digest, Sha1};

use crate::index::IDX_SIGNATURE;
use crate::varint::{encode_entry_header, encode_offset};

pub const OFS_DELTA: u8 = 6;
pub const REF_DELTA: u8 = 7;

/// One row of an index: id, pack offset and entry CRC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: ObjectId,
    pub offset: u64,
    pub crc32: u32,
}

fn fan_out(entries: &[IndexEntry]) -> Vec<u8> {
    let mut counts = [0u32; 256];
    for entry in entries {
        for slot in &mut counts[entry.id.first_byte() as usize..] {
            *slot += 1;
        }
    }
    counts.iter().flat_map(|c| c.to_be_bytes()).collect()
}

fn finish_index(mut out: Vec<u8>, pack_checksum: [u8; 20]) -> Vec<u8> {
    out.extend_from_slice(&pack_checksum);
    let digest = Sha1::digest(&out);
    out.extend_from_slice(&digest);
    out
}

/// Version 2 index over `entries`, which must be sorted by id. Offsets are
/// written as 32-bit values, so a set high bit marks a large offset.
pub fn build_index_v2(entries: &[IndexEntry], pack_checksum: [u8; 20]) -> Vec<u8> {
    let mut out = IDX_SIGNATURE.to_vec();
    out.extend_from_slice(&2u32.to_be_bytes());
    out.extend(fan_out(entries));
    for entry in entries {
        out.extend_from_slice(entry.id.as_bytes());
    }
    for entry in entries {
        out.extend_from_slice(&entry.crc32.to_be_bytes());
    }
    for entry in entries {
        out.extend_from_slice(&(entry.offset as u32).to_be_bytes());
    }
    finish_index(out, pack_checksum)
}

/// Version 1 index over `entries`, which must be sorted by id.
pub fn build_index_v1(entries: &[IndexEntry], pack_checksum: [u8; 20]) -> Vec<u8> {
    let mut out = fan_out(entries);
    for entry in entries {
        out.extend_from_slice(&(entry.offset as u32).to_be_bytes());
        out.extend_from_slice(entry.id.as_bytes());
    }
    finish_index(out, pack_checksum)
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("writing to a Vec cannot fail");
    encoder.finish().expect("writing to a Vec cannot fail")
}

/// Builds a version 2 pack entry by entry.
pub struct PackBuilder {
    data: Vec<u8>,
    index: Vec<IndexEntry>,
}

impl Default for PackBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PackBuilder {
    pub fn new() -> Self {
        Self {
            data: vec![0; 12],
            index: Vec::new(),
        }
    }

    /// Append raw entry bytes indexed under `id`. Returns the entry offset.
    pub fn add_raw(&mut self, id: ObjectId, entry: &[u8]) -> u64 {
        let offset = self.data.len() as u64;
        self.data.extend_from_slice(entry);
        self.index.push(IndexEntry {
            id,
            offset,
            crc32: crc32fast::hash(entry),
        });
        offset
    }

    /// Append an undeltified object. Returns its id and offset.
    pub fn add_object(&mut self, kind: ObjectKind, body: &[u8]) -> (ObjectId, u64) {
        let id = hash_object(kind, body);
        (id, self.add_object_as(id, kind, body))
    }

    /// Append an undeltified object indexed under `id`, whatever it hashes to.
    pub fn add_object_as(&mut self, id: ObjectId, kind: ObjectKind, body: &[u8]) -> u64 {
        let mut entry = encode_entry_header(kind.type_code(), body.len() as u64);
        entry.extend(deflate(body));
        self.add_raw(id, &entry)
    }

    /// Append an OFS delta against the entry at `base_offset`; `id` is the
    /// id of the reconstructed object.
    pub fn add_ofs_delta(&mut self, id: ObjectId, base_offset: u64, delta: &[u8]) -> u64 {
        let offset = self.data.len() as u64;
        let mut entry = encode_entry_header(OFS_DELTA, delta.len() as u64);
        entry.extend(encode_offset(offset - base_offset));
        entry.extend(deflate(delta));
        self.add_raw(id, &entry)
    }

    /// Append a REF delta against `base`.
    pub fn add_ref_delta(&mut self, id: ObjectId, base: ObjectId, delta: &[u8]) -> u64 {
        let mut entry = encode_entry_header(REF_DELTA, delta.len() as u64);
        entry.extend_from_slice(base.as_bytes());
        entry.extend(deflate(delta));
        self.add_raw(id, &entry)
    }

    /// Pack bytes (with trailer) and the sorted index rows.
    pub fn finish(mut self) -> (Vec<u8>, Vec<IndexEntry>) {
        let count = self.index.len() as u32;
        self.data[..4].copy_from_slice(b"PACK");
        self.data[4..8].copy_from_slice(&2u32.to_be_bytes());
        self.data[8..12].copy_from_slice(&count.to_be_bytes());
        let digest = Sha1::digest(&self.data);
        self.data.extend_from_slice(&digest);
        self.index.sort_by_key(|e| e.id);
        (self.data, self.index)
    }

    /// Write `<dir>/<name>.pack` and a v2 `<dir>/<name>.idx`; returns the
    /// path without extension.
    pub fn write(self, dir: &Path, name: &str) -> std::io::Result<PathBuf> {
        let (pack, index) = self.finish();
        let mut checksum = [0u8; 20];
        checksum.copy_from_slice(&pack[pack.len() - 20..]);
        let base = dir.join(name);
        std::fs::write(base.with_extension("pack"), &pack)?;
        std::fs::write(base.with_extension("idx"), build_index_v2(&index, checksum))?;
        Ok(base)
    }
}
