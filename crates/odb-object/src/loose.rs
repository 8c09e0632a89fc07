//! Loose object files: `objects/<2 hex>/<38 hex>`, zlib compressed.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use odb_types::ObjectId;
use tracing::debug;

use crate::error::{ObjectError, ObjectResult};
use crate::hasher::{hash_object, header};
use crate::object::{Object, ObjectKind};

/// Longest header accepted before the NUL terminator.
pub const MAX_HEADER_LEN: usize = 32;

/// The `"<type> <size>"` prefix of an inflated loose object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LooseHeader {
    pub kind: ObjectKind,
    pub size: u64,
}

/// Path of the loose file for `id` below an `objects` directory.
pub fn loose_path(objects_dir: &Path, id: &ObjectId) -> PathBuf {
    let hex = id.to_hex();
    objects_dir.join(&hex[..2]).join(&hex[2..])
}

/// Read and validate the header, leaving `reader` at the first payload byte.
pub fn read_header<R: BufRead>(reader: &mut R) -> ObjectResult<LooseHeader> {
    let mut buf = Vec::with_capacity(MAX_HEADER_LEN);
    reader
        .take(MAX_HEADER_LEN as u64 + 1)
        .read_until(0, &mut buf)?;
    if buf.pop() != Some(0) {
        return Err(ObjectError::MalformedHeader(format!(
            "no NUL within {MAX_HEADER_LEN} header bytes"
        )));
    }

    let text = std::str::from_utf8(&buf)
        .map_err(|_| ObjectError::MalformedHeader("header is not valid UTF-8".into()))?;
    let (kind, size) = text
        .split_once(' ')
        .ok_or_else(|| ObjectError::MalformedHeader(format!("no size in header {text:?}")))?;
    let kind = ObjectKind::from_name(kind)?;
    let size = size
        .parse::<u64>()
        .map_err(|_| ObjectError::MalformedHeader(format!("invalid size {size:?}")))?;
    Ok(LooseHeader { kind, size })
}

/// Decode a zlib-compressed loose object stream.
///
/// The returned object owns `compressed`; tree and blob payloads are
/// inflated lazily as they are read.
pub fn decode<R: Read + Send + 'static>(compressed: R) -> ObjectResult<Object> {
    let mut reader = BufReader::new(ZlibDecoder::new(compressed));
    let LooseHeader { kind, size } = read_header(&mut reader)?;
    Object::parse(kind, size, Box::new(reader))
}

/// Open and decode the loose file at `path`.
pub fn open(path: &Path) -> ObjectResult<Object> {
    decode(File::open(path)?)
}

/// Inflate a loose object completely, returning its kind and payload.
pub fn read_raw(path: &Path) -> ObjectResult<(ObjectKind, Vec<u8>)> {
    let mut reader = BufReader::new(ZlibDecoder::new(File::open(path)?));
    let LooseHeader { kind, size } = read_header(&mut reader)?;
    let mut body = Vec::with_capacity(size.min(1 << 20) as usize);
    reader.take(size).read_to_end(&mut body)?;
    if body.len() as u64 != size {
        return Err(ObjectError::SizeMismatch {
            declared: size,
            actual: body.len() as u64,
        });
    }
    Ok((kind, body))
}

/// Compress `"<type> <size>\0<body>"` with zlib.
pub fn encode(kind: ObjectKind, body: &[u8]) -> ObjectResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&header(kind, body.len() as u64))?;
    encoder.write_all(body)?;
    Ok(encoder.finish()?)
}

/// Write a loose object below `objects_dir` and return its id.
///
/// The file is written to a temporary name and renamed into place. An
/// object that already exists is left untouched.
pub fn write_loose_object(
    objects_dir: &Path,
    kind: ObjectKind,
    body: &[u8],
) -> ObjectResult<ObjectId> {
    let id = hash_object(kind, body);
    let path = loose_path(objects_dir, &id);
    if path.exists() {
        return Ok(id);
    }

    let dir = path
        .parent()
        .ok_or_else(|| ObjectError::MalformedHeader(format!("no parent for {path:?}")))?;
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&encode(kind, body)?)?;
    tmp.persist(&path).map_err(|e| ObjectError::Io(e.error))?;

    debug!(id = %id, kind = %kind, size = body.len(), "wrote loose object");
    Ok(id)
}
