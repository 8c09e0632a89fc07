use std::io;

use odb_types::{ObjectId, ID_LEN};
use sha1::{Digest, Sha1};

use crate::object::ObjectKind;

/// Incremental git object hasher.
///
/// The `"<type> <size>\0"` header is fed on construction, so the caller must
/// know the payload length up front. The digest of header plus payload is the
/// object's id.
pub struct ObjectHasher {
    inner: Sha1,
}

impl ObjectHasher {
    pub fn new(kind: ObjectKind, size: u64) -> Self {
        let mut inner = Sha1::new();
        inner.update(header(kind, size));
        Self { inner }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finish(self) -> ObjectId {
        let mut raw = [0u8; ID_LEN];
        raw.copy_from_slice(&self.inner.finalize());
        ObjectId::from_raw(raw)
    }

    /// Check that `data` is the payload of `expected`.
    pub fn verify(kind: ObjectKind, data: &[u8], expected: &ObjectId) -> bool {
        hash_object(kind, data) == *expected
    }
}

impl io::Write for ObjectHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The canonical `"<type> <size>\0"` object header.
pub fn header(kind: ObjectKind, size: u64) -> Vec<u8> {
    let mut out = format!("{kind} {size}").into_bytes();
    out.push(0);
    out
}

/// Compute the id of an in-memory payload.
pub fn hash_object(kind: ObjectKind, body: &[u8]) -> ObjectId {
    let mut hasher = ObjectHasher::new(kind, body.len() as u64);
    hasher.update(body);
    hasher.finish()
}
