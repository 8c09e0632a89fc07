use std::io::{self, Read, Take};

use crate::error::{ObjectError, ObjectResult};
use crate::object::ObjectReader;

/// Blob content as a stream. The size is known before reading.
pub struct Blob {
    size: u64,
    reader: Take<ObjectReader>,
}

impl Blob {
    pub(crate) fn new(size: u64, reader: ObjectReader) -> Self {
        Self {
            size,
            reader: reader.take(size),
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read the whole blob, failing if the stream ends early.
    pub fn into_bytes(mut self) -> ObjectResult<Vec<u8>> {
        let mut data = Vec::with_capacity(self.size.min(1 << 20) as usize);
        self.reader.read_to_end(&mut data)?;
        if data.len() as u64 != self.size {
            return Err(ObjectError::SizeMismatch {
                declared: self.size,
                actual: data.len() as u64,
            });
        }
        Ok(data)
    }
}

impl Read for Blob {
    /// Fails with `UnexpectedEof` when the stream ends before the
    /// declared size.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(buf)?;
        if n == 0 && !buf.is_empty() && self.reader.limit() > 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "blob ended {} bytes short of its declared size {}",
                    self.reader.limit(),
                    self.size
                ),
            ));
        }
        Ok(n)
    }
}
