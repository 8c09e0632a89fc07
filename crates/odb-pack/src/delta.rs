//! Git delta instructions: a size header followed by copy and insert ops.
//!
//! ```text
//! delta   = source-size target-size op*
//! copy    = 1oooosss  offset-bytes(0..4) size-bytes(0..3)
//! insert  = 0nnnnnnn  n literal bytes (n in 1..=127)
//! ```
//!
//! A copy with all size bits clear copies `0x10000` bytes. Opcode `0` is
//! reserved.

use std::fmt;

use crate::error::{PackError, PackResult};
use crate::varint::{encode_delta_size, read_delta_size};

/// Copy size used when none of the size bytes are present.
pub const DEFAULT_COPY_SIZE: u64 = 0x10000;

/// One decoded delta instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeltaOp {
    /// Copy `size` bytes starting at `offset` of the base.
    Copy { offset: u64, size: u64 },
    /// Append literal bytes carried in the delta.
    Insert(Vec<u8>),
}

impl DeltaOp {
    /// Number of bytes this op contributes to the target.
    pub fn len(&self) -> u64 {
        match self {
            Self::Copy { size, .. } => *size,
            Self::Insert(data) => data.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for DeltaOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy { offset, size } => write!(f, "copy   offset {offset} size {size}"),
            Self::Insert(data) => write!(f, "insert size {}", data.len()),
        }
    }
}

/// A fully decoded delta, for inspection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delta {
    pub source_size: u64,
    pub target_size: u64,
    pub ops: Vec<DeltaOp>,
}

impl Delta {
    /// Decode the size header and every instruction without applying them.
    pub fn parse(delta: &[u8]) -> PackResult<Self> {
        let mut cursor = OpCursor::new(delta)?;
        let mut ops = Vec::new();
        while let Some(op) = cursor.next_op()? {
            ops.push(match op {
                RawOp::Copy { offset, size } => DeltaOp::Copy { offset, size },
                RawOp::Insert(data) => DeltaOp::Insert(data.to_vec()),
            });
        }
        Ok(Self {
            source_size: cursor.source_size,
            target_size: cursor.target_size,
            ops,
        })
    }

    /// Encode back into the on-disk instruction stream.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = encode_delta_size(self.source_size);
        out.extend(encode_delta_size(self.target_size));
        for op in &self.ops {
            match op {
                DeltaOp::Insert(data) => {
                    for chunk in data.chunks(0x7f) {
                        out.push(chunk.len() as u8);
                        out.extend_from_slice(chunk);
                    }
                }
                DeltaOp::Copy { offset, size } => encode_copy(&mut out, *offset, *size),
            }
        }
        out
    }
}

fn encode_copy(out: &mut Vec<u8>, offset: u64, size: u64) {
    let size = if size == DEFAULT_COPY_SIZE { 0 } else { size };
    let mut op = 0x80u8;
    let mut args = Vec::with_capacity(7);
    for i in 0..4 {
        let byte = (offset >> (8 * i)) as u8;
        if byte != 0 {
            op |= 1 << i;
            args.push(byte);
        }
    }
    for i in 0..3 {
        let byte = (size >> (8 * i)) as u8;
        if byte != 0 {
            op |= 0x10 << i;
            args.push(byte);
        }
    }
    out.push(op);
    out.extend(args);
}

/// Apply `delta` to `base`, writing the target into `out`.
///
/// `out` is cleared first so callers can reuse one buffer across a chain.
pub fn apply_delta(base: &[u8], delta: &[u8], out: &mut Vec<u8>) -> PackResult<()> {
    let mut cursor = OpCursor::new(delta)?;
    if cursor.source_size != base.len() as u64 {
        return Err(PackError::CorruptDelta(format!(
            "base is {} bytes, delta expects {}",
            base.len(),
            cursor.source_size
        )));
    }

    let target_size = cursor.target_size;
    out.clear();
    out.reserve(target_size.min(1 << 24) as usize);

    while let Some(op) = cursor.next_op()? {
        match op {
            RawOp::Copy { offset, size } => {
                let end = offset
                    .checked_add(size)
                    .filter(|&end| end <= base.len() as u64)
                    .ok_or_else(|| {
                        PackError::CorruptDelta(format!(
                            "copy {offset}+{size} outside base of {} bytes",
                            base.len()
                        ))
                    })?;
                out.extend_from_slice(&base[offset as usize..end as usize]);
            }
            RawOp::Insert(data) => out.extend_from_slice(data),
        }
        if out.len() as u64 > target_size {
            return Err(PackError::CorruptDelta(format!(
                "result exceeds target size {target_size}"
            )));
        }
    }

    if out.len() as u64 != target_size {
        return Err(PackError::CorruptDelta(format!(
            "result is {} bytes, delta declares {target_size}",
            out.len()
        )));
    }
    Ok(())
}

enum RawOp<'a> {
    Copy { offset: u64, size: u64 },
    Insert(&'a [u8]),
}

struct OpCursor<'a> {
    data: &'a [u8],
    pos: usize,
    source_size: u64,
    target_size: u64,
}

impl<'a> OpCursor<'a> {
    fn new(data: &'a [u8]) -> PackResult<Self> {
        let (source_size, n) = read_delta_size(data).map_err(PackError::delta_varint)?;
        let (target_size, m) = read_delta_size(&data[n..]).map_err(PackError::delta_varint)?;
        Ok(Self {
            data,
            pos: n + m,
            source_size,
            target_size,
        })
    }

    fn byte(&mut self) -> PackResult<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| PackError::CorruptDelta("truncated copy instruction".into()))?;
        self.pos += 1;
        Ok(b)
    }

    fn next_op(&mut self) -> PackResult<Option<RawOp<'a>>> {
        let Some(&op) = self.data.get(self.pos) else {
            return Ok(None);
        };
        let at = self.pos;
        self.pos += 1;

        if op & 0x80 != 0 {
            let mut offset = 0u64;
            for i in 0..4 {
                if op & (1 << i) != 0 {
                    offset |= u64::from(self.byte()?) << (8 * i);
                }
            }
            let mut size = 0u64;
            for i in 0..3 {
                if op & (0x10 << i) != 0 {
                    size |= u64::from(self.byte()?) << (8 * i);
                }
            }
            if size == 0 {
                size = DEFAULT_COPY_SIZE;
            }
            Ok(Some(RawOp::Copy { offset, size }))
        } else if op == 0 {
            Err(PackError::ReservedOpcode { position: at })
        } else {
            let end = self.pos + op as usize;
            let data = self.data.get(self.pos..end).ok_or_else(|| {
                PackError::CorruptDelta(format!(
                    "insert of {op} bytes runs past end of delta"
                ))
            })?;
            self.pos = end;
            Ok(Some(RawOp::Insert(data)))
        }
    }
}
