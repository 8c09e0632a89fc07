use std::path::PathBuf;

use odb_object::ObjectError;
use odb_types::ObjectId;
use thiserror::Error;

use crate::varint::VarintError;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("unsupported {what} version {version}")]
    UnsupportedVersion { what: &'static str, version: u32 },

    #[error("index entry {position} uses a 64-bit offset, which is not supported")]
    UnsupportedOffsetWidth { position: usize },

    #[error("object not found in pack: {0}")]
    ObjectNotFound(ObjectId),

    #[error("delta base {0} not found")]
    DanglingDelta(ObjectId),

    #[error("reserved delta opcode 0 at delta byte {position}")]
    ReservedOpcode { position: usize },

    #[error("corrupt delta: {0}")]
    CorruptDelta(String),

    #[error("variable-length integer overflows 64 bits")]
    VarintOverflow,

    #[error("invalid pack signature in {path:?}")]
    InvalidSignature { path: PathBuf },

    #[error("corrupt pack index {path:?}: {reason}")]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("corrupt pack entry at offset {offset}: {reason}")]
    CorruptEntry { offset: u64, reason: String },

    #[error("pack checksum mismatch in {path:?}")]
    ChecksumMismatch { path: PathBuf },

    #[error(transparent)]
    Object(#[from] ObjectError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackError {
    /// True for errors that mean the pack or index bytes are damaged, as
    /// opposed to a lookup miss or an I/O failure.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::ReservedOpcode { .. }
                | Self::CorruptDelta(_)
                | Self::VarintOverflow
                | Self::CorruptIndex { .. }
                | Self::CorruptEntry { .. }
                | Self::ChecksumMismatch { .. }
                | Self::UnsupportedOffsetWidth { .. }
        )
    }

    pub(crate) fn entry_varint(offset: u64, err: VarintError) -> Self {
        match err {
            VarintError::Overflow => Self::VarintOverflow,
            VarintError::Truncated => Self::CorruptEntry {
                offset,
                reason: "truncated entry header".into(),
            },
        }
    }

    pub(crate) fn delta_varint(err: VarintError) -> Self {
        match err {
            VarintError::Overflow => Self::VarintOverflow,
            VarintError::Truncated => Self::CorruptDelta("truncated size header".into()),
        }
    }
}

pub type PackResult<T> = Result<T, PackError>;
