//! Git pack files.
//!
//! Reads the two halves of a pack: the `.idx` (fan-out table plus sorted
//! ids for O(log n) lookup, versions 1 and 2) and the `.pack` (a header and
//! zlib-compressed entries addressed by byte offset). Delta entries are
//! resolved against their bases before anything leaves this crate.
//!
//! # Architecture
//!
//! - [`PackIndex`] -- memory-mapped index, id to offset
//! - [`PackFile`] -- memory-mapped data, offset to [`PackEntry`]
//! - [`delta`] -- delta instruction decoding and application
//! - [`Pack`] -- index plus data, delta chain resolution, verification
//! - [`PackSet`] -- every pack in `objects/pack`
//!
//! Writing packs is out of scope.

pub mod delta;
pub mod error;
pub mod file;
#[cfg(any(test, feature = "test-support"))]
pub mod fixture;
pub mod index;
pub mod pack;
pub mod set;
pub mod varint;

pub use delta::{apply_delta, Delta, DeltaOp};
pub use error::{PackError, PackResult};
pub use file::{EntryKind, PackEntry, PackFile};
pub use index::{FanOut, PackIndex};
pub use pack::{
    BaseResolver, EntryDescription, NoExternalBases, Pack, PackOptions, VerifyReport,
    DEFAULT_MAX_DELTA_CHAIN,
};
pub use set::PackSet;
