//! Foundation types for the git object database.
//!
//! Every other `odb` crate depends on `odb-types`. The only identity in the
//! git object model is the 20-byte SHA-1 of an object's canonical encoding,
//! represented here by [`ObjectId`].

pub mod error;
pub mod object;

pub use error::TypeError;
pub use object::{ObjectId, ID_HEX_LEN, ID_LEN};
