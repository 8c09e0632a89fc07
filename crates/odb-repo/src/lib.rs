//! Read access to a git repository on disk.
//!
//! [`Repository`] ties the lower crates together: loose objects from
//! `odb-object`, packs from `odb-pack`, history walks from `odb-graph`, and
//! the refs stored beside them.
//!
//! # Modules
//!
//! - [`error`]: [`RepoError`] and its [`ErrorClass`]
//! - [`config`]: [`RepoConfig`], loaded from TOML
//! - [`types`]: [`Ref`] and [`RefTarget`]
//! - [`traits`]: the [`RefStore`] lookup interface
//! - [`refs`]: loose and packed refs on disk
//! - [`memory`]: an in-memory [`RefStore`]
//! - [`names`]: ref name validation
//! - [`annex`]: git-annex key parsing
//! - [`repository`]: the [`Repository`] façade

pub mod annex;
pub mod config;
pub mod error;
pub mod memory;
pub mod names;
pub mod refs;
pub mod repository;
pub mod traits;
pub mod types;

pub use annex::{is_annex_path, AnnexKey};
pub use config::RepoConfig;
pub use error::{ErrorClass, RepoError, RepoResult};
pub use memory::InMemoryRefStore;
pub use names::validate_ref_name;
pub use refs::FileRefStore;
pub use repository::Repository;
pub use traits::RefStore;
pub use types::{Namespace, Ref, RefTarget};
