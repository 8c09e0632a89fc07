//! Repository configuration.
//!
//! ```toml
//! max_symref_depth = 5
//! max_delta_chain = 4096
//! max_link_size = 4096
//! verify_pack_checksums_on_open = false
//! ```
//!
//! Missing keys take their defaults; unknown keys are rejected.

use std::path::Path;

use odb_pack::{PackOptions, DEFAULT_MAX_DELTA_CHAIN};
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

pub const DEFAULT_MAX_SYMREF_DEPTH: usize = 5;
pub const DEFAULT_MAX_LINK_SIZE: u64 = 4096;

/// Limits applied while reading a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Symbolic ref hops followed before giving up.
    pub max_symref_depth: usize,
    /// Longest delta chain resolved in a pack.
    pub max_delta_chain: usize,
    /// Largest blob `readlink` will read.
    pub max_link_size: u64,
    /// Check each pack trailer when the pack is opened.
    pub verify_pack_checksums_on_open: bool,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            max_symref_depth: DEFAULT_MAX_SYMREF_DEPTH,
            max_delta_chain: DEFAULT_MAX_DELTA_CHAIN,
            max_link_size: DEFAULT_MAX_LINK_SIZE,
            verify_pack_checksums_on_open: false,
        }
    }
}

impl RepoConfig {
    pub fn from_toml_str(input: &str) -> RepoResult<Self> {
        let config: Self = toml::from_str(input).map_err(|e| RepoError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> RepoResult<Self> {
        let input = std::fs::read_to_string(path).map_err(|e| {
            RepoError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&input).map_err(|e| match e {
            RepoError::Config(message) => {
                RepoError::Config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    fn validate(&self) -> RepoResult<()> {
        if self.max_symref_depth == 0 {
            return Err(RepoError::Config("max_symref_depth must be at least 1".into()));
        }
        if self.max_delta_chain == 0 {
            return Err(RepoError::Config("max_delta_chain must be at least 1".into()));
        }
        Ok(())
    }

    pub fn pack_options(&self) -> PackOptions {
        PackOptions {
            max_delta_chain: self.max_delta_chain,
            verify_checksum: self.verify_pack_checksums_on_open,
        }
    }
}
