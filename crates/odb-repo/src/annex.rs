//! git-annex keys.
//!
//! A key has the shape `BACKEND[-sSIZE][-mMTIME][-Sn-Cn]--NAME`. Only the
//! size and mtime fields are interpreted; unknown or unparsable fields are
//! ignored.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{RepoError, RepoResult};

/// A parsed annex key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnexKey {
    /// The full key string.
    pub key: String,
    pub backend: String,
    /// From the `s` field.
    pub size: Option<u64>,
    /// From the `m` field, seconds since the epoch.
    pub mtime: Option<DateTime<Utc>>,
    /// Everything after `--`.
    pub name: String,
}

impl AnnexKey {
    pub fn parse(key: &str) -> RepoResult<Self> {
        let (front, name) = key.split_once("--").ok_or_else(|| RepoError::MalformedAnnexKey {
            key: key.to_string(),
            reason: "need backend--name".into(),
        })?;

        let mut fields = front.split('-');
        let backend = fields.next().unwrap_or_default();
        if backend.is_empty() {
            return Err(RepoError::MalformedAnnexKey {
                key: key.to_string(),
                reason: "empty backend".into(),
            });
        }

        let mut size = None;
        let mut mtime = None;
        for field in fields {
            let mut chars = field.chars();
            match (chars.next(), chars.as_str()) {
                (Some('s'), value) => {
                    if let Ok(v) = value.parse() {
                        size = Some(v);
                    }
                }
                (Some('m'), value) => {
                    if let Ok(secs) = value.parse::<i64>() {
                        mtime = DateTime::from_timestamp(secs, 0);
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            key: key.to_string(),
            backend: backend.to_string(),
            size,
            mtime,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for AnnexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// True for paths inside the annex store of a working tree.
pub fn is_annex_path(path: &str) -> bool {
    path.starts_with(".git/annex")
}
