use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("malformed object id {input:?}: {reason}")]
    MalformedId { input: String, reason: String },
}
