use odb_types::ObjectId;

/// Errors from decoding, parsing or encoding git objects.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    /// The object header names a type other than commit, tree, blob or tag.
    #[error("unknown object type {0:?}")]
    UnknownObjectType(String),

    /// The object header or a commit/tag/tree header line is malformed.
    #[error("malformed object header: {0}")]
    MalformedHeader(String),

    /// A signature line does not have the form `NAME <EMAIL> EPOCH +HHMM`.
    #[error("malformed signature {line:?}: {reason}")]
    MalformedSignature { line: String, reason: String },

    /// A tree record ended before its name terminator or its 20 id bytes.
    #[error("truncated tree entry")]
    TruncatedEntry,

    /// The payload is shorter than the size declared in the header.
    #[error("object size mismatch: declared {declared}, read {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    /// The object is not present in an object source.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// I/O error, including zlib stream errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for object operations.
pub type ObjectResult<T> = Result<T, ObjectError>;
