use std::fmt;
use std::io;

use crate::document::DocumentError;

/// Result alias using `InkwellError`.
pub type Result<T> = std::result::Result<T, InkwellError>;

/// Primary error type for Inkwell.
#[derive(Debug)]
pub enum InkwellError {
    /// File was not found on disk.
    FileNotFound,
    /// Operation failed due to insufficient permissions.
    PermissionDenied,
    /// Catch-all for other I/O errors.
    Io(io::Error),
    /// Serialization failed.
    Encode(String),
    /// A delta could not be applied.
    Document(DocumentError),
}

impl fmt::Display for InkwellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InkwellError::FileNotFound => write!(f, "file not found"),
            InkwellError::PermissionDenied => write!(f, "permission denied"),
            InkwellError::Io(err) => write!(f, "io error: {err}"),
            InkwellError::Encode(msg) => write!(f, "encode error: {msg}"),
            InkwellError::Document(err) => write!(f, "document error: {err}"),
        }
    }
}

impl std::error::Error for InkwellError {}

impl From<io::Error> for InkwellError {
    fn from(err: io::Error) -> Self {
        use io::ErrorKind::*;
        match err.kind() {
            NotFound => InkwellError::FileNotFound,
            PermissionDenied => InkwellError::PermissionDenied,
            _ => InkwellError::Io(err),
        }
    }
}

impl From<serde_json::Error> for InkwellError {
    fn from(err: serde_json::Error) -> Self {
        InkwellError::Encode(err.to_string())
    }
}

impl From<DocumentError> for InkwellError {
    fn from(err: DocumentError) -> Self {
        InkwellError::Document(err)
    }
}

/// Persisted history could not be read at all.
#[derive(Debug)]
pub enum DecodeError {
    /// The payload is not a JSON array.
    Malformed(serde_json::Error),
    /// The payload exceeds the size guard.
    Oversized { len: usize, limit: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Malformed(err) => write!(f, "malformed undo payload: {err}"),
            DecodeError::Oversized { len, limit } => {
                write!(f, "undo payload of {len} bytes exceeds {limit} byte limit")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Malformed(err)
    }
}

/// A single persisted command could not be attached to the live document.
#[derive(Debug)]
pub enum RebindError {
    /// Written by a newer build.
    UnknownTag(String),
    /// Entry or payload does not parse.
    Malformed(serde_json::Error),
    /// Recorded against another document.
    ForeignDocument(String),
    /// Refers to content the live document no longer has.
    OutOfRange { end: usize, len: usize },
}

impl fmt::Display for RebindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebindError::UnknownTag(tag) => write!(f, "unknown command type {tag:?}"),
            RebindError::Malformed(err) => write!(f, "malformed command: {err}"),
            RebindError::ForeignDocument(id) => write!(f, "command belongs to document {id}"),
            RebindError::OutOfRange { end, len } => {
                write!(f, "command reaches {end} but document has {len} chars")
            }
        }
    }
}

impl std::error::Error for RebindError {}

impl From<serde_json::Error> for RebindError {
    fn from(err: serde_json::Error) -> Self {
        RebindError::Malformed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn test_file_not_found_error() {
        let err: InkwellError = File::open("/no/such/file").map_err(Into::into).unwrap_err();
        assert!(matches!(err, InkwellError::FileNotFound));
        assert_eq!(err.to_string(), "file not found");
    }

    #[test]
    fn test_permission_denied_error() {
        let io_err = io::Error::from(io::ErrorKind::PermissionDenied);
        let err: InkwellError = io_err.into();
        assert!(matches!(err, InkwellError::PermissionDenied));
    }

    #[test]
    fn test_document_error_conversion() {
        let err: InkwellError = DocumentError::OutOfBounds { end: 4, len: 2 }.into();
        assert_eq!(
            err.to_string(),
            "document error: position 4 out of bounds (length 2)"
        );
    }

    #[test]
    fn test_oversized_message() {
        let err = DecodeError::Oversized { len: 10, limit: 5 };
        assert!(err.to_string().contains("exceeds 5 byte limit"));
    }
}
