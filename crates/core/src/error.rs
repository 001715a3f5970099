//! Errors raised while loading, saving, and validating diagram documents.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for document handling.
#[derive(Debug, Error)]
pub enum Error {
    // I/O errors
    #[error("failed to read file '{path}': {reason}")]
    FileReadFailed { path: PathBuf, reason: String },

    #[error("failed to write file '{path}': {reason}")]
    FileWriteFailed { path: PathBuf, reason: String },

    // Parsing errors
    #[error("JSON parse error: {reason}")]
    JsonParseFailed { reason: String },

    // Domain errors
    #[error("invalid diagram document: {reason}")]
    InvalidDocument { reason: String },
}

/// Result type for document handling.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a file read error.
    pub fn file_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a file write error.
    pub fn file_write_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::FileWriteFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse_failed(reason: impl Into<String>) -> Self {
        Self::JsonParseFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid document error.
    pub fn invalid_document(reason: impl Into<String>) -> Self {
        Self::InvalidDocument {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::json_parse_failed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use super::*;

    #[test]
    fn test_file_read_failed_display() {
        let err = Error::file_read_failed("/tmp/flow.json", "permission denied");
        assert_eq!(
            err.to_string(),
            "failed to read file '/tmp/flow.json': permission denied"
        );
    }

    #[test]
    fn test_invalid_document_display() {
        let err = Error::invalid_document("duplicate node id 'a'");
        assert!(err.to_string().contains("duplicate node id"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{oops");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::JsonParseFailed { .. }));
    }

    #[test]
    fn test_write_failure_names_the_path() {
        let err = Error::file_write_failed("/tmp/out/flow.json", "read-only file system");
        assert!(matches!(err, Error::FileWriteFailed { ref path, .. } if path.ends_with("flow.json")));
        assert!(err.to_string().contains("read-only file system"));
    }
}
