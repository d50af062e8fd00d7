//! Result and error types for covmatrix.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for covmatrix operations
pub type TraceResult<T> = Result<T, TraceError>;

/// Errors that can occur while building traces and matrices
#[derive(Debug, Error)]
pub enum TraceError {
    /// The run cannot proceed with the inputs it was given
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// A single dump file could not be parsed
    #[error("Malformed run file {}: {message}", path.display())]
    MalformedRunFile {
        /// Dump file that failed
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// A single coverage line could not be read
    #[error("Malformed coverage record: {message}")]
    MalformedRecord {
        /// Error message
        message: String,
    },

    /// Two coverage lines claim the same id within one dump file
    #[error("Duplicate coverage record for id {id} in {}", path.display())]
    DuplicateRecord {
        /// Method or block id
        id: i64,
        /// Dump file containing the duplicate
        path: PathBuf,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TraceError {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a malformed run file error
    #[must_use]
    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::MalformedRunFile {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a malformed coverage record error
    #[must_use]
    pub fn malformed_record(message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            message: message.into(),
        }
    }

    /// Attach the dump file and 1-based line of a malformed record
    #[must_use]
    pub fn at_line(self, path: impl Into<PathBuf>, line: usize) -> Self {
        match self {
            Self::MalformedRecord { message } => Self::malformed(path, format!("line {line}: {message}")),
            other => other,
        }
    }

    /// Whether a batch over several dump files may skip this failure and go on.
    ///
    /// Only per-file parse failures qualify. Configuration problems and
    /// duplicate records abort the run.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedRunFile { .. } | Self::MalformedRecord { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_message() {
        let err = TraceError::configuration("no result file");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("no result file"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_malformed_is_recoverable() {
        let err = TraceError::malformed("/tmp/run_1.xml", "bad HitInformation");
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("run_1.xml"));
    }

    #[test]
    fn test_record_error_located_in_file() {
        let err = TraceError::malformed_record("id 3 has no count").at_line("/tmp/run_2.xml", 14);
        assert!(matches!(err, TraceError::MalformedRunFile { .. }));
        assert!(err.to_string().contains("run_2.xml"));
        assert!(err.to_string().contains("line 14: id 3 has no count"));
    }

    #[test]
    fn test_at_line_keeps_other_errors() {
        let err = TraceError::configuration("no result file").at_line("x.xml", 1);
        assert!(matches!(err, TraceError::Configuration { .. }));
    }

    #[test]
    fn test_duplicate_is_fatal() {
        let err = TraceError::DuplicateRecord {
            id: 7,
            path: PathBuf::from("result.xml"),
        };
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("id 7"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TraceError = io_err.into();
        assert!(err.to_string().contains("I/O"));
        assert!(!err.is_recoverable());
    }
}
