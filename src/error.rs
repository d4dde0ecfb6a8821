//! Library error types.
//!
//! All fallible operations return [`Result`]. Errors surface to the caller
//! at the API boundary; the core performs no retries and no logging on
//! error paths, and a failed operation never leaves partial state visible
//! to subsequent reads.

use std::fmt;
use std::io;

/// Convenience alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by index and database operations.
#[derive(Debug)]
pub enum Error {
    /// A vector argument does not match the index dimension.
    DimensionMismatch {
        /// The dimension the index was constructed with.
        expected: usize,
        /// The dimension of the offending vector.
        actual: usize,
    },
    /// A mutating operation was attempted on a read-only database.
    ReadOnlyViolation,
    /// Encode or decode was called before the quantizer was trained.
    QuantizerNotTrained,
    /// A persisted distance-metric ordinal does not name a known metric.
    UnknownMetric(i32),
    /// A persisted file failed structural validation.
    Corrupt(String),
    /// Underlying file I/O failure during save or load.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DimensionMismatch { expected, actual } => {
                write!(f, "vector dimension mismatch: expected {expected}, got {actual}")
            }
            Error::ReadOnlyViolation => write!(f, "database is in read-only mode"),
            Error::QuantizerNotTrained => write!(f, "quantizer is not trained"),
            Error::UnknownMetric(ordinal) => {
                write!(f, "unknown distance metric ordinal: {ordinal}")
            }
            Error::Corrupt(detail) => write!(f, "corrupt index file: {detail}"),
            Error::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::DimensionMismatch {
            expected: 4,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "vector dimension mismatch: expected 4, got 3"
        );
        assert_eq!(
            Error::ReadOnlyViolation.to_string(),
            "database is in read-only mode"
        );
        assert_eq!(
            Error::QuantizerNotTrained.to_string(),
            "quantizer is not trained"
        );
        assert_eq!(
            Error::UnknownMetric(7).to_string(),
            "unknown distance metric ordinal: 7"
        );
    }

    #[test]
    fn test_io_conversion_preserves_source() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, Error::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
