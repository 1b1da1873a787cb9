//! Errors reported by the outline table codecs.

use std::fmt;

/// Errors that occur while reading or writing outline tables.
///
/// Decoding errors carry the tag of the subsystem that produced them
/// (`"cff"`, `"glyf"` or `"type2"`) together with a short reason. Malformed
/// input never panics; the only aborts in this crate are for programmer
/// errors.
#[derive(Debug)]
pub enum Error {
    /// The input bytes are malformed or self-inconsistent.
    InvalidFont {
        table: &'static str,
        reason: String,
    },
    /// The input uses a feature this crate does not implement.
    Unsupported {
        table: &'static str,
        reason: String,
    },
    /// An error propagated from the underlying byte source or sink.
    Io(std::io::Error),
}

impl Error {
    /// Creates an [`Error::InvalidFont`] with the given subsystem tag.
    pub fn invalid(table: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidFont {
            table,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::Unsupported`] with the given subsystem tag.
    pub fn unsupported(table: &'static str, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            table,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFont { table, reason } => {
                write!(f, "invalid {table} data: {reason}")
            }
            Self::Unsupported { table, reason } => {
                write!(f, "unsupported {table} feature: {reason}")
            }
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
