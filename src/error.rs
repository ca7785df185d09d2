//! Errors produced by grid construction and field population.

use std::{error::Error, fmt, io, path::PathBuf};

/// Error type for the fallible operations of the field engine.
///
/// Out-of-bounds queries are not errors; they yield an outside
/// voxel query or an empty sample instead.
#[derive(Debug)]
pub enum FieldError {
    /// The domain size or voxel step is non-positive or not finite.
    InvalidDomain(String),
    /// A population parameter was rejected before any voxel was modified.
    InvalidParameter(String),
    /// A line of custom field input is missing or could not be parsed.
    MalformedInput {
        /// One-based number of the offending line.
        line_number: usize,
        /// Description of the problem.
        reason: String,
    },
    /// A custom field input source could not be opened or read.
    FileAccess {
        /// Path of the source, if it is a file.
        path: Option<PathBuf>,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl FieldError {
    /// Creates a `FileAccess` error for a source without a path.
    pub fn from_io(source: io::Error) -> Self {
        Self::FileAccess { path: None, source }
    }

    /// Creates a `FileAccess` error for the given file path.
    pub fn from_io_at_path<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Self::FileAccess {
            path: Some(path.into()),
            source,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain(reason) => write!(f, "invalid domain: {}", reason),
            Self::InvalidParameter(reason) => write!(f, "invalid parameter: {}", reason),
            Self::MalformedInput {
                line_number,
                reason,
            } => write!(f, "malformed input at line {}: {}", line_number, reason),
            Self::FileAccess {
                path: Some(path),
                source,
            } => write!(f, "could not access {}: {}", path.display(), source),
            Self::FileAccess { path: None, source } => {
                write!(f, "could not read input: {}", source)
            }
        }
    }
}

impl Error for FieldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::FileAccess { source, .. } => Some(source),
            _ => None,
        }
    }
}
