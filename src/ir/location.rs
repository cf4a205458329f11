//! Source location tracking for IR operations.
//!
//! Locations identify where an operation originated (file, line, column).
//! They are carried for diagnostics and for keying external data against
//! operations (see [`crate::profile`]); they never affect semantics.

use std::fmt;
use std::sync::Arc;

/// The source location of an operation.
///
/// Locations are cheap to clone: the file name is reference-counted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    /// Originating file, if known.
    pub file: Option<Arc<str>>,
    /// 1-indexed line number (0 when unknown).
    pub line: u32,
    /// 1-indexed column number (0 when unknown).
    pub col: u32,
}

impl Location {
    /// Create a location with full file/line/column information.
    pub fn new(file: impl Into<Arc<str>>, line: u32, col: u32) -> Self {
        Self {
            file: Some(file.into()),
            line,
            col,
        }
    }

    /// A location for synthesized operations with no source counterpart.
    pub fn unknown() -> Self {
        Self {
            file: None,
            line: 0,
            col: 0,
        }
    }

    /// Whether this location carries real source information.
    pub fn is_known(&self) -> bool {
        self.file.is_some()
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.col),
            None => write!(f, "<unknown>"),
        }
    }
}
