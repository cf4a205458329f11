//! Profile data source: the external collaborator the annotation pass reads.
//!
//! The on-disk format is a versioned JSON index:
//!
//! ```json
//! {
//!   "version": 1,
//!   "records": {
//!     "cinder.conv@model.cdr:12:3": { "timestamp_ns": 171234, "duration_ns": 5500 }
//!   }
//! }
//! ```
//!
//! Records are keyed by the operation's dialect-qualified name and source
//! location (see [`profile_key`]). Loading rejects unknown versions; a key
//! with no record is not an error, it simply leaves that operation
//! unannotated.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ir::{Operation, ProfilerData};

/// Current profile index format version.
pub const PROFILE_FORMAT_VERSION: u32 = 1;

/// Errors from loading or saving a profile index.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Could not read or write the file.
    #[error("profile I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not a valid profile index.
    #[error("malformed profile index: {0}")]
    Json(#[from] serde_json::Error),
    /// The file was written by an incompatible version.
    #[error("unsupported profile format version {found} (expected {expected})")]
    Version {
        /// Version found in the file.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },
}

/// On-disk shape of the profile index.
#[derive(Debug, Serialize, Deserialize)]
struct ProfileIndex {
    /// Format version for compatibility checking.
    version: u32,
    /// Record per operation key.
    records: HashMap<String, ProfilerData>,
}

/// In-memory profile database, loaded once at pass construction so the walk
/// itself performs no I/O.
#[derive(Debug, Default)]
pub struct ProfileDb {
    records: HashMap<String, ProfilerData>,
}

impl ProfileDb {
    /// Load an index from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let text = fs::read_to_string(path)?;
        let index: ProfileIndex = serde_json::from_str(&text)?;
        if index.version != PROFILE_FORMAT_VERSION {
            return Err(ProfileError::Version {
                found: index.version,
                expected: PROFILE_FORMAT_VERSION,
            });
        }
        Ok(Self {
            records: index.records,
        })
    }

    /// Build a database from in-memory records.
    pub fn from_records(records: HashMap<String, ProfilerData>) -> Self {
        Self { records }
    }

    /// Write the index to disk in the current format version.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProfileError> {
        let index = ProfileIndex {
            version: PROFILE_FORMAT_VERSION,
            records: self.records.clone(),
        };
        let json = serde_json::to_string_pretty(&index)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Look up the record for an operation key.
    pub fn lookup(&self, key: &str) -> Option<ProfilerData> {
        self.records.get(key).copied()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the database holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The profile lookup key for an operation: qualified name plus location.
pub fn profile_key(op: &Operation) -> String {
    format!("{}@{}", op.qualified_name(), op.location())
}
