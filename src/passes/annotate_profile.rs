//! Profile annotation pass.
//!
//! Walks a module once in deterministic pre-order and, for every `cinder`
//! operation carrying the profile-annotation trait, looks up a profiler
//! record keyed by the operation's qualified name and source location and
//! attaches it through the profiler-annotations capability.
//!
//! The pass never mutates the structure of the graph: no operations are
//! inserted, deleted, or moved, only attributes attached. Operations from
//! foreign dialects are skipped without being tested for the trait, since
//! the profile source is scoped to one dialect. A missing record degrades
//! to "no data attached" for that node; only a missing or malformed profile
//! *file* fails, and that at construction time, before any walk.

use std::path::Path;

use crate::capability::TraitTag;
use crate::dialect;
use crate::ir::Module;
use crate::profile::{profile_key, ProfileDb, ProfileError};
use crate::registry::OpRegistry;

/// Counters reported by one pass run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotateStats {
    /// Operations visited by the walk.
    pub visited: usize,
    /// Operations that received a profiler record.
    pub annotated: usize,
    /// Trait-carrying operations with no matching record.
    pub missing: usize,
}

/// The annotation pass. Construct once per profile file; run per module.
#[derive(Debug)]
pub struct AnnotateProfilePass {
    db: ProfileDb,
}

impl AnnotateProfilePass {
    /// Create a pass reading the profile index at `path`.
    ///
    /// The file is loaded eagerly; the walk itself performs no I/O.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let db = ProfileDb::load(path)?;
        tracing::debug!(records = db.len(), "loaded profile index");
        Ok(Self { db })
    }

    /// Create a pass over an already-loaded database.
    pub fn from_db(db: ProfileDb) -> Self {
        Self { db }
    }

    /// Annotate every eligible operation in `module`.
    pub fn run(&self, module: &mut Module, registry: &OpRegistry) -> AnnotateStats {
        let mut stats = AnnotateStats::default();
        module.walk_mut(&mut |op| {
            stats.visited += 1;
            if op.dialect() != Some(dialect::DIALECT) {
                return;
            }
            if !registry.has_trait(op, TraitTag::ProfileAnnotation) {
                return;
            }
            let Some(annotations) = registry.profiler_annotations(op) else {
                // Trait without the capability: nowhere to attach.
                return;
            };
            let key = profile_key(op);
            match self.db.lookup(&key) {
                Some(record) => {
                    annotations.attach(op, record);
                    stats.annotated += 1;
                    tracing::debug!(%key, "attached profiler record");
                }
                None => {
                    stats.missing += 1;
                }
            }
        });
        tracing::info!(
            visited = stats.visited,
            annotated = stats.annotated,
            missing = stats.missing,
            "profile annotation pass finished"
        );
        stats
    }
}
