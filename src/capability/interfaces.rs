//! Capability interfaces: named contracts an operation kind may implement.
//!
//! Each interface is an all-or-nothing contract. Implementations are
//! registered per kind as trait objects in the kind's
//! [`CapabilityTable`](super::query::CapabilityTable) and dispatched through
//! the operation, so the implementations themselves are stateless and
//! shareable.
//!
//! Failure contract: a capability call that cannot honor its argument (an
//! unsupported layout, an unfoldable permutation) returns an error *without
//! mutating the operation*. Callers treat failure as "no change occurred"
//! and decide locally whether to skip, retry differently, or abort their own
//! transformation. There is no global abort path here.

use std::collections::BTreeSet;
use std::collections::HashMap;

use thiserror::Error;

use crate::ir::{Attribute, Operation, ProfilerData, ValueId};

/// Attribute key under which [`ProfilerAnnotations`] implementations store
/// their record.
pub const PROFILER_ATTR: &str = "profiler.data";

/// A local, recoverable capability failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// `update_layout` was asked for a format the kind does not support.
    #[error("`{kind}` does not support data format `{requested}` (supported: {supported})")]
    UnsupportedLayout {
        /// Qualified kind name.
        kind: String,
        /// The rejected format.
        requested: String,
        /// Comma-separated supported formats, for diagnostics.
        supported: String,
    },
    /// `fold_permutation` was given a permutation the kind cannot absorb.
    #[error("cannot fold permutation {permutation:?} into `{kind}`: {reason}")]
    UnfoldablePermutation {
        /// Qualified kind name.
        kind: String,
        /// The rejected permutation.
        permutation: Vec<u64>,
        /// Why the fold is impossible (wrong rank, unsupported target layout, ...).
        reason: String,
    },
}

/// Device description consulted by [`LayoutSensitive::preferred_layout`].
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    /// Device name, for diagnostics.
    pub name: String,
    /// Whether the device runs channel-first layouts faster.
    pub prefers_channel_first: bool,
}

/// Contract for operations whose semantics depend on operand data layout.
pub trait LayoutSensitive: Send + Sync {
    /// The operation's current data format (e.g. `"NHWC"`).
    fn data_format(&self, op: &Operation) -> String;

    /// Operand indices whose interpretation depends on the layout.
    fn layout_dependent_operand_indices(&self, op: &Operation) -> BTreeSet<usize>;

    /// Result indices whose interpretation depends on the layout.
    fn layout_dependent_result_indices(&self, op: &Operation) -> BTreeSet<usize>;

    /// The format this kind prefers on the given device.
    fn preferred_layout(&self, op: &Operation, device: &DeviceInfo) -> String;

    /// Switch the operation to `new_format`.
    ///
    /// Must fail without mutating `op` if the format is unsupported.
    fn update_layout(&self, op: &mut Operation, new_format: &str) -> Result<(), CapabilityError>;
}

/// Contract for operations that can absorb a preceding transpose into their
/// own layout attribute instead of executing it as a separate node.
pub trait FoldOperandsTranspose: Send + Sync {
    /// Operand indices whose interpretation depends on the layout.
    fn layout_dependent_operand_indices(&self, op: &Operation) -> BTreeSet<usize>;

    /// Result indices whose interpretation depends on the layout.
    fn layout_dependent_result_indices(&self, op: &Operation) -> BTreeSet<usize>;

    /// Absorb `permutation` into the operation's layout attribute.
    ///
    /// Must fail without mutating `op` if the permutation is not foldable
    /// for this kind (wrong rank, target layout unsupported).
    fn fold_permutation(&self, op: &mut Operation, permutation: &[u64])
        -> Result<(), CapabilityError>;
}

/// A stable identifier for one underlying resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

/// Shared map from semantic resource keys to already-minted ids.
///
/// Passed between [`ResourceHandleAllocator`] calls so two operations that
/// allocate the *same* semantic resource receive the same id.
#[derive(Debug, Clone, Default)]
pub struct ResourceIdMap {
    map: HashMap<String, ResourceId>,
}

impl ResourceIdMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `key`, minting a new one from `next_id` if this is
    /// the first time the key is seen. `next_id` advances exactly once per
    /// newly minted id.
    pub fn get_or_mint(&mut self, key: &str, next_id: &mut u64) -> ResourceId {
        if let Some(id) = self.map.get(key) {
            return *id;
        }
        let id = ResourceId(*next_id);
        *next_id += 1;
        self.map.insert(key.to_string(), id);
        id
    }

    /// Number of distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no keys have been seen.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Contract for operations that produce resource handles.
pub trait ResourceHandleAllocator: Send + Sync {
    /// The handles this operation produces, paired with their resource ids,
    /// ordered to match the operation's result list.
    ///
    /// Implementations must reuse an existing id via `id_map` when the
    /// handle refers to an already-seen resource, and mint fresh ids through
    /// `next_id` otherwise (see [`ResourceIdMap::get_or_mint`]).
    fn resource_handles(
        &self,
        op: &Operation,
        id_map: &mut ResourceIdMap,
        next_id: &mut u64,
    ) -> Vec<(ValueId, ResourceId)>;
}

/// Contract for deriving a stable per-resource string key.
///
/// The key must be bijective with respect to resource identity: two
/// operation instances map to the same key if and only if they access the
/// same underlying resource. This is a trusted precondition of the
/// registering party, not checked at run time (debug sampling lives in
/// [`crate::verify`]). Only valid for single-resource operations; kinds
/// touching more than one distinct op-scoped resource must not implement
/// this interface.
pub trait ResourceInstanceIdentity: Send + Sync {
    /// The resource key, or `None` when this instance should be excluded
    /// from identity-based reasoning. `None` is not an error.
    fn resource_instance_key(&self, op: &Operation) -> Option<String>;
}

/// Contract for attaching profiler measurements to an operation.
pub trait ProfilerAnnotations: Send + Sync {
    /// Attach a record, overwriting any previous one.
    fn attach(&self, op: &mut Operation, data: ProfilerData);

    /// Read the attached record; the zero value before any attach.
    fn read(&self, op: &Operation) -> ProfilerData;

    /// Whether a record has been attached.
    fn has_data(&self, op: &Operation) -> bool;
}

/// Default [`ProfilerAnnotations`] implementation backed by the operation's
/// attribute map under [`PROFILER_ATTR`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AttrProfilerAnnotations;

impl ProfilerAnnotations for AttrProfilerAnnotations {
    fn attach(&self, op: &mut Operation, data: ProfilerData) {
        op.set_attr(PROFILER_ATTR, Attribute::Profiler(data));
    }

    fn read(&self, op: &Operation) -> ProfilerData {
        op.attr(PROFILER_ATTR)
            .and_then(Attribute::as_profiler)
            .unwrap_or_default()
    }

    fn has_data(&self, op: &Operation) -> bool {
        op.attr(PROFILER_ATTR)
            .and_then(Attribute::as_profiler)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Location;

    #[test]
    fn test_id_map_reuses_ids() {
        let mut map = ResourceIdMap::new();
        let mut next = 0;
        let a = map.get_or_mint("box/v1", &mut next);
        let b = map.get_or_mint("box/v2", &mut next);
        let a2 = map.get_or_mint("box/v1", &mut next);
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(next, 2, "counter advances once per minted id");
    }

    #[test]
    fn test_profiler_annotations_lifecycle() {
        let annot = AttrProfilerAnnotations;
        let mut op = Operation::new("cinder.conv", Location::unknown());

        assert!(!annot.has_data(&op));
        assert_eq!(annot.read(&op), ProfilerData::default());

        let data = ProfilerData::new(100, 25);
        annot.attach(&mut op, data);
        assert!(annot.has_data(&op));
        assert_eq!(annot.read(&op), data);

        // Re-attaching overwrites, never accumulates.
        let newer = ProfilerData::new(200, 30);
        annot.attach(&mut op, newer);
        assert_eq!(annot.read(&op), newer);
    }
}
