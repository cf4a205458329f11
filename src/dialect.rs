//! The standard `cinder` dialect registrations.
//!
//! Reference registrations for the operation kinds the rest of the compiler
//! (and this crate's tests) work against. Each kind declares its trait tags,
//! effect declarations, and capability implementations; nothing here is
//! special-cased elsewhere - generic passes only ever see these through the
//! registry.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::capability::{
    AttrProfilerAnnotations, CapabilityError, DeviceInfo, FoldOperandsTranspose, LayoutSensitive,
    ResourceHandleAllocator, ResourceId, ResourceIdMap, ResourceInstanceIdentity, TraitTag,
};
use crate::effects::{AccessKind, DuplicateResourceKind, ResourceRegistry};
use crate::ir::{Attribute, Operation, ValueId};
use crate::registry::{OpRegistry, OpSpec, RegistryError};

/// The dialect namespace string. Operations outside it are never considered
/// by dialect-scoped passes.
pub const DIALECT: &str = "cinder";

/// Tags of the built-in resource kinds.
pub mod resources {
    /// Mutable variable storage, addressed by handle.
    pub const VARIABLE: &str = "Variable";
    /// The per-graph stack, with no handle value.
    pub const STACK: &str = "Stack";
    /// The stateful random generator.
    pub const RANDOM_GENERATOR: &str = "RandomGenerator";
}

/// Attribute key holding an operation's data format.
pub const DATA_FORMAT_ATTR: &str = "data_format";
/// Attribute key naming the container of a variable handle.
pub const CONTAINER_ATTR: &str = "container";
/// Attribute key naming a variable handle within its container.
pub const SHARED_NAME_ATTR: &str = "shared_name";

/// Errors from building the built-in dialect.
#[derive(Debug, thiserror::Error)]
pub enum DialectError {
    /// A built-in resource tag collided.
    #[error(transparent)]
    Resource(#[from] DuplicateResourceKind),
    /// A built-in op kind collided.
    #[error(transparent)]
    Op(#[from] RegistryError),
}

/// Build the built-in resource and op registries.
///
/// Call once at process start; both registries are frozen on return.
pub fn builtin_dialect() -> Result<(ResourceRegistry, OpRegistry), DialectError> {
    let mut rb = ResourceRegistry::builder();
    let variable = rb.register(resources::VARIABLE)?;
    let stack = rb.register(resources::STACK)?;
    let rng = rb.register(resources::RANDOM_GENERATOR)?;
    let resources = rb.build();

    let mut ob = OpRegistry::builder();

    // Variable ops: effects scoped to the handle value, so operations on
    // distinct variables do not constrain each other.
    ob.register(
        OpSpec::builder("cinder.var_alloc")
            .result_effect(0, variable, AccessKind::Allocate)
            .unique_resource_allocation()
            .resource_handle_allocator(Arc::new(VarHandle))
            .resource_instance_identity(Arc::new(VarHandle))
            .build(),
    )?;
    ob.register(
        OpSpec::builder("cinder.var_read")
            .operand_effect(0, variable, AccessKind::Read)
            .build(),
    )?;
    ob.register(
        OpSpec::builder("cinder.var_write")
            .operand_effect(0, variable, AccessKind::Write)
            .build(),
    )?;
    ob.register(
        OpSpec::builder("cinder.var_free")
            .operand_effect(0, variable, AccessKind::Free)
            .build(),
    )?;

    // Stack ops: no handle value exists, so effects are op-scoped and all
    // instances stay totally ordered.
    ob.register(
        OpSpec::builder("cinder.stack_push")
            .op_effect(stack, AccessKind::Write)
            .build(),
    )?;
    ob.register(
        OpSpec::builder("cinder.stack_pop")
            .op_effect(stack, AccessKind::Write)
            .build(),
    )?;
    ob.register(
        OpSpec::builder("cinder.stack_size")
            .op_effect(stack, AccessKind::Read)
            .build(),
    )?;

    // The generator is hidden state: op-scoped write, and the op must not
    // be duplicated or folded.
    ob.register(
        OpSpec::builder("cinder.rng_next")
            .op_effect(rng, AccessKind::Write)
            .trait_tag(TraitTag::CannotDuplicate)
            .trait_tag(TraitTag::NoConstantFold)
            .build(),
    )?;

    // Layout-sensitive compute ops.
    ob.register(
        OpSpec::builder("cinder.conv")
            .trait_tag(TraitTag::ProfileAnnotation)
            .layout_sensitive(Arc::new(FormatAttrLayout::new(&["NHWC", "NCHW"])))
            .fold_operands_transpose(Arc::new(FormatAttrLayout::new(&["NHWC", "NCHW"])))
            .profiler_annotations(Arc::new(AttrProfilerAnnotations))
            .build(),
    )?;
    ob.register(
        OpSpec::builder("cinder.matmul")
            .trait_tag(TraitTag::ProfileAnnotation)
            .profiler_annotations(Arc::new(AttrProfilerAnnotations))
            .build(),
    )?;
    ob.register(
        OpSpec::builder("cinder.pool")
            .layout_sensitive(Arc::new(FormatAttrLayout::new(&["NHWC"])))
            .build(),
    )?;

    // Element-wise ops.
    ob.register(
        OpSpec::builder("cinder.relu")
            .trait_tag(TraitTag::Idempotent)
            .trait_tag(TraitTag::CwiseUnary)
            .trait_tag(TraitTag::LayoutAgnostic)
            .build(),
    )?;
    ob.register(
        OpSpec::builder("cinder.neg")
            .trait_tag(TraitTag::Involution)
            .trait_tag(TraitTag::CwiseUnary)
            .trait_tag(TraitTag::LayoutAgnostic)
            .build(),
    )?;
    ob.register(
        OpSpec::builder("cinder.add")
            .trait_tag(TraitTag::CwiseBinary)
            .trait_tag(TraitTag::LayoutAgnostic)
            .build(),
    )?;
    ob.register(OpSpec::builder("cinder.transpose").build())?;

    // Assertions execute for their failure side channel alone.
    ob.register(OpSpec::builder("cinder.assert").must_execute().build())?;

    Ok((resources, ob.build()))
}

// ============================================================================
// Capability implementations
// ============================================================================

const NHWC_TO_NCHW: [u64; 4] = [0, 3, 1, 2];
const NCHW_TO_NHWC: [u64; 4] = [0, 2, 3, 1];

/// Layout behavior driven by the `data_format` attribute.
///
/// Shared by every 4-D layout-sensitive kind; the supported format list is
/// the only per-kind variation.
#[derive(Debug)]
struct FormatAttrLayout {
    supported: &'static [&'static str],
}

impl FormatAttrLayout {
    fn new(supported: &'static [&'static str]) -> Self {
        Self { supported }
    }

    fn current_format(op: &Operation) -> String {
        op.attr(DATA_FORMAT_ATTR)
            .and_then(Attribute::as_str)
            .unwrap_or("NHWC")
            .to_string()
    }
}

impl LayoutSensitive for FormatAttrLayout {
    fn data_format(&self, op: &Operation) -> String {
        Self::current_format(op)
    }

    fn layout_dependent_operand_indices(&self, _op: &Operation) -> BTreeSet<usize> {
        BTreeSet::from([0])
    }

    fn layout_dependent_result_indices(&self, _op: &Operation) -> BTreeSet<usize> {
        BTreeSet::from([0])
    }

    fn preferred_layout(&self, _op: &Operation, device: &DeviceInfo) -> String {
        let preferred = if device.prefers_channel_first {
            "NCHW"
        } else {
            "NHWC"
        };
        if self.supported.contains(&preferred) {
            preferred.to_string()
        } else {
            self.supported[0].to_string()
        }
    }

    fn update_layout(&self, op: &mut Operation, new_format: &str) -> Result<(), CapabilityError> {
        if !self.supported.contains(&new_format) {
            return Err(CapabilityError::UnsupportedLayout {
                kind: op.qualified_name().to_string(),
                requested: new_format.to_string(),
                supported: self.supported.join(", "),
            });
        }
        op.set_attr(DATA_FORMAT_ATTR, Attribute::Str(new_format.to_string()));
        Ok(())
    }
}

impl FoldOperandsTranspose for FormatAttrLayout {
    fn layout_dependent_operand_indices(&self, op: &Operation) -> BTreeSet<usize> {
        LayoutSensitive::layout_dependent_operand_indices(self, op)
    }

    fn layout_dependent_result_indices(&self, op: &Operation) -> BTreeSet<usize> {
        LayoutSensitive::layout_dependent_result_indices(self, op)
    }

    fn fold_permutation(
        &self,
        op: &mut Operation,
        permutation: &[u64],
    ) -> Result<(), CapabilityError> {
        let unfoldable = |reason: String| CapabilityError::UnfoldablePermutation {
            kind: op.qualified_name().to_string(),
            permutation: permutation.to_vec(),
            reason,
        };
        if permutation.len() != 4 {
            return Err(unfoldable(format!(
                "expected a rank-4 permutation, got rank {}",
                permutation.len()
            )));
        }
        let current = Self::current_format(op);
        let target = if permutation == &NHWC_TO_NCHW && current == "NHWC" {
            "NCHW"
        } else if permutation == &NCHW_TO_NHWC && current == "NCHW" {
            "NHWC"
        } else {
            return Err(unfoldable(format!(
                "permutation does not map `{current}` to a known layout"
            )));
        };
        if !self.supported.contains(&target) {
            return Err(unfoldable(format!("target layout `{target}` unsupported")));
        }
        op.set_attr(DATA_FORMAT_ATTR, Attribute::Str(target.to_string()));
        Ok(())
    }
}

/// Handle identity and allocation for `cinder.var_alloc`.
///
/// A named handle is identified by `container/shared_name`; an anonymous
/// handle (empty or missing `shared_name`) is unique to its operation and
/// excluded from identity reasoning.
#[derive(Debug)]
struct VarHandle;

impl VarHandle {
    fn named_key(op: &Operation) -> Option<String> {
        let container = op
            .attr(CONTAINER_ATTR)
            .and_then(Attribute::as_str)
            .unwrap_or("");
        let shared = op.attr(SHARED_NAME_ATTR).and_then(Attribute::as_str)?;
        if shared.is_empty() {
            return None;
        }
        Some(format!("{container}/{shared}"))
    }
}

impl ResourceInstanceIdentity for VarHandle {
    fn resource_instance_key(&self, op: &Operation) -> Option<String> {
        Self::named_key(op)
    }
}

impl ResourceHandleAllocator for VarHandle {
    fn resource_handles(
        &self,
        op: &Operation,
        id_map: &mut ResourceIdMap,
        next_id: &mut u64,
    ) -> Vec<(ValueId, ResourceId)> {
        let Some(&handle) = op.results().first() else {
            return Vec::new();
        };
        let id = match Self::named_key(op) {
            Some(key) => id_map.get_or_mint(&key, next_id),
            None => {
                // Anonymous handle: always a fresh resource.
                let id = ResourceId(*next_id);
                *next_id += 1;
                id
            }
        };
        vec![(handle, id)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Capability;
    use crate::ir::Location;

    fn dialect() -> (ResourceRegistry, OpRegistry) {
        builtin_dialect().unwrap()
    }

    fn var_alloc(container: &str, shared: &str, handle: ValueId) -> Operation {
        Operation::new("cinder.var_alloc", Location::unknown())
            .with_results(vec![handle])
            .with_attr(CONTAINER_ATTR, Attribute::Str(container.into()))
            .with_attr(SHARED_NAME_ATTR, Attribute::Str(shared.into()))
    }

    #[test]
    fn test_builtin_resources_present() {
        let (res, _) = dialect();
        assert!(res.get(resources::VARIABLE).is_some());
        assert!(res.get(resources::STACK).is_some());
        assert!(res.get(resources::RANDOM_GENERATOR).is_some());
    }

    #[test]
    fn test_conv_capabilities() {
        let (_, ops) = dialect();
        let conv = Operation::new("cinder.conv", Location::unknown());
        assert!(ops.supports(&conv, Capability::LayoutSensitive));
        assert!(ops.supports(&conv, Capability::FoldOperandsTranspose));
        assert!(ops.supports(&conv, Capability::ProfilerAnnotations));
        assert!(ops.has_trait(&conv, TraitTag::ProfileAnnotation));
    }

    #[test]
    fn test_update_layout_success_and_failure() {
        let (_, ops) = dialect();

        let mut conv = Operation::new("cinder.conv", Location::unknown());
        let layout = ops.layout_sensitive(&conv).unwrap();
        assert_eq!(layout.data_format(&conv), "NHWC");
        layout.update_layout(&mut conv, "NCHW").unwrap();
        assert_eq!(layout.data_format(&conv), "NCHW");

        // pool supports only NHWC: the update fails and the format is
        // untouched.
        let mut pool = Operation::new("cinder.pool", Location::unknown());
        let layout = ops.layout_sensitive(&pool).unwrap();
        let err = layout.update_layout(&mut pool, "NCHW").unwrap_err();
        assert!(matches!(err, CapabilityError::UnsupportedLayout { .. }));
        assert_eq!(layout.data_format(&pool), "NHWC");
    }

    #[test]
    fn test_preferred_layout_follows_device() {
        let (_, ops) = dialect();
        let conv = Operation::new("cinder.conv", Location::unknown());
        let layout = ops.layout_sensitive(&conv).unwrap();
        let gpu = DeviceInfo {
            name: "gpu0".into(),
            prefers_channel_first: true,
        };
        let cpu = DeviceInfo::default();
        assert_eq!(layout.preferred_layout(&conv, &gpu), "NCHW");
        assert_eq!(layout.preferred_layout(&conv, &cpu), "NHWC");
    }

    #[test]
    fn test_fold_permutation() {
        let (_, ops) = dialect();
        let mut conv = Operation::new("cinder.conv", Location::unknown());
        let fold = ops.fold_operands_transpose(&conv).unwrap();

        fold.fold_permutation(&mut conv, &NHWC_TO_NCHW).unwrap();
        assert_eq!(
            conv.attr(DATA_FORMAT_ATTR).and_then(Attribute::as_str),
            Some("NCHW")
        );
        fold.fold_permutation(&mut conv, &NCHW_TO_NHWC).unwrap();
        assert_eq!(
            conv.attr(DATA_FORMAT_ATTR).and_then(Attribute::as_str),
            Some("NHWC")
        );
    }

    #[test]
    fn test_fold_permutation_wrong_rank_fails_without_mutation() {
        let (_, ops) = dialect();
        let mut conv = Operation::new("cinder.conv", Location::unknown());
        let fold = ops.fold_operands_transpose(&conv).unwrap();
        let err = fold.fold_permutation(&mut conv, &[1, 0]).unwrap_err();
        assert!(matches!(err, CapabilityError::UnfoldablePermutation { .. }));
        assert!(conv.attr(DATA_FORMAT_ATTR).is_none(), "op unmodified");
    }

    #[test]
    fn test_resource_instance_key_bijectivity() {
        let (_, ops) = dialect();
        let a = var_alloc("box", "v1", ValueId::new(0));
        let b = var_alloc("box", "v1", ValueId::new(1));
        let c = var_alloc("box", "v2", ValueId::new(2));

        let identity = ops.resource_instance_identity(&a).unwrap();
        let ka = identity.resource_instance_key(&a).unwrap();
        let kb = identity.resource_instance_key(&b).unwrap();
        let kc = identity.resource_instance_key(&c).unwrap();
        assert_eq!(ka, kb, "same resource, same key");
        assert_ne!(ka, kc, "different resource, different key");
    }

    #[test]
    fn test_anonymous_handle_is_excluded_from_identity() {
        let (_, ops) = dialect();
        let op = Operation::new("cinder.var_alloc", Location::unknown())
            .with_results(vec![ValueId::new(0)]);
        let identity = ops.resource_instance_identity(&op).unwrap();
        assert_eq!(identity.resource_instance_key(&op), None);
    }

    #[test]
    fn test_handle_allocator_reuses_ids_for_same_resource() {
        let (_, ops) = dialect();
        let a = var_alloc("box", "v1", ValueId::new(0));
        let b = var_alloc("box", "v1", ValueId::new(1));
        let c = var_alloc("box", "v2", ValueId::new(2));

        let alloc = ops.resource_handle_allocator(&a).unwrap();
        let mut id_map = ResourceIdMap::new();
        let mut next_id = 0;
        let ia = alloc.resource_handles(&a, &mut id_map, &mut next_id);
        let ib = alloc.resource_handles(&b, &mut id_map, &mut next_id);
        let ic = alloc.resource_handles(&c, &mut id_map, &mut next_id);

        assert_eq!(ia[0].0, ValueId::new(0), "ordered to match results");
        assert_eq!(ia[0].1, ib[0].1, "same resource, same id");
        assert_ne!(ia[0].1, ic[0].1, "distinct resources never collide");
        assert_eq!(next_id, 2);
    }

    #[test]
    fn test_anonymous_handles_get_fresh_ids() {
        let (_, ops) = dialect();
        let a = Operation::new("cinder.var_alloc", Location::unknown())
            .with_results(vec![ValueId::new(0)]);
        let b = Operation::new("cinder.var_alloc", Location::unknown())
            .with_results(vec![ValueId::new(1)]);
        let alloc = ops.resource_handle_allocator(&a).unwrap();
        let mut id_map = ResourceIdMap::new();
        let mut next_id = 0;
        let ia = alloc.resource_handles(&a, &mut id_map, &mut next_id);
        let ib = alloc.resource_handles(&b, &mut id_map, &mut next_id);
        assert_ne!(ia[0].1, ib[0].1);
    }

    #[test]
    fn test_trait_tags_on_builtins() {
        let (_, ops) = dialect();
        let relu = Operation::new("cinder.relu", Location::unknown());
        let neg = Operation::new("cinder.neg", Location::unknown());
        let rng = Operation::new("cinder.rng_next", Location::unknown());
        assert!(ops.has_trait(&relu, TraitTag::Idempotent));
        assert!(ops.has_trait(&neg, TraitTag::Involution));
        assert!(ops.has_trait(&rng, TraitTag::CannotDuplicate));
        assert!(ops.has_trait(&rng, TraitTag::NoConstantFold));
        assert!(!ops.has_trait(&relu, TraitTag::Involution));
    }
}
