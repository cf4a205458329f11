//! Per-kind registration of traits, effects, and capabilities.
//!
//! An [`OpSpec`] bundles everything the capability layer knows about one
//! operation kind: its trait tags, its effect declarations, and its
//! capability table. Specs are collected by an [`OpRegistryBuilder`] at
//! process start and frozen into an [`OpRegistry`] before any pass runs;
//! the registry is immutable afterwards and safe to share across threads.
//!
//! The registry is also the capability query engine: given an operation it
//! resolves the kind name to its spec in O(1) (interned-symbol lookup) and
//! answers trait, capability, and effect queries without ever matching on a
//! closed set of kinds. Operations whose kind is not registered have
//! *unknown* effects; the ordering analysis treats them as reading and
//! writing everything.

use std::sync::Arc;

use string_interner::{DefaultStringInterner, Symbol};
use thiserror::Error;

use crate::capability::{
    Capability, CapabilityTable, FoldOperandsTranspose, LayoutSensitive, ProfilerAnnotations,
    ResourceHandleAllocator, ResourceInstanceIdentity, TraitSet, TraitTag,
};
use crate::effects::{AccessKind, Effect, EffectDecl, ResourceKindId};
use crate::ir::Operation;

/// Error from op-kind registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The qualified kind name is already registered.
    #[error("op kind `{0}` is already registered")]
    DuplicateOpKind(String),
}

/// Everything registered for one operation kind.
#[derive(Debug, Clone)]
pub struct OpSpec {
    name: Arc<str>,
    traits: TraitSet,
    effect_decls: Vec<EffectDecl>,
    capabilities: CapabilityTable,
}

impl OpSpec {
    /// Start building a spec for the given dialect-qualified kind name.
    pub fn builder(name: impl Into<Arc<str>>) -> OpSpecBuilder {
        OpSpecBuilder {
            name: name.into(),
            traits: TraitSet::empty(),
            effect_decls: Vec::new(),
            capabilities: CapabilityTable::new(),
        }
    }

    /// The dialect-qualified kind name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared trait tags.
    pub fn traits(&self) -> TraitSet {
        self.traits
    }

    /// The declared effects, in declaration order.
    pub fn effect_decls(&self) -> &[EffectDecl] {
        &self.effect_decls
    }

    /// The capability table.
    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    /// Instantiate the declared effects against a concrete operation.
    pub fn effects_for(&self, op: &Operation) -> Vec<Effect> {
        self.effect_decls
            .iter()
            .map(|decl| decl.instantiate(op))
            .collect()
    }
}

/// Builder for an [`OpSpec`].
#[derive(Debug)]
pub struct OpSpecBuilder {
    name: Arc<str>,
    traits: TraitSet,
    effect_decls: Vec<EffectDecl>,
    capabilities: CapabilityTable,
}

impl OpSpecBuilder {
    /// Declare a trait tag.
    pub fn trait_tag(mut self, tag: TraitTag) -> Self {
        self.traits = self.traits.with(tag);
        self
    }

    /// Assert that every resource handle this kind produces is distinct
    /// from every other handle produced anywhere in the graph.
    ///
    /// This is a *trusted* contract: the ordering analysis will reorder
    /// independent allocations on its strength, and nothing checks it at
    /// run time. Supplying it for a kind whose resources can alias produces
    /// silently incorrect schedules. Debug-build sampling lives in
    /// [`crate::verify`].
    pub fn unique_resource_allocation(self) -> Self {
        self.trait_tag(TraitTag::UniqueResourceAllocation)
    }

    /// Pin instances of this kind against pruning.
    pub fn must_execute(self) -> Self {
        self.trait_tag(TraitTag::MustExecute)
    }

    /// Declare an op-scoped effect: applies to every instance of the kind.
    pub fn op_effect(mut self, resource: ResourceKindId, access: AccessKind) -> Self {
        self.effect_decls.push(EffectDecl::op(resource, access));
        self
    }

    /// Declare an effect scoped to the handle in operand `index`.
    pub fn operand_effect(
        mut self,
        index: usize,
        resource: ResourceKindId,
        access: AccessKind,
    ) -> Self {
        self.effect_decls
            .push(EffectDecl::operand(index, resource, access));
        self
    }

    /// Declare an effect scoped to the handle produced as result `index`.
    pub fn result_effect(
        mut self,
        index: usize,
        resource: ResourceKindId,
        access: AccessKind,
    ) -> Self {
        self.effect_decls
            .push(EffectDecl::result(index, resource, access));
        self
    }

    /// Implement [`LayoutSensitive`].
    pub fn layout_sensitive(mut self, imp: Arc<dyn LayoutSensitive>) -> Self {
        self.capabilities.set_layout_sensitive(imp);
        self
    }

    /// Implement [`FoldOperandsTranspose`].
    pub fn fold_operands_transpose(mut self, imp: Arc<dyn FoldOperandsTranspose>) -> Self {
        self.capabilities.set_fold_operands_transpose(imp);
        self
    }

    /// Implement [`ResourceHandleAllocator`].
    pub fn resource_handle_allocator(mut self, imp: Arc<dyn ResourceHandleAllocator>) -> Self {
        self.capabilities.set_resource_handle_allocator(imp);
        self
    }

    /// Implement [`ResourceInstanceIdentity`].
    ///
    /// Only valid for single-resource kinds; the implementation's key must
    /// be bijective with respect to resource identity. Trusted contract,
    /// sampled by [`crate::verify`] in debug builds.
    pub fn resource_instance_identity(mut self, imp: Arc<dyn ResourceInstanceIdentity>) -> Self {
        self.capabilities.set_resource_instance_identity(imp);
        self
    }

    /// Implement [`ProfilerAnnotations`].
    pub fn profiler_annotations(mut self, imp: Arc<dyn ProfilerAnnotations>) -> Self {
        self.capabilities.set_profiler_annotations(imp);
        self
    }

    /// Finish the spec.
    pub fn build(self) -> OpSpec {
        OpSpec {
            name: self.name,
            traits: self.traits,
            effect_decls: self.effect_decls,
            capabilities: self.capabilities,
        }
    }
}

/// Builder for the process-wide op registry.
#[derive(Debug, Default)]
pub struct OpRegistryBuilder {
    interner: DefaultStringInterner,
    specs: Vec<OpSpec>,
}

impl OpRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a kind spec.
    ///
    /// Fails if the kind name is already registered.
    pub fn register(&mut self, spec: OpSpec) -> Result<(), RegistryError> {
        if self.interner.get(spec.name()).is_some() {
            return Err(RegistryError::DuplicateOpKind(spec.name().to_string()));
        }
        let sym = self.interner.get_or_intern(spec.name());
        // Symbols are issued densely, so the symbol index doubles as the
        // spec's slot in the table.
        debug_assert_eq!(sym.to_usize(), self.specs.len());
        tracing::debug!(kind = spec.name(), "registered op kind");
        self.specs.push(spec);
        Ok(())
    }

    /// Freeze the registry.
    pub fn build(self) -> OpRegistry {
        tracing::info!(kinds = self.specs.len(), "op registry frozen");
        OpRegistry {
            interner: self.interner,
            specs: self.specs,
        }
    }
}

/// Frozen table of operation kind specs; the capability query engine.
#[derive(Debug)]
pub struct OpRegistry {
    interner: DefaultStringInterner,
    specs: Vec<OpSpec>,
}

impl OpRegistry {
    /// Start building a registry.
    pub fn builder() -> OpRegistryBuilder {
        OpRegistryBuilder::new()
    }

    /// Look up a spec by qualified kind name.
    pub fn spec(&self, name: &str) -> Option<&OpSpec> {
        let sym = self.interner.get(name)?;
        self.specs.get(sym.to_usize())
    }

    /// Look up the spec for an operation's kind.
    pub fn spec_of(&self, op: &Operation) -> Option<&OpSpec> {
        self.spec(op.qualified_name())
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether no kinds are registered.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Iterate over all registered specs.
    pub fn specs(&self) -> impl Iterator<Item = &OpSpec> {
        self.specs.iter()
    }

    /// Whether the operation's kind declares the given trait tag.
    ///
    /// Unregistered kinds carry no tags.
    pub fn has_trait(&self, op: &Operation, tag: TraitTag) -> bool {
        self.spec_of(op)
            .map(|s| s.traits().contains(tag))
            .unwrap_or(false)
    }

    /// Whether the operation's kind implements the named capability.
    pub fn supports(&self, op: &Operation, capability: Capability) -> bool {
        self.spec_of(op)
            .map(|s| s.capabilities().supports(capability))
            .unwrap_or(false)
    }

    /// The operation's [`LayoutSensitive`] implementation, if any.
    pub fn layout_sensitive(&self, op: &Operation) -> Option<Arc<dyn LayoutSensitive>> {
        self.spec_of(op)?.capabilities().layout_sensitive()
    }

    /// The operation's [`FoldOperandsTranspose`] implementation, if any.
    pub fn fold_operands_transpose(&self, op: &Operation) -> Option<Arc<dyn FoldOperandsTranspose>> {
        self.spec_of(op)?.capabilities().fold_operands_transpose()
    }

    /// The operation's [`ResourceHandleAllocator`] implementation, if any.
    pub fn resource_handle_allocator(
        &self,
        op: &Operation,
    ) -> Option<Arc<dyn ResourceHandleAllocator>> {
        self.spec_of(op)?.capabilities().resource_handle_allocator()
    }

    /// The operation's [`ResourceInstanceIdentity`] implementation, if any.
    pub fn resource_instance_identity(
        &self,
        op: &Operation,
    ) -> Option<Arc<dyn ResourceInstanceIdentity>> {
        self.spec_of(op)?
            .capabilities()
            .resource_instance_identity()
    }

    /// The operation's [`ProfilerAnnotations`] implementation, if any.
    pub fn profiler_annotations(&self, op: &Operation) -> Option<Arc<dyn ProfilerAnnotations>> {
        self.spec_of(op)?.capabilities().profiler_annotations()
    }

    /// The operation's declared effects, including those of any nested
    /// operations in its region.
    ///
    /// Returns `None` when the effects are *unknown*: the kind (or any
    /// nested kind) is unregistered. Consumers must treat unknown as
    /// "reads and writes everything".
    pub fn effects(&self, op: &Operation) -> Option<Vec<Effect>> {
        let mut out = self.spec_of(op)?.effects_for(op);
        for nested in op.region() {
            out.extend(self.effects(nested)?);
        }
        Some(out)
    }

    /// Whether the operation is pinned against pruning, directly or through
    /// a nested operation.
    pub fn pinned(&self, op: &Operation) -> bool {
        if self.has_trait(op, TraitTag::MustExecute) {
            return true;
        }
        op.region().iter().any(|nested| self.pinned(nested))
    }
}
