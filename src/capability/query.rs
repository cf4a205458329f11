//! Capability naming and per-kind capability tables.
//!
//! Dispatch is by capability, not by a closed enumeration over kinds: each
//! registered kind carries a [`CapabilityTable`] with one optional slot per
//! interface, resolved once at registration and queried in O(1). A pass asks
//! "does this op support [`Capability::LayoutSensitive`]" and receives an
//! invocable trait object, never matching on the concrete kind.
//!
//! The query entry points live on [`crate::registry::OpRegistry`], which
//! resolves an operation's kind name to its table.

use std::fmt;
use std::sync::Arc;

use super::interfaces::{
    FoldOperandsTranspose, LayoutSensitive, ProfilerAnnotations, ResourceHandleAllocator,
    ResourceInstanceIdentity,
};

/// Names of the capability interfaces, for generic `supports` queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// [`LayoutSensitive`]
    LayoutSensitive,
    /// [`FoldOperandsTranspose`]
    FoldOperandsTranspose,
    /// [`ResourceHandleAllocator`]
    ResourceHandleAllocator,
    /// [`ResourceInstanceIdentity`]
    ResourceInstanceIdentity,
    /// [`ProfilerAnnotations`]
    ProfilerAnnotations,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 5] = [
        Capability::LayoutSensitive,
        Capability::FoldOperandsTranspose,
        Capability::ResourceHandleAllocator,
        Capability::ResourceInstanceIdentity,
        Capability::ProfilerAnnotations,
    ];

    /// Name of this capability for diagnostics.
    pub fn descr(&self) -> &'static str {
        match self {
            Capability::LayoutSensitive => "layout-sensitive",
            Capability::FoldOperandsTranspose => "fold-operands-transpose",
            Capability::ResourceHandleAllocator => "resource-handle-allocator",
            Capability::ResourceInstanceIdentity => "resource-instance-identity",
            Capability::ProfilerAnnotations => "profiler-annotations",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descr())
    }
}

/// The capability implementations registered for one operation kind.
///
/// One optional slot per interface; a kind either implements an interface
/// fully or not at all.
#[derive(Clone, Default)]
pub struct CapabilityTable {
    layout_sensitive: Option<Arc<dyn LayoutSensitive>>,
    fold_operands_transpose: Option<Arc<dyn FoldOperandsTranspose>>,
    resource_handle_allocator: Option<Arc<dyn ResourceHandleAllocator>>,
    resource_instance_identity: Option<Arc<dyn ResourceInstanceIdentity>>,
    profiler_annotations: Option<Arc<dyn ProfilerAnnotations>>,
}

impl CapabilityTable {
    /// An empty table: no capabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the named capability is implemented.
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::LayoutSensitive => self.layout_sensitive.is_some(),
            Capability::FoldOperandsTranspose => self.fold_operands_transpose.is_some(),
            Capability::ResourceHandleAllocator => self.resource_handle_allocator.is_some(),
            Capability::ResourceInstanceIdentity => self.resource_instance_identity.is_some(),
            Capability::ProfilerAnnotations => self.profiler_annotations.is_some(),
        }
    }

    /// Install a [`LayoutSensitive`] implementation.
    pub fn set_layout_sensitive(&mut self, imp: Arc<dyn LayoutSensitive>) {
        self.layout_sensitive = Some(imp);
    }

    /// Install a [`FoldOperandsTranspose`] implementation.
    pub fn set_fold_operands_transpose(&mut self, imp: Arc<dyn FoldOperandsTranspose>) {
        self.fold_operands_transpose = Some(imp);
    }

    /// Install a [`ResourceHandleAllocator`] implementation.
    pub fn set_resource_handle_allocator(&mut self, imp: Arc<dyn ResourceHandleAllocator>) {
        self.resource_handle_allocator = Some(imp);
    }

    /// Install a [`ResourceInstanceIdentity`] implementation.
    pub fn set_resource_instance_identity(&mut self, imp: Arc<dyn ResourceInstanceIdentity>) {
        self.resource_instance_identity = Some(imp);
    }

    /// Install a [`ProfilerAnnotations`] implementation.
    pub fn set_profiler_annotations(&mut self, imp: Arc<dyn ProfilerAnnotations>) {
        self.profiler_annotations = Some(imp);
    }

    /// The [`LayoutSensitive`] implementation, if any.
    pub fn layout_sensitive(&self) -> Option<Arc<dyn LayoutSensitive>> {
        self.layout_sensitive.clone()
    }

    /// The [`FoldOperandsTranspose`] implementation, if any.
    pub fn fold_operands_transpose(&self) -> Option<Arc<dyn FoldOperandsTranspose>> {
        self.fold_operands_transpose.clone()
    }

    /// The [`ResourceHandleAllocator`] implementation, if any.
    pub fn resource_handle_allocator(&self) -> Option<Arc<dyn ResourceHandleAllocator>> {
        self.resource_handle_allocator.clone()
    }

    /// The [`ResourceInstanceIdentity`] implementation, if any.
    pub fn resource_instance_identity(&self) -> Option<Arc<dyn ResourceInstanceIdentity>> {
        self.resource_instance_identity.clone()
    }

    /// The [`ProfilerAnnotations`] implementation, if any.
    pub fn profiler_annotations(&self) -> Option<Arc<dyn ProfilerAnnotations>> {
        self.profiler_annotations.clone()
    }
}

impl fmt::Debug for CapabilityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let supported: Vec<&str> = Capability::ALL
            .iter()
            .filter(|c| self.supports(**c))
            .map(|c| c.descr())
            .collect();
        f.debug_struct("CapabilityTable")
            .field("supports", &supported)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::interfaces::AttrProfilerAnnotations;

    #[test]
    fn test_empty_table_supports_nothing() {
        let table = CapabilityTable::new();
        for cap in Capability::ALL {
            assert!(!table.supports(cap));
        }
    }

    #[test]
    fn test_installed_capability_is_reported() {
        let mut table = CapabilityTable::new();
        table.set_profiler_annotations(Arc::new(AttrProfilerAnnotations));
        assert!(table.supports(Capability::ProfilerAnnotations));
        assert!(!table.supports(Capability::LayoutSensitive));
        assert!(table.profiler_annotations().is_some());
    }
}
