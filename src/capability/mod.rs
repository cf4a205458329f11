//! Capabilities: optional, typed contracts on operation kinds.
//!
//! Two mechanisms with different weights:
//!
//! - [`interfaces`] - full interface implementations (layout updates,
//!   resource handle allocation, profiler annotation attachment), registered
//!   as trait objects and dispatched without knowing the concrete kind.
//! - [`traits`] - boolean tags that change how generic passes treat an
//!   operation (idempotent, cannot-duplicate, must-execute, ...) without any
//!   method to implement.
//!
//! [`query`] names the interfaces and holds the per-kind capability table;
//! the lookup entry points live on [`crate::registry::OpRegistry`].

pub mod interfaces;
pub mod query;
pub mod traits;

pub use interfaces::{
    AttrProfilerAnnotations, CapabilityError, DeviceInfo, FoldOperandsTranspose, LayoutSensitive,
    ProfilerAnnotations, ResourceHandleAllocator, ResourceId, ResourceIdMap,
    ResourceInstanceIdentity, PROFILER_ATTR,
};
pub use query::{Capability, CapabilityTable};
pub use traits::{TraitSet, TraitTag};
