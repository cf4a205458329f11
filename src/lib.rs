//! # Cinder IR capability/effect layer
//!
//! This crate is the capability and effect substrate of the Cinder compiler
//! IR: the mechanism by which operations declare optional *capabilities*
//! (typed interfaces such as layout sensitivity or resource handle
//! allocation) and optional *effects* (reads, writes, allocations, and
//! frees against named resource kinds), and by which passes query both
//! generically, without knowing concrete operation kinds.
//!
//! ## Architecture
//!
//! ```text
//! ResourceRegistry ──> EffectDecl ──┐
//!                                   ├──> OpRegistry (frozen) ──> passes
//! TraitTag / CapabilityTable ───────┘          │
//!                                              v
//!                                     analyze_block (ordering)
//! ```
//!
//! - [`ir`] - the minimal graph substrate: modules, operations, locations
//! - [`effects`] - resource kinds, effect declarations, and the ordering
//!   analysis derived from them
//! - [`capability`] - the five capability interfaces, trait tags, and the
//!   per-kind capability table
//! - [`registry`] - per-kind registration, frozen before any pass runs, and
//!   the O(1) capability query engine
//! - [`dialect`] - the standard `cinder` dialect registrations
//! - [`profile`] - the versioned profile-data file format
//! - [`passes`] - the profile annotation pass
//! - [`verify`] - debug-build sampling of the trusted contracts
//!
//! ## Example
//!
//! ```
//! use cinder_ir::dialect::builtin_dialect;
//! use cinder_ir::effects::analyze_block;
//! use cinder_ir::ir::{Location, Module, Operation};
//!
//! let (_resources, registry) = builtin_dialect().expect("fresh registries");
//!
//! let mut module = Module::new();
//! module.push(Operation::new("cinder.stack_size", Location::unknown()));
//! module.push(Operation::new("cinder.stack_push", Location::unknown()));
//!
//! let graph = analyze_block(module.ops(), &registry);
//! assert!(graph.must_precede(0, 1));
//! assert!(graph.prunable(0));
//! ```

pub mod capability;
pub mod dialect;
pub mod effects;
pub mod ir;
pub mod passes;
pub mod profile;
pub mod registry;
pub mod verify;

pub use capability::{
    Capability, CapabilityError, CapabilityTable, DeviceInfo, FoldOperandsTranspose,
    LayoutSensitive, ProfilerAnnotations, ResourceHandleAllocator, ResourceId, ResourceIdMap,
    ResourceInstanceIdentity, TraitSet, TraitTag,
};
pub use effects::{
    analyze_block, AccessKind, DependencyGraph, Effect, EffectDecl, EffectScope, ResourceKindId,
    ResourceRegistry,
};
pub use ir::{Attribute, Location, Module, Operation, ProfilerData, ValueId};
pub use passes::{AnnotateProfilePass, AnnotateStats};
pub use profile::{profile_key, ProfileDb, ProfileError};
pub use registry::{OpRegistry, OpSpec, OpSpecBuilder, RegistryError};
pub use verify::{debug_verify, verify_module, VerifyReport};
