//! Effects: declared side effects and the ordering they induce.
//!
//! - [`resource`] - the frozen registry of resource kind tags
//! - [`decl`] - effect declarations (op- or value-scoped) and their
//!   instantiation against concrete operations
//! - [`ordering`] - the conservative partial order derived from declared
//!   effects, which scheduling and motion transformations must respect

pub mod decl;
pub mod ordering;
pub mod resource;

pub use decl::{AccessKind, Effect, EffectDecl, EffectScope};
pub use ordering::{analyze_block, DependencyGraph};
pub use resource::{
    DuplicateResourceKind, ResourceKindId, ResourceRegistry, ResourceRegistryBuilder,
};
