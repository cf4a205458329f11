//! Resource kind registry.
//!
//! Resource kinds are opaque, globally unique tags identifying classes of
//! external or mutable state that operations may touch (`Variable`, `Stack`,
//! `RandomGenerator`, plus synthetic kinds registered purely to force
//! ordering). Registration happens once at process start through
//! [`ResourceRegistryBuilder`]; the built [`ResourceRegistry`] is immutable
//! and safe to share across threads (e.g. behind an `Arc`). No two kinds
//! with the same tag may coexist.

use std::fmt;

use string_interner::{DefaultStringInterner, DefaultSymbol, Symbol};
use thiserror::Error;

/// Error from registering a resource kind whose tag already exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("resource kind `{0}` is already registered")]
pub struct DuplicateResourceKind(pub String);

/// An interned resource kind tag.
///
/// Identity is by tag name; ids are only meaningful relative to the
/// [`ResourceRegistry`] that issued them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceKindId(DefaultSymbol);

impl ResourceKindId {
    /// The dense registry index of this kind.
    pub fn index(self) -> usize {
        self.0.to_usize()
    }
}

impl fmt::Debug for ResourceKindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceKindId({})", self.0.to_usize())
    }
}

/// Builder for the process-wide resource registry.
///
/// Append-only registration at startup; consumed by [`build`](Self::build)
/// into a frozen table before any pass runs.
#[derive(Debug, Default)]
pub struct ResourceRegistryBuilder {
    interner: DefaultStringInterner,
}

impl ResourceRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource kind by tag.
    ///
    /// Fails if the tag is already registered.
    pub fn register(&mut self, tag: &str) -> Result<ResourceKindId, DuplicateResourceKind> {
        if self.interner.get(tag).is_some() {
            return Err(DuplicateResourceKind(tag.to_string()));
        }
        Ok(ResourceKindId(self.interner.get_or_intern(tag)))
    }

    /// Freeze the registry.
    pub fn build(self) -> ResourceRegistry {
        tracing::debug!(kinds = self.interner.len(), "resource registry frozen");
        ResourceRegistry {
            interner: self.interner,
        }
    }
}

/// Frozen lookup table of registered resource kinds.
#[derive(Debug)]
pub struct ResourceRegistry {
    interner: DefaultStringInterner,
}

impl ResourceRegistry {
    /// Start building a registry.
    pub fn builder() -> ResourceRegistryBuilder {
        ResourceRegistryBuilder::new()
    }

    /// Look up a kind by tag.
    pub fn get(&self, tag: &str) -> Option<ResourceKindId> {
        self.interner.get(tag).map(ResourceKindId)
    }

    /// The tag of a registered kind.
    ///
    /// Returns `None` for ids issued by a different registry.
    pub fn tag(&self, id: ResourceKindId) -> Option<&str> {
        self.interner.resolve(id.0)
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.interner.len()
    }

    /// Whether no kinds are registered.
    pub fn is_empty(&self) -> bool {
        self.interner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut b = ResourceRegistry::builder();
        let var = b.register("Variable").unwrap();
        let stack = b.register("Stack").unwrap();
        let reg = b.build();

        assert_ne!(var, stack);
        assert_eq!(reg.get("Variable"), Some(var));
        assert_eq!(reg.tag(var), Some("Variable"));
        assert_eq!(reg.get("RandomGenerator"), None);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_duplicate_tag_is_rejected() {
        let mut b = ResourceRegistry::builder();
        b.register("Variable").unwrap();
        let err = b.register("Variable").unwrap_err();
        assert_eq!(err.to_string(), "resource kind `Variable` is already registered");
    }

    #[test]
    fn test_synthetic_ordering_kind_is_just_a_tag() {
        // Synthetic kinds carry no special state in the registry; they only
        // matter to whoever declares effects against them.
        let mut b = ResourceRegistry::builder();
        let fence = b.register("_Fence").unwrap();
        let reg = b.build();
        assert_eq!(reg.tag(fence), Some("_Fence"));
    }
}
