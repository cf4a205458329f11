//! Trait tags: boolean markers on an operation kind.
//!
//! A trait tag changes how *generic* passes treat an operation without
//! requiring any interface implementation: an [`Idempotent`](TraitTag::Idempotent)
//! op composed with itself collapses to one instance, a
//! [`CannotDuplicate`](TraitTag::CannotDuplicate) op holds hidden state and
//! must not be cloned, a [`MustExecute`](TraitTag::MustExecute) op is pinned
//! against pruning. Tags are declared statically per kind at registration
//! and queried in O(1). They compose additively; a kind may declare any
//! subset.

use std::fmt;

/// A boolean marker declared on an operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TraitTag {
    /// `f(f(x)) == f(x)`: consecutive applications collapse to one.
    Idempotent = 0,
    /// `f(f(x)) == x`: consecutive applications cancel.
    Involution,
    /// Result is independent of operand data layout.
    LayoutAgnostic,
    /// Holds hidden state; generic passes must not duplicate it.
    CannotDuplicate,
    /// Must never be constant-folded, even with constant operands.
    NoConstantFold,
    /// Element-wise unary operation.
    CwiseUnary,
    /// Element-wise binary operation.
    CwiseBinary,
    /// Every resource handle this op produces is distinct from every other
    /// handle produced anywhere in the graph. Trusted, not verified: see
    /// [`crate::registry::OpSpecBuilder::unique_resource_allocation`].
    UniqueResourceAllocation,
    /// Eligible for profiler annotation by the annotation pass.
    ProfileAnnotation,
    /// Pinned: must never be considered dead or prunable, regardless of
    /// whether its results are used.
    MustExecute,
}

impl TraitTag {
    /// Every tag, in declaration order.
    pub const ALL: [TraitTag; 10] = [
        TraitTag::Idempotent,
        TraitTag::Involution,
        TraitTag::LayoutAgnostic,
        TraitTag::CannotDuplicate,
        TraitTag::NoConstantFold,
        TraitTag::CwiseUnary,
        TraitTag::CwiseBinary,
        TraitTag::UniqueResourceAllocation,
        TraitTag::ProfileAnnotation,
        TraitTag::MustExecute,
    ];

    /// The bit this tag occupies in a [`TraitSet`].
    const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Name of this tag for diagnostics.
    pub fn descr(&self) -> &'static str {
        match self {
            TraitTag::Idempotent => "idempotent",
            TraitTag::Involution => "involution",
            TraitTag::LayoutAgnostic => "layout-agnostic",
            TraitTag::CannotDuplicate => "cannot-duplicate",
            TraitTag::NoConstantFold => "no-constant-fold",
            TraitTag::CwiseUnary => "cwise-unary",
            TraitTag::CwiseBinary => "cwise-binary",
            TraitTag::UniqueResourceAllocation => "unique-resource-allocation",
            TraitTag::ProfileAnnotation => "profile-annotation",
            TraitTag::MustExecute => "must-execute",
        }
    }
}

impl fmt::Display for TraitTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descr())
    }
}

/// The set of trait tags declared by one operation kind.
///
/// Stored as a bitmask; membership queries are a single AND.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TraitSet(u16);

impl TraitSet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Whether no tags are set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether the given tag is set.
    pub const fn contains(self, tag: TraitTag) -> bool {
        self.0 & tag.bit() != 0
    }

    /// Add a tag, returning the extended set.
    #[must_use]
    pub const fn with(self, tag: TraitTag) -> Self {
        Self(self.0 | tag.bit())
    }

    /// Union of two sets.
    #[must_use]
    pub const fn union(self, other: TraitSet) -> Self {
        Self(self.0 | other.0)
    }

    /// Iterate over the tags in this set, in declaration order.
    pub fn iter(self) -> impl Iterator<Item = TraitTag> {
        TraitTag::ALL.into_iter().filter(move |t| self.contains(*t))
    }
}

impl FromIterator<TraitTag> for TraitSet {
    fn from_iter<I: IntoIterator<Item = TraitTag>>(iter: I) -> Self {
        iter.into_iter().fold(TraitSet::empty(), TraitSet::with)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set() {
        let s = TraitSet::empty();
        assert!(s.is_empty());
        for tag in TraitTag::ALL {
            assert!(!s.contains(tag));
        }
    }

    #[test]
    fn test_with_and_contains() {
        let s = TraitSet::empty()
            .with(TraitTag::Idempotent)
            .with(TraitTag::MustExecute);
        assert!(s.contains(TraitTag::Idempotent));
        assert!(s.contains(TraitTag::MustExecute));
        assert!(!s.contains(TraitTag::Involution));
    }

    #[test]
    fn test_tags_compose_additively() {
        let all: TraitSet = TraitTag::ALL.into_iter().collect();
        assert_eq!(all.iter().count(), TraitTag::ALL.len());
    }

    #[test]
    fn test_union() {
        let a = TraitSet::empty().with(TraitTag::CwiseUnary);
        let b = TraitSet::empty().with(TraitTag::LayoutAgnostic);
        let u = a.union(b);
        assert!(u.contains(TraitTag::CwiseUnary));
        assert!(u.contains(TraitTag::LayoutAgnostic));
    }

    #[test]
    fn test_bits_are_distinct() {
        for (i, a) in TraitTag::ALL.iter().enumerate() {
            for b in &TraitTag::ALL[i + 1..] {
                assert_ne!(
                    TraitSet::empty().with(*a),
                    TraitSet::empty().with(*b),
                    "{a} and {b} share a bit"
                );
            }
        }
    }
}
