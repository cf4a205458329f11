//! The effect model: declared side effects of operation kinds.
//!
//! Effects are declarative only. An operation kind declares, once at
//! registration, which resource kinds it touches and how; nothing computes
//! effects dynamically. A declaration is either *op-scoped* (applies to
//! every instance of the kind, used when no handle value exists and imposing
//! a total order across all such instances) or *value-scoped* (tied to the
//! specific SSA value named by an operand or result index, so instances on
//! different handles do not constrain each other).
//!
//! Instantiating a declaration against a concrete operation yields an
//! [`Effect`], the unit the ordering analysis reasons about.

use std::fmt;

use crate::ir::{Operation, ValueId};

use super::resource::ResourceKindId;

/// How an operation accesses a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// Observes the resource without modifying it.
    Read,
    /// Modifies the resource.
    Write,
    /// Brings the resource into existence.
    Allocate,
    /// Destroys the resource.
    Free,
}

impl AccessKind {
    /// Whether this access orders like a write.
    ///
    /// Allocate and Free follow write semantics: full ordering against every
    /// other access to the same resource. Only Read commutes with Read.
    pub fn is_write_like(self) -> bool {
        !matches!(self, AccessKind::Read)
    }

    /// Name of this access for diagnostics.
    pub fn descr(&self) -> &'static str {
        match self {
            AccessKind::Read => "read",
            AccessKind::Write => "write",
            AccessKind::Allocate => "allocate",
            AccessKind::Free => "free",
        }
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descr())
    }
}

/// Which value, if any, scopes an effect declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectScope {
    /// Applies to every instance of the kind.
    Op,
    /// Scoped to the handle carried by the operand at this index.
    Operand(usize),
    /// Scoped to the handle produced as the result at this index.
    Result(usize),
}

/// A per-kind effect declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectDecl {
    /// The resource kind touched.
    pub resource: ResourceKindId,
    /// How it is touched.
    pub access: AccessKind,
    /// Op-scoped or tied to an operand/result value.
    pub scope: EffectScope,
}

impl EffectDecl {
    /// An op-scoped declaration.
    pub fn op(resource: ResourceKindId, access: AccessKind) -> Self {
        Self {
            resource,
            access,
            scope: EffectScope::Op,
        }
    }

    /// A declaration scoped to the operand at `index`.
    pub fn operand(index: usize, resource: ResourceKindId, access: AccessKind) -> Self {
        Self {
            resource,
            access,
            scope: EffectScope::Operand(index),
        }
    }

    /// A declaration scoped to the result at `index`.
    pub fn result(index: usize, resource: ResourceKindId, access: AccessKind) -> Self {
        Self {
            resource,
            access,
            scope: EffectScope::Result(index),
        }
    }

    /// Resolve this declaration against a concrete operation.
    ///
    /// A scoped declaration whose index is out of bounds for the operation
    /// degrades to op-scoped: the conservative reading, never a panic.
    pub fn instantiate(&self, op: &Operation) -> Effect {
        let value = match self.scope {
            EffectScope::Op => None,
            EffectScope::Operand(i) => op.operands().get(i).copied(),
            EffectScope::Result(i) => op.results().get(i).copied(),
        };
        Effect {
            resource: self.resource,
            access: self.access,
            value,
        }
    }
}

/// An effect instantiated for one concrete operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effect {
    /// The resource kind touched.
    pub resource: ResourceKindId,
    /// How it is touched.
    pub access: AccessKind,
    /// The specific handle value, or `None` for op-scoped effects.
    pub value: Option<ValueId>,
}

impl Effect {
    /// Whether this effect orders against `other`.
    ///
    /// Two effects conflict when they touch the same resource kind, at least
    /// one of them is write-like, and their value scopes can overlap. An
    /// op-scoped effect overlaps everything on its kind; value-scoped
    /// effects overlap only on the same value.
    pub fn conflicts_with(&self, other: &Effect) -> bool {
        if self.resource != other.resource {
            return false;
        }
        if !self.access.is_write_like() && !other.access.is_write_like() {
            return false;
        }
        match (self.value, other.value) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::resource::ResourceRegistry;
    use crate::ir::Location;

    fn kind(tag: &str) -> ResourceKindId {
        let mut b = ResourceRegistry::builder();
        b.register(tag).unwrap()
    }

    #[test]
    fn test_reads_commute() {
        let var = kind("Variable");
        let a = Effect {
            resource: var,
            access: AccessKind::Read,
            value: None,
        };
        assert!(!a.conflicts_with(&a));
    }

    #[test]
    fn test_write_orders_against_read_and_write() {
        let var = kind("Variable");
        let read = Effect {
            resource: var,
            access: AccessKind::Read,
            value: None,
        };
        let write = Effect {
            resource: var,
            access: AccessKind::Write,
            value: None,
        };
        assert!(write.conflicts_with(&read));
        assert!(read.conflicts_with(&write));
        assert!(write.conflicts_with(&write));
    }

    #[test]
    fn test_allocate_and_free_follow_write_semantics() {
        assert!(AccessKind::Allocate.is_write_like());
        assert!(AccessKind::Free.is_write_like());
        assert!(AccessKind::Write.is_write_like());
        assert!(!AccessKind::Read.is_write_like());
    }

    #[test]
    fn test_distinct_values_do_not_conflict() {
        let var = kind("Variable");
        let w1 = Effect {
            resource: var,
            access: AccessKind::Write,
            value: Some(ValueId::new(1)),
        };
        let w2 = Effect {
            resource: var,
            access: AccessKind::Write,
            value: Some(ValueId::new(2)),
        };
        assert!(!w1.conflicts_with(&w2));
        assert!(w1.conflicts_with(&w1));
    }

    #[test]
    fn test_op_scoped_overlaps_value_scoped() {
        let var = kind("Variable");
        let op_write = Effect {
            resource: var,
            access: AccessKind::Write,
            value: None,
        };
        let val_read = Effect {
            resource: var,
            access: AccessKind::Read,
            value: Some(ValueId::new(7)),
        };
        assert!(op_write.conflicts_with(&val_read));
    }

    #[test]
    fn test_different_kinds_never_conflict() {
        let mut b = ResourceRegistry::builder();
        let var = b.register("Variable").unwrap();
        let stack = b.register("Stack").unwrap();
        let w1 = Effect {
            resource: var,
            access: AccessKind::Write,
            value: None,
        };
        let w2 = Effect {
            resource: stack,
            access: AccessKind::Write,
            value: None,
        };
        assert!(!w1.conflicts_with(&w2));
    }

    #[test]
    fn test_out_of_bounds_scope_degrades_to_op_scoped() {
        let var = kind("Variable");
        let decl = EffectDecl::operand(3, var, AccessKind::Write);
        let op = Operation::new("cinder.var_write", Location::unknown());
        let eff = decl.instantiate(&op);
        assert_eq!(eff.value, None);
    }

    #[test]
    fn test_instantiate_binds_operand_value() {
        let var = kind("Variable");
        let decl = EffectDecl::operand(0, var, AccessKind::Read);
        let op = Operation::new("cinder.var_read", Location::unknown())
            .with_operands(vec![ValueId::new(9)]);
        assert_eq!(decl.instantiate(&op).value, Some(ValueId::new(9)));
    }
}
