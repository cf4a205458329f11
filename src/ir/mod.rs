//! Minimal IR substrate for the capability/effect layer.
//!
//! This module provides just enough graph structure for capability queries
//! and effect analysis to operate on:
//!
//! - [`Module`] - an ordered sequence of top-level operations
//! - [`Operation`] - a node with a kind name, operands, results, attributes,
//!   and an optional nested region
//! - [`Location`] - file/line/column tracking
//!
//! The walk order is deterministic pre-order: an operation is visited before
//! the operations in its region, siblings in list order. Passes rely on this
//! for reproducible behavior.

pub mod location;
pub mod op;

pub use location::Location;
pub use op::{Attribute, Operation, ProfilerData, ValueId};

/// A compilation unit: an ordered list of top-level operations plus a
/// counter for minting SSA values.
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// Top-level operations, in program order.
    ops: Vec<Operation>,
    /// Next unallocated value index.
    next_value: u32,
}

impl Module {
    /// Create an empty module.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh SSA value.
    pub fn fresh_value(&mut self) -> ValueId {
        let v = ValueId::new(self.next_value);
        self.next_value += 1;
        v
    }

    /// Append a top-level operation.
    pub fn push(&mut self, op: Operation) {
        self.ops.push(op);
    }

    /// Top-level operations, in program order.
    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    /// Mutable access to the top-level operations.
    pub fn ops_mut(&mut self) -> &mut Vec<Operation> {
        &mut self.ops
    }

    /// Total number of operations, including nested ones.
    pub fn op_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }

    /// Visit every operation in deterministic pre-order.
    pub fn walk(&self, f: &mut impl FnMut(&Operation)) {
        for op in &self.ops {
            walk_op(op, f);
        }
    }

    /// Visit every operation in deterministic pre-order, mutably.
    ///
    /// Attribute writes are the expected mutation; callers must not add or
    /// remove operations during the walk.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Operation)) {
        for op in &mut self.ops {
            walk_op_mut(op, f);
        }
    }
}

fn walk_op(op: &Operation, f: &mut impl FnMut(&Operation)) {
    f(op);
    for nested in op.region() {
        walk_op(nested, f);
    }
}

fn walk_op_mut(op: &mut Operation, f: &mut impl FnMut(&mut Operation)) {
    f(op);
    for nested in op.region_mut() {
        walk_op_mut(nested, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_values_are_distinct() {
        let mut m = Module::new();
        let a = m.fresh_value();
        let b = m.fresh_value();
        assert_ne!(a, b);
    }

    #[test]
    fn test_walk_is_preorder() {
        let mut m = Module::new();
        let inner = Operation::new("cinder.relu", Location::unknown());
        let outer =
            Operation::new("cinder.profile_scope", Location::unknown()).with_region(vec![inner]);
        m.push(outer);
        m.push(Operation::new("cinder.add", Location::unknown()));

        let mut seen = Vec::new();
        m.walk(&mut |op| seen.push(op.qualified_name().to_string()));
        assert_eq!(seen, ["cinder.profile_scope", "cinder.relu", "cinder.add"]);
        assert_eq!(m.op_count(), 3);
    }

    #[test]
    fn test_walk_mut_allows_attribute_writes() {
        let mut m = Module::new();
        m.push(Operation::new("cinder.add", Location::unknown()));
        m.walk_mut(&mut |op| op.set_attr("visited", Attribute::Bool(true)));
        assert_eq!(
            m.ops()[0].attr("visited").and_then(Attribute::as_bool),
            Some(true)
        );
    }
}
