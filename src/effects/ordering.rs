//! Ordering/dependency analysis over declared effects.
//!
//! A pure function of one block's operations and the frozen registry:
//! recomputable any number of times, no side effects, so passes can call it
//! freely between incremental edits.
//!
//! Conservative rules:
//!
//! - An operation whose kind is unregistered has *unknown* effects and is
//!   assumed to read and write everything: it orders against every
//!   operation with any declared effect and against other unknowns.
//! - Write, Allocate, and Free on the same resource kind order fully, among
//!   themselves and against reads.
//! - Reads on the same kind commute with each other. A read whose results
//!   are unused may be deleted outright; deletion is not a reordering.
//! - Value-scoped effects constrain only operations touching the same
//!   handle value.
//! - Two op-scoped Allocate effects from kinds carrying the
//!   unique-resource-allocation contract do not order against each other:
//!   the contract asserts their resources never alias.
//! - A must-execute pin blocks pruning but contributes no ordering edges
//!   between other operations.

use crate::ir::{Operation, ValueId};
use crate::registry::OpRegistry;

use super::decl::{AccessKind, Effect};
use crate::capability::TraitTag;

/// The dependency relation over one block, as computed by [`analyze_block`].
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Direct ordering edges: `succs[i]` lists every j > i that must stay
    /// after i.
    succs: Vec<Vec<usize>>,
    /// Whether each operation may be deleted when its results are unused.
    prunable: Vec<bool>,
}

impl DependencyGraph {
    /// Number of operations analyzed.
    pub fn len(&self) -> usize {
        self.succs.len()
    }

    /// Whether the analyzed block was empty.
    pub fn is_empty(&self) -> bool {
        self.succs.is_empty()
    }

    /// Whether operation `a` must stay before operation `b` in any valid
    /// reschedule. Indices are positions in the analyzed block; transitive.
    pub fn must_precede(&self, a: usize, b: usize) -> bool {
        if a == b {
            return false;
        }
        // Edges only point forward, so a simple worklist reachability walk
        // terminates without a visited check growing past n.
        let mut visited = vec![false; self.succs.len()];
        let mut work = vec![a];
        while let Some(i) = work.pop() {
            for &j in &self.succs[i] {
                if j == b {
                    return true;
                }
                if !visited[j] {
                    visited[j] = true;
                    work.push(j);
                }
            }
        }
        false
    }

    /// Whether operations `a` and `b` may swap relative order.
    pub fn can_reorder(&self, a: usize, b: usize) -> bool {
        !self.must_precede(a, b) && !self.must_precede(b, a)
    }

    /// Whether the operation at `index` may be deleted: only read effects,
    /// not pinned, and its results unused within the block.
    pub fn prunable(&self, index: usize) -> bool {
        self.prunable[index]
    }

    /// Check a proposed schedule against the relation.
    ///
    /// `order` lists original block indices in their new program order.
    /// The schedule is valid when every omitted operation is prunable and
    /// every ordering edge between retained operations is preserved.
    pub fn is_valid_schedule(&self, order: &[usize]) -> bool {
        let n = self.succs.len();
        let mut pos = vec![None; n];
        for (p, &i) in order.iter().enumerate() {
            if i >= n || pos[i].is_some() {
                return false;
            }
            pos[i] = Some(p);
        }
        for i in 0..n {
            if pos[i].is_none() && !self.prunable[i] {
                return false;
            }
        }
        for (i, succs) in self.succs.iter().enumerate() {
            let Some(pi) = pos[i] else { continue };
            for &j in succs {
                if let Some(pj) = pos[j] {
                    if pi >= pj {
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// Analyze one block of operations.
///
/// `block` is a sibling sequence in program order; effects of nested regions
/// are attributed to the enclosing operation (see [`OpRegistry::effects`]).
pub fn analyze_block(block: &[Operation], registry: &OpRegistry) -> DependencyGraph {
    let n = block.len();
    let effects: Vec<Option<Vec<Effect>>> = block.iter().map(|op| registry.effects(op)).collect();
    let unique_alloc: Vec<bool> = block
        .iter()
        .map(|op| registry.has_trait(op, TraitTag::UniqueResourceAllocation))
        .collect();

    let used = used_values(block);

    let mut succs = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            if ops_conflict(&effects[i], &effects[j], unique_alloc[i] && unique_alloc[j]) {
                succs[i].push(j);
            }
        }
    }

    let prunable = block
        .iter()
        .enumerate()
        .map(|(i, op)| {
            let Some(effs) = &effects[i] else {
                return false; // unknown effects: never prunable
            };
            if effs.iter().any(|e| e.access.is_write_like()) {
                return false;
            }
            if registry.pinned(op) {
                return false;
            }
            op.results().iter().all(|r| !used.contains(r))
        })
        .collect();

    DependencyGraph { succs, prunable }
}

/// Every value consumed anywhere in the block, including nested regions.
fn used_values(block: &[Operation]) -> Vec<ValueId> {
    fn collect(op: &Operation, out: &mut Vec<ValueId>) {
        out.extend_from_slice(op.operands());
        for nested in op.region() {
            collect(nested, out);
        }
    }
    let mut out = Vec::new();
    for op in block {
        collect(op, &mut out);
    }
    out.sort_unstable();
    out.dedup();
    out
}

/// Whether two operations' effect sets force an ordering edge.
fn ops_conflict(
    a: &Option<Vec<Effect>>,
    b: &Option<Vec<Effect>>,
    both_unique_alloc: bool,
) -> bool {
    match (a, b) {
        // Two unknowns both read and write everything.
        (None, None) => true,
        // An unknown conflicts with anything that touches any resource.
        (None, Some(effs)) | (Some(effs), None) => !effs.is_empty(),
        (Some(ea), Some(eb)) => ea.iter().any(|x| {
            eb.iter().any(|y| {
                if both_unique_alloc
                    && x.access == AccessKind::Allocate
                    && y.access == AccessKind::Allocate
                {
                    // The unique-allocation contract asserts these resources
                    // never alias, so independent allocations may reorder.
                    return false;
                }
                x.conflicts_with(y)
            })
        }),
    }
}
