//! Debug verification hooks for trusted contracts.
//!
//! The resource-instance bijectivity and unique-allocation contracts are
//! preconditions supplied at registration and never checked on the hot
//! path. This module sample-checks them over a concrete module so test and
//! debug builds catch registration mistakes; production passes pay nothing.
//!
//! Errors are contract violations the checks can prove; warnings are
//! registrations that look inconsistent but may be intentional. Callers
//! decide severity, as with any local failure in this layer.

use std::collections::HashMap;

use crate::capability::Capability;
use crate::effects::EffectScope;
use crate::ir::{Module, Operation};
use crate::registry::OpRegistry;

/// Findings from one verification run.
#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Provable contract violations.
    pub errors: Vec<String>,
    /// Suspicious but not provably wrong registrations.
    pub warnings: Vec<String>,
}

impl VerifyReport {
    /// Whether no errors were found (warnings allowed).
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Verify the registry's registrations against a concrete module.
pub fn verify_module(module: &Module, registry: &OpRegistry) -> VerifyReport {
    let mut report = VerifyReport::default();
    check_identity_registrations(registry, &mut report);
    check_key_consistency(module, registry, &mut report);
    check_unique_allocation_declarations(registry, &mut report);
    report
}

/// Run [`verify_module`] in debug builds, panicking on provable violations.
/// No-op in release builds.
pub fn debug_verify(module: &Module, registry: &OpRegistry) {
    if cfg!(debug_assertions) {
        let report = verify_module(module, registry);
        assert!(
            report.is_clean(),
            "capability contract violations: {:?}",
            report.errors
        );
    }
}

/// The identity capability is only valid for single-resource kinds.
fn check_identity_registrations(registry: &OpRegistry, report: &mut VerifyReport) {
    for spec in registry.specs() {
        if !spec.capabilities().supports(Capability::ResourceInstanceIdentity) {
            continue;
        }
        let mut op_scoped_kinds: Vec<usize> = spec
            .effect_decls()
            .iter()
            .filter(|d| d.scope == EffectScope::Op)
            .map(|d| d.resource.index())
            .collect();
        op_scoped_kinds.sort_unstable();
        op_scoped_kinds.dedup();
        if op_scoped_kinds.len() > 1 {
            report.errors.push(format!(
                "`{}` implements resource-instance-identity but declares op-scoped \
                 effects on {} distinct resource kinds",
                spec.name(),
                op_scoped_kinds.len()
            ));
        }
    }
}

/// Sample the bijectivity contract: two operations sharing a key should not
/// disagree on which resource kinds they touch.
fn check_key_consistency(module: &Module, registry: &OpRegistry, report: &mut VerifyReport) {
    let mut seen: HashMap<String, (String, Vec<String>)> = HashMap::new();
    module.walk(&mut |op| {
        let Some(identity) = registry.resource_instance_identity(op) else {
            return;
        };
        let Some(key) = identity.resource_instance_key(op) else {
            return;
        };
        let kinds = touched_kind_names(op, registry);
        match seen.get(&key) {
            Some((first_op, first_kinds)) if *first_kinds != kinds => {
                report.warnings.push(format!(
                    "instance key `{key}` is shared by `{first_op}` and `{}` \
                     which touch different resource kinds",
                    op.qualified_name()
                ));
            }
            Some(_) => {}
            None => {
                seen.insert(key, (op.qualified_name().to_string(), kinds));
            }
        }
    });
}

/// A unique-allocation claim without any Allocate effect is inert.
fn check_unique_allocation_declarations(registry: &OpRegistry, report: &mut VerifyReport) {
    use crate::capability::TraitTag;
    use crate::effects::AccessKind;

    for spec in registry.specs() {
        if spec.traits().contains(TraitTag::UniqueResourceAllocation)
            && !spec
                .effect_decls()
                .iter()
                .any(|d| d.access == AccessKind::Allocate)
        {
            report.warnings.push(format!(
                "`{}` declares unique-resource-allocation but no allocate effect",
                spec.name()
            ));
        }
    }
}

fn touched_kind_names(op: &Operation, registry: &OpRegistry) -> Vec<String> {
    let Some(spec) = registry.spec_of(op) else {
        return Vec::new();
    };
    let mut kinds: Vec<String> = spec
        .effect_decls()
        .iter()
        .map(|d| format!("{:?}", d.resource))
        .collect();
    kinds.sort();
    kinds.dedup();
    kinds
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::capability::ResourceInstanceIdentity;
    use crate::dialect::{builtin_dialect, CONTAINER_ATTR, SHARED_NAME_ATTR};
    use crate::effects::{AccessKind, ResourceRegistry};
    use crate::ir::{Attribute, Location, ValueId};
    use crate::registry::OpSpec;

    #[test]
    fn test_builtin_dialect_is_clean() {
        let (_, registry) = builtin_dialect().unwrap();
        let mut module = Module::new();
        module.push(
            Operation::new("cinder.var_alloc", Location::unknown())
                .with_results(vec![ValueId::new(0)])
                .with_attr(CONTAINER_ATTR, Attribute::Str("box".into()))
                .with_attr(SHARED_NAME_ATTR, Attribute::Str("v1".into())),
        );
        let report = verify_module(&module, &registry);
        assert!(report.is_clean(), "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_identity_on_multi_resource_kind_is_an_error() {
        struct ConstKey;
        impl ResourceInstanceIdentity for ConstKey {
            fn resource_instance_key(&self, _op: &Operation) -> Option<String> {
                Some("k".into())
            }
        }

        let mut rb = ResourceRegistry::builder();
        let a = rb.register("A").unwrap();
        let b = rb.register("B").unwrap();
        let mut ob = crate::registry::OpRegistry::builder();
        ob.register(
            OpSpec::builder("t.bad")
                .op_effect(a, AccessKind::Write)
                .op_effect(b, AccessKind::Write)
                .resource_instance_identity(Arc::new(ConstKey))
                .build(),
        )
        .unwrap();
        let registry = ob.build();

        let report = verify_module(&Module::new(), &registry);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("t.bad"));
    }

    #[test]
    fn test_unique_allocation_without_allocate_warns() {
        let mut ob = crate::registry::OpRegistry::builder();
        ob.register(
            OpSpec::builder("t.claims_unique")
                .unique_resource_allocation()
                .build(),
        )
        .unwrap();
        let registry = ob.build();
        let report = verify_module(&Module::new(), &registry);
        assert!(report.is_clean());
        assert_eq!(report.warnings.len(), 1);
    }
}
