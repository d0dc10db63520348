//! Risk assessor
//!
//! Deterministic, pure classification of an operation list into a scope
//! impact tier. The result depends only on the set of kinds present and the
//! count, never on operation order.

use sge_substrate::{Operation, OperationKind};
use std::collections::BTreeSet;

/// Scope impact tiers, ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeImpact {
    /// Additive, single-item changes
    Low,
    /// Relationship-mutating or destructive changes
    Medium,
    /// Scope-promoting or cross-document changes
    High,
}

impl ScopeImpact {
    /// Stable snake_case name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeImpact::Low => "low",
            ScopeImpact::Medium => "medium",
            ScopeImpact::High => "high",
        }
    }
}

impl std::fmt::Display for ScopeImpact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived risk profile of one operation list; never stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRisk {
    /// Highest tier forced by any kind present
    pub scope_impact: ScopeImpact,
    /// Number of operations in the list
    pub operation_count: usize,
    /// Distinct kinds present
    pub operation_types: BTreeSet<OperationKind>,
}

/// Classify an operation list
#[must_use]
pub fn assess(ops: &[Operation]) -> OperationRisk {
    let operation_types: BTreeSet<OperationKind> = ops.iter().map(Operation::kind).collect();

    let mut scope_impact = ScopeImpact::Low;
    for kind in &operation_types {
        if kind.mutates_relationships() || kind.is_destructive() {
            scope_impact = scope_impact.max(ScopeImpact::Medium);
        }
        if kind.crosses_scope() {
            scope_impact = scope_impact.max(ScopeImpact::High);
        }
    }

    OperationRisk {
        scope_impact,
        operation_count: ops.len(),
        operation_types,
    }
}
