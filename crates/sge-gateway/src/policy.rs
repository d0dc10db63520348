//! Policy decider
//!
//! Resolves workspace governance settings plus the request's entry point and
//! risk profile into a routing decision. Every canon override lives here,
//! nowhere else:
//! - `onboarding_dump` always resolves to direct, regardless of stored
//!   settings and regardless of risk
//! - `Global` is never offered as a default blast radius (coerced to scoped;
//!   an explicitly declared `Global` is honored)
//! - direct substrate writes are never exposed: with governance disabled the
//!   route is still decided here and executed by the gateway

use crate::risk::{OperationRisk, ScopeImpact};
use sge_substrate::{BlastRadius, EntryPoint, GovernanceSettings, PolicyRoute};

/// Resolved routing target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Execute immediately
    Direct,
    /// Queue a proposal for review
    Proposal,
}

impl Route {
    /// Stable snake_case name used in reason strings
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Direct => "direct",
            Route::Proposal => "proposal",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strictness of the external validator, when consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorMode {
    /// Advisory findings only
    Lenient,
    /// Findings should block approval in review surfaces
    Strict,
}

/// Output of the policy decider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDecision {
    /// Where the request goes
    pub route: Route,
    /// Whether the external validator must be consulted on proposals
    pub require_validator: bool,
    /// Validator strictness
    pub validator_mode: ValidatorMode,
    /// Radius the request is treated as having
    pub effective_blast_radius: BlastRadius,
    /// Stable diagnostic string: `ep_policy_<route>:<entry_point>`
    pub reason: String,
}

/// Decide routing for one request
#[must_use]
pub fn decide(
    settings: &GovernanceSettings,
    entry_point: EntryPoint,
    declared_radius: Option<BlastRadius>,
    risk: &OperationRisk,
) -> PolicyDecision {
    let effective_blast_radius = match declared_radius {
        Some(radius) => radius,
        // Canon: a stored Global default is coerced down.
        None if settings.default_blast_radius == BlastRadius::Global => BlastRadius::Scoped,
        None => settings.default_blast_radius,
    };

    let route = if entry_point == EntryPoint::OnboardingDump {
        // Canon: onboarding never queues, and risk never overrides this.
        Route::Direct
    } else if !settings.governance_enabled {
        Route::Direct
    } else {
        match settings.policy_for(entry_point) {
            PolicyRoute::Direct => Route::Direct,
            PolicyRoute::Proposal => Route::Proposal,
            PolicyRoute::Hybrid => {
                if risk.scope_impact == ScopeImpact::High {
                    Route::Proposal
                } else {
                    Route::Direct
                }
            }
        }
    };

    let validator_mode = if effective_blast_radius == BlastRadius::Global
        || risk.scope_impact == ScopeImpact::High
    {
        ValidatorMode::Strict
    } else {
        ValidatorMode::Lenient
    };

    let reason = format!("ep_policy_{route}:{entry_point}");
    tracing::debug!(%reason, radius = %effective_blast_radius, "policy decided");

    PolicyDecision {
        route,
        require_validator: settings.validator_required,
        validator_mode,
        effective_blast_radius,
        reason,
    }
}
