//! Per-workspace governance settings
//!
//! One row per workspace in the settings table; when the row is absent the
//! engine falls back to `GovernanceSettings::default()`. Canon overrides
//! (onboarding always direct, global never a default radius) live in the
//! policy decider, not here: this module only carries the stored shape.

use crate::change::{BlastRadius, EntryPoint};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stored routing policy for one entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyRoute {
    /// Commit immediately
    Direct,
    /// Queue for human review
    Proposal,
    /// Direct unless risk escalates the request
    Hybrid,
}

impl PolicyRoute {
    /// Stable snake_case name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyRoute::Direct => "direct",
            PolicyRoute::Proposal => "proposal",
            PolicyRoute::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for PolicyRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-workspace governance configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceSettings {
    /// Master switch for the review flow
    pub governance_enabled: bool,
    /// Whether the external validator must be consulted on proposals
    pub validator_required: bool,
    /// Whether review surfaces are shown to workspace members
    pub governance_ui_enabled: bool,
    /// Stored per-entry-point routing
    pub entry_point_policies: HashMap<EntryPoint, PolicyRoute>,
    /// Radius assumed when the descriptor declares none
    pub default_blast_radius: BlastRadius,
}

impl GovernanceSettings {
    /// Stored policy for one entry point; absent entries default to the
    /// review route, which is the safe side.
    #[inline]
    #[must_use]
    pub fn policy_for(&self, entry_point: EntryPoint) -> PolicyRoute {
        self.entry_point_policies
            .get(&entry_point)
            .copied()
            .unwrap_or(PolicyRoute::Proposal)
    }

    /// Override the route for one entry point
    #[inline]
    #[must_use]
    pub fn with_policy(mut self, entry_point: EntryPoint, route: PolicyRoute) -> Self {
        self.entry_point_policies.insert(entry_point, route);
        self
    }

    /// Override the default radius
    #[inline]
    #[must_use]
    pub fn with_default_blast_radius(mut self, radius: BlastRadius) -> Self {
        self.default_blast_radius = radius;
        self
    }

    /// Require the external validator on proposals
    #[inline]
    #[must_use]
    pub fn with_validator_required(mut self, required: bool) -> Self {
        self.validator_required = required;
        self
    }
}

impl Default for GovernanceSettings {
    fn default() -> Self {
        let mut entry_point_policies = HashMap::new();
        entry_point_policies.insert(EntryPoint::ManualEdit, PolicyRoute::Proposal);
        entry_point_policies.insert(EntryPoint::OnboardingDump, PolicyRoute::Direct);
        entry_point_policies.insert(EntryPoint::GraphAction, PolicyRoute::Proposal);
        entry_point_policies.insert(EntryPoint::DocumentEdit, PolicyRoute::Hybrid);
        entry_point_policies.insert(EntryPoint::TimelineRestore, PolicyRoute::Proposal);

        Self {
            governance_enabled: true,
            validator_required: false,
            governance_ui_enabled: true,
            entry_point_policies,
            default_blast_radius: BlastRadius::Local,
        }
    }
}
