//! Decision gateway
//!
//! Single choke point for every substrate mutation. A request arrives as a
//! [`ChangeDescriptor`], passes structural validation and risk assessment,
//! gets a policy decision, and leaves as exactly one of two outcomes:
//! committed immediately or queued as a proposal. Nothing writes to the
//! substrate around this path.

use crate::analyzer::{analyze_bounded, ChangeAnalyzer};
use crate::cascade::CascadeAnalyzer;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::executor::{ExecutionContext, ExecutionSummary, MutationExecutor};
use crate::idempotency::{CreateOutcome, CreatePayload, IdempotencyGuard};
use crate::policy::{self, Route};
use crate::proposals::ProposalLifecycle;
use crate::risk;
use crate::timeline::{TimelineQuery, TimelineService};
use crate::validate;
use sge_store::SubstrateStore;
use sge_substrate::{
    ActorId, BasketId, CascadePreview, ChangeDescriptor, GovernanceSettings, Proposal,
    ProposalId, ProposalStatus, SubstrateId, SubstrateType, TimelineEvent, TimelinePage,
    ValidatorReport, WorkspaceId,
};
use std::sync::Arc;

/// Terminal outcome of routing one change
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    /// The change executed immediately
    Committed {
        /// What was applied
        summary: ExecutionSummary,
        /// Stamped events, including the batch summary event
        events: Vec<TimelineEvent>,
        /// Why this route was chosen
        reason: String,
    },
    /// The change was queued for review
    Proposed {
        /// The stored proposal
        proposal: Proposal,
        /// Why this route was chosen
        reason: String,
    },
}

impl RouteOutcome {
    /// True when the change executed immediately
    #[inline]
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self, RouteOutcome::Committed { .. })
    }

    /// Proposal id when the change was queued
    #[inline]
    #[must_use]
    pub fn proposal_id(&self) -> Option<ProposalId> {
        match self {
            RouteOutcome::Proposed { proposal, .. } => Some(proposal.id),
            RouteOutcome::Committed { .. } => None,
        }
    }
}

/// The single mutation entry point
#[derive(Clone)]
pub struct DecisionGateway {
    store: Arc<dyn SubstrateStore>,
    analyzer: Option<Arc<dyn ChangeAnalyzer>>,
    config: GatewayConfig,
    executor: MutationExecutor,
    proposals: ProposalLifecycle,
    cascade: CascadeAnalyzer,
    idempotency: IdempotencyGuard,
    timeline: TimelineService,
}

impl DecisionGateway {
    /// Create a gateway over a store with default configuration
    #[must_use]
    pub fn new(store: Arc<dyn SubstrateStore>) -> Self {
        Self::with_config(store, GatewayConfig::new())
    }

    /// Create a gateway with explicit configuration
    #[must_use]
    pub fn with_config(store: Arc<dyn SubstrateStore>, config: GatewayConfig) -> Self {
        let executor = MutationExecutor::new(Arc::clone(&store));
        let proposals = ProposalLifecycle::with_executor(Arc::clone(&store), executor.clone());
        let cascade = CascadeAnalyzer::new(Arc::clone(&store));
        let idempotency = IdempotencyGuard::new(Arc::clone(&store));
        let timeline = TimelineService::new(Arc::clone(&store), config.clone());
        Self {
            store,
            analyzer: None,
            config,
            executor,
            proposals,
            cascade,
            idempotency,
            timeline,
        }
    }

    /// Attach an external change analyzer; its failures and timeouts are
    /// downgraded to report warnings
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: Arc<dyn ChangeAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Replace the executor, e.g. to disable operation kinds
    #[must_use]
    pub fn with_executor(mut self, executor: MutationExecutor) -> Self {
        self.proposals =
            ProposalLifecycle::with_executor(Arc::clone(&self.store), executor.clone());
        self.executor = executor;
        self
    }

    /// Route a change: validate, assess, decide, then commit or propose
    pub async fn route_change(
        &self,
        descriptor: ChangeDescriptor,
    ) -> Result<RouteOutcome, GatewayError> {
        let outcome = validate::validate(&descriptor);
        if !outcome.valid {
            return Err(GatewayError::Validation(outcome.errors));
        }

        let risk = risk::assess(&descriptor.ops);
        let settings = self
            .store
            .governance_settings(descriptor.workspace_id)
            .await
            .map_err(GatewayError::from_execution_store_error)?
            .unwrap_or_default();
        let decision = policy::decide(
            &settings,
            descriptor.entry_point,
            descriptor.blast_radius,
            &risk,
        );
        tracing::info!(
            workspace = %descriptor.workspace_id,
            entry_point = %descriptor.entry_point,
            route = %decision.route,
            scope_impact = %risk.scope_impact,
            reason = %decision.reason,
            "change routed"
        );

        match decision.route {
            Route::Direct => {
                let ctx = ExecutionContext {
                    workspace_id: descriptor.workspace_id,
                    basket_id: descriptor.basket_id,
                    actor_id: descriptor.actor_id.clone(),
                    entry_point: descriptor.entry_point,
                    provenance: descriptor.provenance.clone(),
                };
                let (summary, events) = self.executor.execute(&descriptor.ops, &ctx).await?;
                Ok(RouteOutcome::Committed {
                    summary,
                    events,
                    reason: decision.reason,
                })
            }
            Route::Proposal => {
                let report = self.validator_report(&descriptor, &decision).await;
                let proposal = self
                    .proposals
                    .create(descriptor, decision.effective_blast_radius, report)
                    .await?;
                Ok(RouteOutcome::Proposed {
                    proposal,
                    reason: decision.reason,
                })
            }
        }
    }

    /// Approve a pending proposal, executing its snapshot
    pub async fn approve_proposal(
        &self,
        proposal_id: ProposalId,
        reviewer_id: ActorId,
    ) -> Result<(Proposal, ExecutionSummary, Vec<TimelineEvent>), GatewayError> {
        self.proposals.approve(proposal_id, reviewer_id).await
    }

    /// Reject a pending proposal with a required reason
    pub async fn reject_proposal(
        &self,
        proposal_id: ProposalId,
        reviewer_id: ActorId,
        reason: &str,
    ) -> Result<Proposal, GatewayError> {
        self.proposals.reject(proposal_id, reviewer_id, reason).await
    }

    /// Read one proposal
    pub async fn proposal(&self, proposal_id: ProposalId) -> Result<Proposal, GatewayError> {
        self.store
            .proposal(proposal_id)
            .await
            .map_err(GatewayError::from_execution_store_error)?
            .ok_or_else(|| GatewayError::NotFound(format!("proposal {proposal_id}")))
    }

    /// List proposals in a workspace, optionally filtered by status
    pub async fn list_proposals(
        &self,
        workspace_id: WorkspaceId,
        status: Option<ProposalStatus>,
    ) -> Result<Vec<Proposal>, GatewayError> {
        self.store
            .list_proposals(workspace_id, status)
            .await
            .map_err(GatewayError::from_execution_store_error)
    }

    /// Preview what a deletion would touch, without mutating anything
    pub async fn preview_cascade(
        &self,
        basket_id: BasketId,
        substrate_type: SubstrateType,
        substrate_id: SubstrateId,
    ) -> Result<CascadePreview, GatewayError> {
        self.cascade
            .preview(basket_id, substrate_type, substrate_id)
            .await
    }

    /// Fetch one page of a basket's timeline
    pub async fn timeline(
        &self,
        basket_id: BasketId,
        query: TimelineQuery,
    ) -> Result<TimelinePage, GatewayError> {
        self.timeline.page(basket_id, query).await
    }

    /// Create a basket or dump exactly once per `(kind, request_key)`
    pub async fn create_idempotent(
        &self,
        raw_key: &str,
        payload: CreatePayload,
    ) -> Result<CreateOutcome, GatewayError> {
        self.idempotency.create_idempotent(raw_key, payload).await
    }

    /// Read a workspace's governance settings, falling back to safe defaults
    pub async fn governance_settings(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<GovernanceSettings, GatewayError> {
        Ok(self
            .store
            .governance_settings(workspace_id)
            .await
            .map_err(GatewayError::from_execution_store_error)?
            .unwrap_or_default())
    }

    /// Upsert a workspace's governance settings
    pub async fn put_governance_settings(
        &self,
        workspace_id: WorkspaceId,
        settings: GovernanceSettings,
    ) -> Result<(), GatewayError> {
        self.store
            .put_governance_settings(workspace_id, settings)
            .await
            .map_err(GatewayError::from_execution_store_error)
    }

    /// Consult the analyzer when routing to a proposal. With no analyzer
    /// wired but a validator required, the gap itself becomes a warning.
    async fn validator_report(
        &self,
        descriptor: &ChangeDescriptor,
        decision: &policy::PolicyDecision,
    ) -> Option<ValidatorReport> {
        match &self.analyzer {
            Some(analyzer) => Some(
                analyze_bounded(
                    analyzer.as_ref(),
                    &descriptor.ops,
                    self.config.analyzer_timeout,
                )
                .await,
            ),
            None if decision.require_validator => Some(ValidatorReport::warning_only(
                "validator required but not configured".to_string(),
            )),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalyzerError;
    use async_trait::async_trait;
    use sge_store::MemoryStore;
    use sge_substrate::{EntryPoint, Operation, PolicyRoute};

    fn gateway() -> (DecisionGateway, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let gateway = DecisionGateway::new(Arc::clone(&store) as Arc<dyn SubstrateStore>);
        (gateway, store)
    }

    fn create_block_descriptor(
        workspace: WorkspaceId,
        basket: BasketId,
        entry_point: EntryPoint,
    ) -> ChangeDescriptor {
        ChangeDescriptor::new(entry_point, ActorId::new("user-1"), workspace)
            .with_basket(basket)
            .with_op(Operation::CreateBlock {
                content: "Test goal".into(),
                semantic_type: "goal".into(),
                title: None,
            })
    }

    #[tokio::test]
    async fn invalid_descriptor_never_reaches_policy() {
        let (gateway, store) = gateway();
        let workspace = WorkspaceId::new();
        let basket = BasketId::new();

        let descriptor = ChangeDescriptor::new(
            EntryPoint::ManualEdit,
            ActorId::new("user-1"),
            workspace,
        )
        .with_basket(basket);
        let err = gateway.route_change(descriptor).await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::Validation(vec!["ops must not be empty".to_string()])
        );

        let (events, _) = store.list_events(basket, None, 10, None).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn direct_route_commits_immediately() {
        let (gateway, store) = gateway();
        let workspace = WorkspaceId::new();
        let basket = BasketId::new();
        let settings = GovernanceSettings::default()
            .with_policy(EntryPoint::ManualEdit, PolicyRoute::Direct);
        store
            .put_governance_settings(workspace, settings)
            .await
            .unwrap();

        let outcome = gateway
            .route_change(create_block_descriptor(
                workspace,
                basket,
                EntryPoint::ManualEdit,
            ))
            .await
            .unwrap();
        match outcome {
            RouteOutcome::Committed {
                summary, reason, ..
            } => {
                assert_eq!(summary.operations_executed, 1);
                assert_eq!(reason, "ep_policy_direct:manual_edit");
            }
            other => panic!("expected committed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn proposal_route_queues_without_mutating() {
        let (gateway, store) = gateway();
        let workspace = WorkspaceId::new();
        let basket = BasketId::new();

        // Default manual_edit policy is proposal
        let outcome = gateway
            .route_change(create_block_descriptor(
                workspace,
                basket,
                EntryPoint::ManualEdit,
            ))
            .await
            .unwrap();
        assert!(!outcome.is_committed());
        let proposal_id = outcome.proposal_id().unwrap();

        // No substrate event was written, only the proposed marker
        let (events, _) = store.list_events(basket, None, 10, None).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "change.proposed");

        let proposal = gateway.proposal(proposal_id).await.unwrap();
        assert_eq!(proposal.status, ProposalStatus::Proposed);
    }

    #[tokio::test]
    async fn onboarding_dump_is_direct_even_when_settings_say_proposal() {
        let (gateway, store) = gateway();
        let workspace = WorkspaceId::new();
        let basket = BasketId::new();
        let settings = GovernanceSettings::default()
            .with_policy(EntryPoint::OnboardingDump, PolicyRoute::Proposal);
        store
            .put_governance_settings(workspace, settings)
            .await
            .unwrap();

        let outcome = gateway
            .route_change(create_block_descriptor(
                workspace,
                basket,
                EntryPoint::OnboardingDump,
            ))
            .await
            .unwrap();
        assert!(outcome.is_committed());
    }

    #[tokio::test]
    async fn missing_settings_fall_back_to_proposal() {
        let (gateway, _) = gateway();
        let outcome = gateway
            .route_change(create_block_descriptor(
                WorkspaceId::new(),
                BasketId::new(),
                EntryPoint::ManualEdit,
            ))
            .await
            .unwrap();
        assert!(!outcome.is_committed());
    }

    struct Canned(ValidatorReport);

    #[async_trait]
    impl ChangeAnalyzer for Canned {
        async fn analyze(&self, _ops: &[Operation]) -> Result<ValidatorReport, AnalyzerError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn analyzer_report_lands_on_the_proposal() {
        let store = Arc::new(MemoryStore::new());
        let report = ValidatorReport {
            confidence: 0.9,
            ..ValidatorReport::default()
        };
        let gateway = DecisionGateway::new(Arc::clone(&store) as Arc<dyn SubstrateStore>)
            .with_analyzer(Arc::new(Canned(report)));

        let outcome = gateway
            .route_change(create_block_descriptor(
                WorkspaceId::new(),
                BasketId::new(),
                EntryPoint::ManualEdit,
            ))
            .await
            .unwrap();
        let proposal = gateway.proposal(outcome.proposal_id().unwrap()).await.unwrap();
        assert_eq!(
            proposal.validator_report.as_ref().map(|r| r.confidence),
            Some(0.9)
        );
    }

    #[tokio::test]
    async fn required_validator_without_analyzer_leaves_a_warning() {
        let (gateway, store) = gateway();
        let workspace = WorkspaceId::new();
        let settings = GovernanceSettings::default().with_validator_required(true);
        store
            .put_governance_settings(workspace, settings)
            .await
            .unwrap();

        let outcome = gateway
            .route_change(create_block_descriptor(
                workspace,
                BasketId::new(),
                EntryPoint::ManualEdit,
            ))
            .await
            .unwrap();
        let proposal = gateway.proposal(outcome.proposal_id().unwrap()).await.unwrap();
        let report = proposal.validator_report.unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("not configured"));
    }
}
