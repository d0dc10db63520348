//! End-to-end flows through the decision gateway over the in-memory store.

use pretty_assertions::assert_eq;
use sge_gateway::timeline::TimelineQuery;
use sge_gateway::{GatewayError, RouteOutcome};
use sge_store::SubstrateStore;
use sge_substrate::timeline::kind as event_kind;
use sge_substrate::{
    ActorId, BasketId, EntryPoint, GovernanceSettings, PolicyRoute, ProposalStatus, RequestKey,
    SubstrateId, WorkspaceId,
};
use sge_test_utils::{create_block_op, descriptor, setup_gateway};

#[tokio::test]
async fn direct_manual_edit_commits_and_lands_on_the_timeline() {
    let (gateway, store) = setup_gateway();
    let workspace = WorkspaceId::new();
    let basket = BasketId::new();
    let settings =
        GovernanceSettings::default().with_policy(EntryPoint::ManualEdit, PolicyRoute::Direct);
    store
        .put_governance_settings(workspace, settings)
        .await
        .unwrap();

    let outcome = gateway
        .route_change(descriptor(
            EntryPoint::ManualEdit,
            workspace,
            basket,
            vec![create_block_op()],
        ))
        .await
        .unwrap();

    let (summary, events) = match outcome {
        RouteOutcome::Committed {
            summary, events, ..
        } => (summary, events),
        other => panic!("expected committed, got {other:?}"),
    };
    assert_eq!(summary.operations_executed, 1);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, event_kind::BLOCK_CREATED);
    assert_eq!(events[1].kind, event_kind::CHANGE_COMMITTED);

    // The same events are readable back through the timeline, newest first
    let page = gateway
        .timeline(basket, TimelineQuery::new())
        .await
        .unwrap();
    assert_eq!(page.events.len(), 2);
    assert!(!page.has_more);
    assert_eq!(page.events[1].kind, event_kind::BLOCK_CREATED);

    let block_id = SubstrateId(events[0].entity_id.parse().unwrap());
    assert!(store.block(block_id).await.unwrap().is_some());
}

#[tokio::test]
async fn proposal_flow_queues_then_approval_executes() {
    let (gateway, store) = setup_gateway();
    let workspace = WorkspaceId::new();
    let basket = BasketId::new();

    // Default manual_edit policy routes to review
    let outcome = gateway
        .route_change(descriptor(
            EntryPoint::ManualEdit,
            workspace,
            basket,
            vec![create_block_op()],
        ))
        .await
        .unwrap();
    let proposal_id = outcome.proposal_id().expect("should be proposed");

    // Nothing mutated yet; only the change.proposed marker exists
    let page = gateway
        .timeline(basket, TimelineQuery::new())
        .await
        .unwrap();
    assert_eq!(page.events.len(), 1);
    assert_eq!(page.events[0].kind, event_kind::CHANGE_PROPOSED);

    let (resolved, summary, events) = gateway
        .approve_proposal(proposal_id, ActorId::new("reviewer-1"))
        .await
        .unwrap();
    assert_eq!(resolved.status, ProposalStatus::Accepted);
    assert_eq!(summary.operations_executed, 1);

    let created = events
        .iter()
        .find(|e| e.kind == event_kind::BLOCK_CREATED)
        .expect("block.created emitted on approval");
    let block_id = SubstrateId(created.entity_id.parse().unwrap());
    assert!(store.block(block_id).await.unwrap().is_some());
    assert!(events
        .iter()
        .any(|e| e.kind == event_kind::PROPOSAL_APPROVED));
}

#[tokio::test]
async fn resolved_proposals_are_terminal_through_the_gateway() {
    let (gateway, _) = setup_gateway();
    let workspace = WorkspaceId::new();
    let basket = BasketId::new();

    let outcome = gateway
        .route_change(descriptor(
            EntryPoint::ManualEdit,
            workspace,
            basket,
            vec![create_block_op()],
        ))
        .await
        .unwrap();
    let proposal_id = outcome.proposal_id().unwrap();

    gateway
        .approve_proposal(proposal_id, ActorId::new("reviewer-1"))
        .await
        .unwrap();

    let err = gateway
        .reject_proposal(proposal_id, ActorId::new("reviewer-2"), "too late")
        .await
        .unwrap_err();
    match err {
        GatewayError::Transition { current, .. } => {
            assert_eq!(current, ProposalStatus::Accepted);
        }
        other => panic!("expected transition error, got {other:?}"),
    }
}

#[tokio::test]
async fn rejection_records_reviewer_and_reason() {
    let (gateway, _) = setup_gateway();
    let workspace = WorkspaceId::new();

    let outcome = gateway
        .route_change(descriptor(
            EntryPoint::ManualEdit,
            workspace,
            BasketId::new(),
            vec![create_block_op()],
        ))
        .await
        .unwrap();
    let proposal_id = outcome.proposal_id().unwrap();

    let rejected = gateway
        .reject_proposal(proposal_id, ActorId::new("reviewer-1"), "duplicate of B-12")
        .await
        .unwrap();
    assert_eq!(rejected.status, ProposalStatus::Rejected);
    assert_eq!(rejected.reviewer, Some(ActorId::new("reviewer-1")));
    assert_eq!(rejected.review_reason.as_deref(), Some("duplicate of B-12"));
    assert!(rejected.reviewed_at.is_some());
}

#[tokio::test]
async fn list_proposals_filters_by_status() {
    let (gateway, _) = setup_gateway();
    let workspace = WorkspaceId::new();

    for _ in 0..2 {
        gateway
            .route_change(descriptor(
                EntryPoint::ManualEdit,
                workspace,
                BasketId::new(),
                vec![create_block_op()],
            ))
            .await
            .unwrap();
    }
    let pending = gateway
        .list_proposals(workspace, Some(ProposalStatus::Proposed))
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);

    gateway
        .reject_proposal(pending[0].id, ActorId::new("reviewer-1"), "not needed")
        .await
        .unwrap();
    let pending = gateway
        .list_proposals(workspace, Some(ProposalStatus::Proposed))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    let all = gateway.list_proposals(workspace, None).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn idempotent_create_rejects_bad_keys_and_replays_good_ones() {
    let (gateway, _) = setup_gateway();
    let workspace = WorkspaceId::new();
    let payload = sge_gateway::CreatePayload::Basket {
        workspace_id: workspace,
        name: "research".to_string(),
    };

    let err = gateway
        .create_idempotent("not-a-uuid", payload.clone())
        .await
        .unwrap_err();
    assert_eq!(err, GatewayError::InvalidKey("not-a-uuid".to_string()));

    let key = RequestKey::new().to_string();
    let first = gateway.create_idempotent(&key, payload.clone()).await.unwrap();
    assert!(!first.replayed);
    let second = gateway.create_idempotent(&key, payload).await.unwrap();
    assert!(second.replayed);
    assert_eq!(first.entity_id, second.entity_id);
}

#[tokio::test]
async fn onboarding_flow_creates_basket_then_commits_directly() {
    let (gateway, _) = setup_gateway();
    let workspace = WorkspaceId::new();

    let basket = gateway
        .create_idempotent(
            &RequestKey::new().to_string(),
            sge_gateway::CreatePayload::Basket {
                workspace_id: workspace,
                name: "onboarding".to_string(),
            },
        )
        .await
        .unwrap();
    let basket_id = BasketId(basket.entity_id.parse().unwrap());

    let dump = gateway
        .create_idempotent(
            &RequestKey::new().to_string(),
            sge_gateway::CreatePayload::Dump {
                basket_id,
                body: "meeting notes, raw".to_string(),
            },
        )
        .await
        .unwrap();
    assert!(!dump.replayed);

    // Onboarding bypasses the review queue regardless of stored policy
    let outcome = gateway
        .route_change(descriptor(
            EntryPoint::OnboardingDump,
            workspace,
            basket_id,
            vec![create_block_op()],
        ))
        .await
        .unwrap();
    assert!(outcome.is_committed());
}

#[tokio::test]
async fn governance_settings_round_trip_with_safe_fallback() {
    let (gateway, _) = setup_gateway();
    let workspace = WorkspaceId::new();

    // Missing row falls back to defaults
    let settings = gateway.governance_settings(workspace).await.unwrap();
    assert!(settings.governance_enabled);

    let custom = GovernanceSettings::default().with_validator_required(true);
    gateway
        .put_governance_settings(workspace, custom.clone())
        .await
        .unwrap();
    let read_back = gateway.governance_settings(workspace).await.unwrap();
    assert_eq!(read_back, custom);
}
