//! Property tests for risk classification, cascade strategy agreement, and
//! timeline pagination.

use proptest::prelude::*;
use sge_gateway::timeline::TimelineQuery;
use sge_gateway::{risk, CascadeAnalyzer, GatewayConfig, ScopeImpact, TimelineService};
use sge_store::{
    DocumentRefRow, DocumentRow, MemoryStore, RelationshipRow, SubstrateStore, TxBatch,
};
use sge_substrate::{
    ActorId, BasketId, DocumentId, EventDraft, Operation, ScopeLevel, SubstrateId, SubstrateType,
    WorkspaceId,
};
use std::sync::Arc;

fn op_from_index(index: usize) -> Operation {
    match index % 6 {
        0 => Operation::CreateBlock {
            content: "c".into(),
            semantic_type: "goal".into(),
            title: None,
        },
        1 => Operation::CreateContextItem {
            label: "topic".into(),
            content: None,
            item_kind: None,
        },
        2 => Operation::ArchiveBlock {
            block_id: SubstrateId::new(),
        },
        3 => Operation::AttachContextItem {
            context_item_id: SubstrateId::new(),
            document_id: DocumentId::new(),
        },
        4 => Operation::Delete {
            substrate_type: SubstrateType::Block,
            substrate_id: SubstrateId::new(),
        },
        _ => Operation::ReviseBlock {
            block_id: SubstrateId::new(),
            content: "r".into(),
        },
    }
}

proptest! {
    #[test]
    fn prop_adding_a_scope_promotion_never_lowers_risk(
        indices in proptest::collection::vec(0..6usize, 1..12)
    ) {
        let ops: Vec<Operation> = indices.iter().copied().map(op_from_index).collect();
        let base = risk::assess(&ops);

        let mut widened = ops;
        widened.push(Operation::PromoteScope {
            block_id: SubstrateId::new(),
            to_scope: ScopeLevel::Workspace,
        });
        let escalated = risk::assess(&widened);

        prop_assert!(escalated.scope_impact >= base.scope_impact);
        prop_assert_eq!(escalated.scope_impact, ScopeImpact::High);
    }

    #[test]
    fn prop_risk_is_order_independent(
        indices in proptest::collection::vec(0..6usize, 1..12)
    ) {
        let ops: Vec<Operation> = indices.iter().copied().map(op_from_index).collect();
        let mut reversed = ops.clone();
        reversed.reverse();

        let forward = risk::assess(&ops);
        let backward = risk::assess(&reversed);
        prop_assert_eq!(forward.scope_impact, backward.scope_impact);
        prop_assert_eq!(forward.operation_types, backward.operation_types);
    }

    #[test]
    fn prop_cascade_strategies_agree(
        ref_count in 0..8usize,
        rel_count in 0..8usize,
        doc_count in 1..4usize,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let basket = BasketId::new();
            let target = SubstrateId::new();
            let docs: Vec<DocumentId> = (0..doc_count).map(|_| DocumentId::new()).collect();

            let with_aggregate = Arc::new(MemoryStore::new());
            let without_aggregate = Arc::new(MemoryStore::without_cascade_aggregate());
            for store in [&with_aggregate, &without_aggregate] {
                for doc in &docs {
                    store.seed_document(DocumentRow {
                        id: *doc,
                        basket_id: basket,
                        content: String::new(),
                    });
                }
                for i in 0..ref_count {
                    store.seed_document_ref(DocumentRefRow {
                        document_id: docs[i % docs.len()],
                        basket_id: basket,
                        substrate_type: SubstrateType::ContextItem,
                        substrate_id: target,
                    });
                }
                for _ in 0..rel_count {
                    store.seed_relationship(RelationshipRow {
                        basket_id: basket,
                        from_type: SubstrateType::Block,
                        from_id: SubstrateId::new(),
                        to_type: SubstrateType::ContextItem,
                        to_id: target,
                        kind: "mentions".to_string(),
                    });
                }
            }

            let fast = CascadeAnalyzer::new(with_aggregate)
                .preview(basket, SubstrateType::ContextItem, target)
                .await
                .unwrap();
            let fallback = CascadeAnalyzer::new(without_aggregate)
                .preview(basket, SubstrateType::ContextItem, target)
                .await
                .unwrap();
            prop_assert_eq!(fast, fallback);
            Ok(())
        })?;
    }

    #[test]
    fn prop_pagination_walk_is_complete_and_duplicate_free(
        event_count in 0..25usize,
        page_size in 1..8usize,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let store = Arc::new(MemoryStore::new());
            let basket = BasketId::new();
            let workspace = WorkspaceId::new();
            for i in 0..event_count {
                let mut batch = TxBatch::new(workspace);
                batch.events.push(
                    EventDraft::new("block.created", format!("block-{i}"), ActorId::new("u"))
                        .with_basket(Some(basket)),
                );
                store.commit(batch).await.unwrap();
            }

            let service = TimelineService::new(
                Arc::clone(&store) as Arc<dyn SubstrateStore>,
                GatewayConfig::new(),
            );
            let mut seen = Vec::new();
            let mut query = TimelineQuery::new().with_limit(page_size);
            loop {
                let page = service.page(basket, query).await.unwrap();
                prop_assert!(page.events.len() <= page_size);
                seen.extend(page.events.iter().map(|e| e.id));
                match page.next_cursor {
                    Some(cursor) => {
                        query = TimelineQuery::new().with_limit(page_size).with_cursor(cursor);
                    }
                    None => break,
                }
            }

            prop_assert_eq!(seen.len(), event_count);
            prop_assert!(seen.windows(2).all(|w| w[0] > w[1]), "strictly descending");
            Ok(())
        })?;
    }
}
