//! Testing utilities for SGE workspace
//!
//! Shared fixtures: in-memory gateways, descriptor builders, and canned
//! analyzers.

#![allow(missing_docs)]

use async_trait::async_trait;
use sge_gateway::{AnalyzerError, ChangeAnalyzer, DecisionGateway, GatewayConfig};
use sge_store::{MemoryStore, SubstrateStore};
use sge_substrate::{
    ActorId, BasketId, ChangeDescriptor, EntryPoint, Operation, ScopeLevel, SubstrateId,
    SubstrateType, ValidatorReport, WorkspaceId,
};
use std::sync::Arc;

/// Gateway over a fresh in-memory store, plus the store for direct seeding
pub fn setup_gateway() -> (DecisionGateway, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let gateway = DecisionGateway::new(Arc::clone(&store) as Arc<dyn SubstrateStore>);
    (gateway, store)
}

pub fn setup_gateway_with_config(config: GatewayConfig) -> (DecisionGateway, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let gateway =
        DecisionGateway::with_config(Arc::clone(&store) as Arc<dyn SubstrateStore>, config);
    (gateway, store)
}

pub fn test_actor() -> ActorId {
    ActorId::new("test-user")
}

pub fn descriptor(
    entry_point: EntryPoint,
    workspace: WorkspaceId,
    basket: BasketId,
    ops: Vec<Operation>,
) -> ChangeDescriptor {
    ChangeDescriptor::new(entry_point, test_actor(), workspace)
        .with_basket(basket)
        .with_ops(ops)
}

pub fn create_block_op() -> Operation {
    Operation::CreateBlock {
        content: "Ship the migration by Friday".to_string(),
        semantic_type: "goal".to_string(),
        title: None,
    }
}

pub fn create_context_item_op(label: &str) -> Operation {
    Operation::CreateContextItem {
        label: label.to_string(),
        content: None,
        item_kind: None,
    }
}

pub fn promote_op(block_id: SubstrateId) -> Operation {
    Operation::PromoteScope {
        block_id,
        to_scope: ScopeLevel::Workspace,
    }
}

pub fn delete_op(substrate_id: SubstrateId) -> Operation {
    Operation::Delete {
        substrate_type: SubstrateType::Block,
        substrate_id,
    }
}

/// Analyzer that always returns the same report
pub struct StaticAnalyzer(pub ValidatorReport);

#[async_trait]
impl ChangeAnalyzer for StaticAnalyzer {
    async fn analyze(&self, _ops: &[Operation]) -> Result<ValidatorReport, AnalyzerError> {
        Ok(self.0.clone())
    }
}

/// Analyzer that always fails
pub struct FailingAnalyzer;

#[async_trait]
impl ChangeAnalyzer for FailingAnalyzer {
    async fn analyze(&self, _ops: &[Operation]) -> Result<ValidatorReport, AnalyzerError> {
        Err(AnalyzerError("analyzer offline".to_string()))
    }
}
