//! Mutation executor
//!
//! Maps a validated, authorized operation list onto storage writes plus the
//! timeline events describing them, and applies the whole list in one
//! transactional batch. A kind check runs over the entire batch before any
//! write is attempted; deletion-class operations get a cascade pre-check
//! whose counts land in the event metadata.

use crate::cascade::CascadeAnalyzer;
use crate::error::GatewayError;
use sge_store::{
    BlockRow, BlockState, ContextItemRow, DocumentRefRow, SubstrateStore, SubstrateWrite, TxBatch,
};
use sge_substrate::timeline::kind as event_kind;
use sge_substrate::{
    ActorId, BasketId, EntryPoint, EventDraft, Operation, OperationKind, ProvenanceRef,
    ScopeLevel, SubstrateId, SubstrateType, TimelineEvent, WorkspaceId,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Request-scoped execution context
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Owning workspace
    pub workspace_id: WorkspaceId,
    /// Basket scope, if basket-scoped
    pub basket_id: Option<BasketId>,
    /// Acting user or agent
    pub actor_id: ActorId,
    /// Logical origin, recorded on the summary event
    pub entry_point: EntryPoint,
    /// Causal origin tags, copied into every event
    pub provenance: Vec<ProvenanceRef>,
}

/// Result of one committed batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Operations applied (all of them, or the call failed)
    pub operations_executed: usize,
}

/// Applies operation batches transactionally
#[derive(Clone)]
pub struct MutationExecutor {
    store: Arc<dyn SubstrateStore>,
    cascade: CascadeAnalyzer,
    disabled_kinds: BTreeSet<OperationKind>,
}

impl MutationExecutor {
    /// Create an executor over a store
    #[must_use]
    pub fn new(store: Arc<dyn SubstrateStore>) -> Self {
        let cascade = CascadeAnalyzer::new(Arc::clone(&store));
        Self {
            store,
            cascade,
            disabled_kinds: BTreeSet::new(),
        }
    }

    /// Disable an operation kind for this deployment; batches containing it
    /// fail the pre-flight check before any write.
    #[must_use]
    pub fn with_disabled_kind(mut self, kind: OperationKind) -> Self {
        self.disabled_kinds.insert(kind);
        self
    }

    /// Execute all operations in one transactional batch and append one
    /// summary event describing the commit.
    pub async fn execute(
        &self,
        ops: &[Operation],
        ctx: &ExecutionContext,
    ) -> Result<(ExecutionSummary, Vec<TimelineEvent>), GatewayError> {
        let mut batch = self.plan(ops, ctx).await?;
        batch.events.push(self.summary_event(ops.len(), ctx));

        let events = self
            .store
            .commit(batch)
            .await
            .map_err(GatewayError::from_execution_store_error)?;

        tracing::info!(
            workspace = %ctx.workspace_id,
            operations = ops.len(),
            "batch committed"
        );
        Ok((
            ExecutionSummary {
                operations_executed: ops.len(),
            },
            events,
        ))
    }

    /// Build the write/event batch for an operation list without committing
    /// it. Used directly by the proposal lifecycle, which commits the batch
    /// together with the status transition.
    pub async fn plan(
        &self,
        ops: &[Operation],
        ctx: &ExecutionContext,
    ) -> Result<TxBatch, GatewayError> {
        // Pre-flight over the whole batch: no write happens if any kind is
        // outside this executor's dispatch set.
        for op in ops {
            if self.disabled_kinds.contains(&op.kind()) {
                return Err(GatewayError::UnsupportedOperation(op.kind().to_string()));
            }
        }

        let mut batch = TxBatch::new(ctx.workspace_id);
        for op in ops {
            self.plan_op(op, ctx, &mut batch).await?;
        }
        Ok(batch)
    }

    /// Summary event for a committed batch
    #[must_use]
    pub fn summary_event(&self, operations_executed: usize, ctx: &ExecutionContext) -> EventDraft {
        self.event(
            event_kind::CHANGE_COMMITTED,
            ctx.workspace_id.to_string(),
            ctx,
            json!({
                "operations_executed": operations_executed,
                "entry_point": ctx.entry_point.as_str(),
            }),
        )
    }

    async fn plan_op(
        &self,
        op: &Operation,
        ctx: &ExecutionContext,
        batch: &mut TxBatch,
    ) -> Result<(), GatewayError> {
        match op {
            Operation::CreateBlock {
                content,
                semantic_type,
                title,
            } => {
                let row = BlockRow {
                    id: SubstrateId::new(),
                    basket_id: ctx.basket_id,
                    content: content.clone(),
                    semantic_type: semantic_type.clone(),
                    title: title.clone(),
                    state: BlockState::Active,
                    scope: ScopeLevel::Basket,
                };
                let event = self.event(
                    event_kind::BLOCK_CREATED,
                    row.id.to_string(),
                    ctx,
                    json!({
                        "semantic_type": semantic_type,
                        "to_state": BlockState::Active.as_str(),
                    }),
                );
                batch.writes.push(SubstrateWrite::InsertBlock(row));
                batch.events.push(event);
            }
            Operation::CreateContextItem {
                label,
                content,
                item_kind,
            } => {
                let row = ContextItemRow {
                    id: SubstrateId::new(),
                    basket_id: ctx.basket_id,
                    label: label.clone(),
                    content: content.clone(),
                    item_kind: item_kind.clone(),
                    merged_into: None,
                };
                let event = self.event(
                    event_kind::CONTEXT_ITEM_CREATED,
                    row.id.to_string(),
                    ctx,
                    json!({ "label": label }),
                );
                batch.writes.push(SubstrateWrite::InsertContextItem(row));
                batch.events.push(event);
            }
            Operation::ReviseBlock { block_id, content } => {
                let current = self.require_block(*block_id).await?;
                batch.writes.push(SubstrateWrite::UpdateBlockContent {
                    id: *block_id,
                    content: content.clone(),
                });
                batch.events.push(self.event(
                    event_kind::BLOCK_REVISED,
                    block_id.to_string(),
                    ctx,
                    json!({
                        "from_state": current.state.as_str(),
                        "to_state": current.state.as_str(),
                    }),
                ));
            }
            Operation::ArchiveBlock { block_id } => {
                let current = self.require_block(*block_id).await?;
                batch.writes.push(SubstrateWrite::SetBlockState {
                    id: *block_id,
                    state: BlockState::Archived,
                });
                batch.events.push(self.event(
                    event_kind::BLOCK_STATE_CHANGED,
                    block_id.to_string(),
                    ctx,
                    json!({
                        "from_state": current.state.as_str(),
                        "to_state": BlockState::Archived.as_str(),
                    }),
                ));
            }
            Operation::MergeContextItems {
                from_ids,
                canonical_id,
            } => {
                batch.writes.push(SubstrateWrite::MergeContextItems {
                    from_ids: from_ids.clone(),
                    canonical_id: *canonical_id,
                });
                let merged: Vec<String> = from_ids.iter().map(SubstrateId::to_string).collect();
                batch.events.push(self.event(
                    event_kind::CONTEXT_ITEM_MERGED,
                    canonical_id.to_string(),
                    ctx,
                    json!({ "merged_from": merged }),
                ));
            }
            Operation::AttachContextItem {
                context_item_id,
                document_id,
            } => {
                let basket_id = ctx.basket_id.ok_or_else(|| {
                    GatewayError::execution("attach_context_item requires a basket scope")
                })?;
                batch
                    .writes
                    .push(SubstrateWrite::InsertDocumentRef(DocumentRefRow {
                        document_id: *document_id,
                        basket_id,
                        substrate_type: SubstrateType::ContextItem,
                        substrate_id: *context_item_id,
                    }));
                batch.events.push(self.event(
                    event_kind::CONTEXT_ITEM_ATTACHED,
                    context_item_id.to_string(),
                    ctx,
                    json!({ "document_id": document_id.to_string() }),
                ));
            }
            Operation::PromoteScope { block_id, to_scope } => {
                let current = self.require_block(*block_id).await?;
                batch.writes.push(SubstrateWrite::SetBlockScope {
                    id: *block_id,
                    scope: *to_scope,
                });
                batch.events.push(self.event(
                    event_kind::BLOCK_PROMOTED,
                    block_id.to_string(),
                    ctx,
                    json!({
                        "from_scope": scope_name(current.scope),
                        "to_scope": scope_name(*to_scope),
                    }),
                ));
            }
            Operation::DocumentEdit {
                document_id,
                content,
            } => {
                batch.writes.push(SubstrateWrite::UpdateDocument {
                    id: *document_id,
                    content: content.clone(),
                });
                batch.events.push(self.event(
                    event_kind::DOCUMENT_UPDATED,
                    document_id.to_string(),
                    ctx,
                    Value::Null,
                ));
            }
            Operation::RedactDump { dump_id, reason } => {
                batch
                    .writes
                    .push(SubstrateWrite::RedactDump { id: *dump_id });
                batch.events.push(self.event(
                    event_kind::DUMP_REDACTED,
                    dump_id.to_string(),
                    ctx,
                    json!({ "reason": reason }),
                ));
            }
            Operation::Delete {
                substrate_type,
                substrate_id,
            } => {
                // Cascade pre-check: counts travel with the event.
                let cascade = match ctx.basket_id {
                    Some(basket_id) => Some(
                        self.cascade
                            .preview(basket_id, *substrate_type, *substrate_id)
                            .await?,
                    ),
                    None => None,
                };
                batch.writes.push(SubstrateWrite::DeleteSubstrate {
                    substrate_type: *substrate_type,
                    substrate_id: *substrate_id,
                });
                batch.events.push(self.event(
                    event_kind::SUBSTRATE_DELETED,
                    substrate_id.to_string(),
                    ctx,
                    json!({
                        "substrate_type": substrate_type.as_str(),
                        "cascade": cascade,
                    }),
                ));
            }
        }
        Ok(())
    }

    async fn require_block(&self, id: SubstrateId) -> Result<BlockRow, GatewayError> {
        self.store
            .block(id)
            .await
            .map_err(GatewayError::from_execution_store_error)?
            .ok_or_else(|| GatewayError::execution(format!("block {id} does not exist")))
    }

    fn event(
        &self,
        kind: &str,
        entity_id: String,
        ctx: &ExecutionContext,
        metadata: Value,
    ) -> EventDraft {
        let metadata = with_provenance(metadata, &ctx.provenance);
        EventDraft::new(kind, entity_id, ctx.actor_id.clone())
            .with_basket(ctx.basket_id)
            .with_metadata(metadata)
    }
}

fn scope_name(scope: ScopeLevel) -> &'static str {
    match scope {
        ScopeLevel::Basket => "basket",
        ScopeLevel::Workspace => "workspace",
    }
}

/// Merge provenance tags into event metadata; shared with the proposal
/// lifecycle so review events carry the same tags as substrate events.
pub(crate) fn with_provenance(metadata: Value, provenance: &[ProvenanceRef]) -> Value {
    if provenance.is_empty() {
        return metadata;
    }
    let tags = serde_json::to_value(provenance).unwrap_or(Value::Null);
    match metadata {
        Value::Object(mut map) => {
            map.insert("provenance".to_string(), tags);
            Value::Object(map)
        }
        Value::Null => {
            let mut map = Map::new();
            map.insert("provenance".to_string(), tags);
            Value::Object(map)
        }
        other => json!({ "value": other, "provenance": tags }),
    }
}
