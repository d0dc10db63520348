//! In-memory reference implementation of [`SubstrateStore`]
//!
//! A single `RwLock` around the table set is the transactional boundary:
//! `commit` and `resolve_proposal` take the write lock once, run a check
//! phase over the whole batch, and only then apply, so a failing write
//! leaves no partial state behind. Unique-key violations surface exactly
//! like a relational constraint so callers exercise the same retry path
//! they would against a real engine.

use crate::error::StoreError;
use crate::store::{
    BasketRow, BlockRow, ContextItemRow, CreateKind, CreatedEntity, DocumentRefRow, DocumentRow,
    DumpRow, IdempotencyRecord, ProposalResolution, RelationshipRow, SubstrateStore,
    SubstrateWrite, TxBatch,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use sge_substrate::{
    kind_matches, BasketId, CascadePreview, DocumentId, EventCursor, EventDraft, EventId,
    GovernanceSettings, Proposal, ProposalId, ProposalStatus, RequestKey, SubstrateId,
    SubstrateType, TimelineEvent, WorkspaceId,
};
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
struct Inner {
    baskets: BTreeMap<BasketId, BasketRow>,
    blocks: BTreeMap<SubstrateId, BlockRow>,
    context_items: BTreeMap<SubstrateId, ContextItemRow>,
    dumps: BTreeMap<SubstrateId, DumpRow>,
    documents: BTreeMap<DocumentId, DocumentRow>,
    document_refs: Vec<DocumentRefRow>,
    relationships: Vec<RelationshipRow>,
    events: Vec<TimelineEvent>,
    proposals: BTreeMap<ProposalId, Proposal>,
    settings: HashMap<WorkspaceId, GovernanceSettings>,
    idempotency: HashMap<(CreateKind, RequestKey), IdempotencyRecord>,
    event_ids: ulid::Generator,
}

/// In-memory store for tests and single-process embedders
pub struct MemoryStore {
    inner: RwLock<Inner>,
    aggregate_enabled: bool,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            aggregate_enabled: true,
        }
    }

    /// Create a store whose fast-path cascade aggregate reports unavailable,
    /// forcing callers onto the fallback counting path.
    #[must_use]
    pub fn without_cascade_aggregate() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            aggregate_enabled: false,
        }
    }

    /// Seed a document row (documents are composed outside this core)
    pub fn seed_document(&self, row: DocumentRow) {
        self.inner.write().documents.insert(row.id, row);
    }

    /// Seed a relationship row (produced by the extraction pipeline)
    pub fn seed_relationship(&self, row: RelationshipRow) {
        self.inner.write().relationships.push(row);
    }

    /// Seed a basket row directly, bypassing the idempotency guard
    pub fn seed_basket(&self, row: BasketRow) {
        self.inner.write().baskets.insert(row.id, row);
    }

    /// Seed a document reference row
    pub fn seed_document_ref(&self, row: DocumentRefRow) {
        self.inner.write().document_refs.push(row);
    }

    fn check_write(inner: &Inner, write: &SubstrateWrite) -> Result<(), StoreError> {
        match write {
            SubstrateWrite::InsertBlock(row) => {
                if inner.blocks.contains_key(&row.id) {
                    return Err(StoreError::UniqueViolation {
                        constraint: "blocks_pkey".to_string(),
                    });
                }
            }
            SubstrateWrite::UpdateBlockContent { id, .. }
            | SubstrateWrite::SetBlockState { id, .. }
            | SubstrateWrite::SetBlockScope { id, .. } => {
                if !inner.blocks.contains_key(id) {
                    return Err(StoreError::not_found(format!("block {id}")));
                }
            }
            SubstrateWrite::InsertContextItem(row) => {
                if inner.context_items.contains_key(&row.id) {
                    return Err(StoreError::UniqueViolation {
                        constraint: "context_items_pkey".to_string(),
                    });
                }
            }
            SubstrateWrite::MergeContextItems {
                from_ids,
                canonical_id,
            } => {
                if !inner.context_items.contains_key(canonical_id) {
                    return Err(StoreError::not_found(format!(
                        "context item {canonical_id}"
                    )));
                }
                for id in from_ids {
                    if !inner.context_items.contains_key(id) {
                        return Err(StoreError::not_found(format!("context item {id}")));
                    }
                }
            }
            SubstrateWrite::InsertDocumentRef(row) => {
                if !inner.documents.contains_key(&row.document_id) {
                    return Err(StoreError::not_found(format!(
                        "document {}",
                        row.document_id
                    )));
                }
            }
            SubstrateWrite::UpdateDocument { id, .. } => {
                if !inner.documents.contains_key(id) {
                    return Err(StoreError::not_found(format!("document {id}")));
                }
            }
            SubstrateWrite::RedactDump { id } => {
                if !inner.dumps.contains_key(id) {
                    return Err(StoreError::not_found(format!("dump {id}")));
                }
            }
            SubstrateWrite::DeleteSubstrate {
                substrate_type,
                substrate_id,
            } => {
                let exists = match substrate_type {
                    SubstrateType::Block => inner.blocks.contains_key(substrate_id),
                    SubstrateType::Dump => inner.dumps.contains_key(substrate_id),
                    SubstrateType::ContextItem => inner.context_items.contains_key(substrate_id),
                    SubstrateType::TimelineEvent => return Err(StoreError::Immutable),
                };
                if !exists {
                    return Err(StoreError::not_found(format!(
                        "{substrate_type} {substrate_id}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn apply_write(inner: &mut Inner, write: SubstrateWrite) {
        match write {
            SubstrateWrite::InsertBlock(row) => {
                inner.blocks.insert(row.id, row);
            }
            SubstrateWrite::UpdateBlockContent { id, content } => {
                if let Some(block) = inner.blocks.get_mut(&id) {
                    block.content = content;
                }
            }
            SubstrateWrite::SetBlockState { id, state } => {
                if let Some(block) = inner.blocks.get_mut(&id) {
                    block.state = state;
                }
            }
            SubstrateWrite::SetBlockScope { id, scope } => {
                if let Some(block) = inner.blocks.get_mut(&id) {
                    block.scope = scope;
                }
            }
            SubstrateWrite::InsertContextItem(row) => {
                inner.context_items.insert(row.id, row);
            }
            SubstrateWrite::MergeContextItems {
                from_ids,
                canonical_id,
            } => {
                for id in &from_ids {
                    if let Some(item) = inner.context_items.get_mut(id) {
                        item.merged_into = Some(canonical_id);
                    }
                    for doc_ref in inner.document_refs.iter_mut() {
                        if doc_ref.substrate_type == SubstrateType::ContextItem
                            && doc_ref.substrate_id == *id
                        {
                            doc_ref.substrate_id = canonical_id;
                        }
                    }
                    for rel in inner.relationships.iter_mut() {
                        if rel.from_type == SubstrateType::ContextItem && rel.from_id == *id {
                            rel.from_id = canonical_id;
                        }
                        if rel.to_type == SubstrateType::ContextItem && rel.to_id == *id {
                            rel.to_id = canonical_id;
                        }
                    }
                }
            }
            SubstrateWrite::InsertDocumentRef(row) => {
                inner.document_refs.push(row);
            }
            SubstrateWrite::UpdateDocument { id, content } => {
                if let Some(doc) = inner.documents.get_mut(&id) {
                    doc.content = content;
                }
            }
            SubstrateWrite::RedactDump { id } => {
                if let Some(dump) = inner.dumps.get_mut(&id) {
                    dump.body = None;
                    dump.redacted = true;
                }
            }
            SubstrateWrite::DeleteSubstrate {
                substrate_type,
                substrate_id,
            } => {
                match substrate_type {
                    SubstrateType::Block => {
                        inner.blocks.remove(&substrate_id);
                    }
                    SubstrateType::Dump => {
                        inner.dumps.remove(&substrate_id);
                    }
                    SubstrateType::ContextItem => {
                        inner.context_items.remove(&substrate_id);
                    }
                    SubstrateType::TimelineEvent => unreachable!("rejected in check phase"),
                }
                inner.document_refs.retain(|r| {
                    !(r.substrate_type == substrate_type && r.substrate_id == substrate_id)
                });
                inner
                    .relationships
                    .retain(|r| !r.touches(substrate_type, substrate_id));
            }
        }
    }

    /// Check then apply; the caller already holds the write lock.
    fn apply_batch(inner: &mut Inner, batch: TxBatch) -> Result<Vec<TimelineEvent>, StoreError> {
        for write in &batch.writes {
            Self::check_write(inner, write)?;
        }
        let write_count = batch.writes.len();
        for write in batch.writes {
            Self::apply_write(inner, write);
        }
        let events = Self::stamp_events(inner, batch.workspace_id, batch.events);
        tracing::debug!(
            writes = write_count,
            events = events.len(),
            "committed batch"
        );
        Ok(events)
    }

    fn stamp_events(
        inner: &mut Inner,
        workspace_id: WorkspaceId,
        drafts: Vec<EventDraft>,
    ) -> Vec<TimelineEvent> {
        let ts = Utc::now();
        let stamped: Vec<TimelineEvent> = drafts
            .into_iter()
            .map(|draft| TimelineEvent {
                id: EventId(
                    inner
                        .event_ids
                        .generate()
                        .unwrap_or_else(|_| ulid::Ulid::new()),
                ),
                basket_id: draft.basket_id,
                kind: draft.kind,
                entity_id: draft.entity_id,
                workspace_id,
                actor_id: draft.actor_id,
                ts,
                metadata: draft.metadata,
            })
            .collect();
        inner.events.extend(stamped.iter().cloned());
        stamped
    }

    fn preview_counts(
        inner: &Inner,
        basket_id: BasketId,
        substrate_type: SubstrateType,
        substrate_id: SubstrateId,
    ) -> CascadePreview {
        let refs: Vec<&DocumentRefRow> = inner
            .document_refs
            .iter()
            .filter(|r| {
                r.basket_id == basket_id
                    && r.substrate_type == substrate_type
                    && r.substrate_id == substrate_id
            })
            .collect();
        let mut documents: Vec<DocumentId> = refs.iter().map(|r| r.document_id).collect();
        documents.sort();
        documents.dedup();
        let relationships = inner
            .relationships
            .iter()
            .filter(|r| r.basket_id == basket_id && r.touches(substrate_type, substrate_id))
            .count();
        CascadePreview {
            refs_detached_count: refs.len() as u64,
            relationships_pruned_count: relationships as u64,
            affected_documents_count: documents.len() as u64,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubstrateStore for MemoryStore {
    async fn governance_settings(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Option<GovernanceSettings>, StoreError> {
        Ok(self.inner.read().settings.get(&workspace_id).cloned())
    }

    async fn put_governance_settings(
        &self,
        workspace_id: WorkspaceId,
        settings: GovernanceSettings,
    ) -> Result<(), StoreError> {
        self.inner.write().settings.insert(workspace_id, settings);
        Ok(())
    }

    async fn insert_idempotent(
        &self,
        record: IdempotencyRecord,
        entity: CreatedEntity,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let key = (record.kind, record.request_key);
        if inner.idempotency.contains_key(&key) {
            return Err(StoreError::UniqueViolation {
                constraint: "idempotency_scope_key".to_string(),
            });
        }
        match entity {
            CreatedEntity::Basket(row) => {
                inner.baskets.insert(row.id, row);
            }
            CreatedEntity::Dump(row) => {
                inner.dumps.insert(row.id, row);
            }
        }
        inner.idempotency.insert(key, record);
        Ok(())
    }

    async fn find_idempotency(
        &self,
        kind: CreateKind,
        request_key: RequestKey,
    ) -> Result<Option<IdempotencyRecord>, StoreError> {
        Ok(self
            .inner
            .read()
            .idempotency
            .get(&(kind, request_key))
            .cloned())
    }

    async fn insert_proposal(
        &self,
        proposal: Proposal,
        batch: TxBatch,
    ) -> Result<Vec<TimelineEvent>, StoreError> {
        let mut inner = self.inner.write();
        if inner.proposals.contains_key(&proposal.id) {
            return Err(StoreError::UniqueViolation {
                constraint: "change_proposals_pkey".to_string(),
            });
        }
        // Batch first: a failing write must leave no proposal row behind.
        let events = Self::apply_batch(&mut inner, batch)?;
        inner.proposals.insert(proposal.id, proposal);
        Ok(events)
    }

    async fn proposal(&self, id: ProposalId) -> Result<Option<Proposal>, StoreError> {
        Ok(self.inner.read().proposals.get(&id).cloned())
    }

    async fn list_proposals(
        &self,
        workspace_id: WorkspaceId,
        status: Option<ProposalStatus>,
    ) -> Result<Vec<Proposal>, StoreError> {
        Ok(self
            .inner
            .read()
            .proposals
            .values()
            .filter(|p| p.workspace_id == workspace_id)
            .filter(|p| status.map_or(true, |s| p.status == s))
            .cloned()
            .collect())
    }

    async fn resolve_proposal(
        &self,
        id: ProposalId,
        expected: &[ProposalStatus],
        resolution: ProposalResolution,
        batch: TxBatch,
    ) -> Result<(Proposal, Vec<TimelineEvent>), StoreError> {
        let mut inner = self.inner.write();
        let current = inner
            .proposals
            .get(&id)
            .ok_or_else(|| StoreError::not_found(format!("proposal {id}")))?
            .status;
        if !expected.contains(&current) {
            return Err(StoreError::TransitionConflict { current });
        }
        // Writes first: a failing batch must leave the status untouched.
        let events = Self::apply_batch(&mut inner, batch)?;
        let proposal = inner
            .proposals
            .get_mut(&id)
            .expect("checked above while holding the write lock");
        proposal.status = resolution.status;
        proposal.reviewer = Some(resolution.reviewer);
        proposal.review_reason = resolution.reason;
        proposal.reviewed_at = Some(Utc::now());
        Ok((proposal.clone(), events))
    }

    async fn commit(&self, batch: TxBatch) -> Result<Vec<TimelineEvent>, StoreError> {
        let mut inner = self.inner.write();
        Self::apply_batch(&mut inner, batch)
    }

    async fn list_events(
        &self,
        basket_id: BasketId,
        cursor: Option<EventCursor>,
        limit: usize,
        kind_filter: Option<&str>,
    ) -> Result<(Vec<TimelineEvent>, bool), StoreError> {
        let inner = self.inner.read();
        let mut matching: Vec<TimelineEvent> = inner
            .events
            .iter()
            .filter(|e| e.basket_id == Some(basket_id))
            .filter(|e| kind_filter.map_or(true, |f| kind_matches(&e.kind, f)))
            .filter(|e| cursor.as_ref().map_or(true, |c| c.is_before(e)))
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.ts, b.id).cmp(&(a.ts, a.id)));
        let has_more = matching.len() > limit;
        matching.truncate(limit);
        Ok((matching, has_more))
    }

    async fn update_event(&self, _id: EventId, _metadata: Value) -> Result<(), StoreError> {
        Err(StoreError::Immutable)
    }

    async fn delete_event(&self, _id: EventId) -> Result<(), StoreError> {
        Err(StoreError::Immutable)
    }

    async fn cascade_aggregate(
        &self,
        basket_id: BasketId,
        substrate_type: SubstrateType,
        substrate_id: SubstrateId,
    ) -> Result<Option<CascadePreview>, StoreError> {
        if !self.aggregate_enabled {
            return Ok(None);
        }
        let inner = self.inner.read();
        Ok(Some(Self::preview_counts(
            &inner,
            basket_id,
            substrate_type,
            substrate_id,
        )))
    }

    async fn count_document_refs(
        &self,
        basket_id: BasketId,
        substrate_type: SubstrateType,
        substrate_id: SubstrateId,
    ) -> Result<(u64, u64), StoreError> {
        let inner = self.inner.read();
        let preview = Self::preview_counts(&inner, basket_id, substrate_type, substrate_id);
        Ok((preview.refs_detached_count, preview.affected_documents_count))
    }

    async fn count_relationships(
        &self,
        basket_id: BasketId,
        substrate_type: SubstrateType,
        substrate_id: SubstrateId,
    ) -> Result<u64, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .relationships
            .iter()
            .filter(|r| r.basket_id == basket_id && r.touches(substrate_type, substrate_id))
            .count() as u64)
    }

    async fn block(&self, id: SubstrateId) -> Result<Option<BlockRow>, StoreError> {
        Ok(self.inner.read().blocks.get(&id).cloned())
    }

    async fn context_item(&self, id: SubstrateId) -> Result<Option<ContextItemRow>, StoreError> {
        Ok(self.inner.read().context_items.get(&id).cloned())
    }

    async fn basket(&self, id: BasketId) -> Result<Option<BasketRow>, StoreError> {
        Ok(self.inner.read().baskets.get(&id).cloned())
    }

    async fn dump(&self, id: SubstrateId) -> Result<Option<DumpRow>, StoreError> {
        Ok(self.inner.read().dumps.get(&id).cloned())
    }
}
