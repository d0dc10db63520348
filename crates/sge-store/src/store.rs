//! The storage seam
//!
//! The governance core treats the relational engine as an external
//! collaborator: this trait is the whole contract it relies on —
//! transactional batch commits, a unique constraint for idempotent
//! creation, an optimistic status guard for proposal resolution, and
//! ordered range scans over the timeline.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sge_substrate::{
    ActorId, BasketId, CascadePreview, DocumentId, EventCursor, EventDraft, EventId,
    GovernanceSettings, Proposal, ProposalId, ProposalStatus, RequestKey, ScopeLevel,
    SubstrateId, SubstrateType, TimelineEvent, WorkspaceId,
};

/// Lifecycle state of a block row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockState {
    /// Live and composable
    Active,
    /// Retired from composition
    Archived,
}

impl BlockState {
    /// Stable snake_case name for event metadata
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockState::Active => "active",
            BlockState::Archived => "archived",
        }
    }
}

/// Stored block row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRow {
    pub id: SubstrateId,
    pub basket_id: Option<BasketId>,
    pub content: String,
    pub semantic_type: String,
    pub title: Option<String>,
    pub state: BlockState,
    pub scope: ScopeLevel,
}

/// Stored context item row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItemRow {
    pub id: SubstrateId,
    pub basket_id: Option<BasketId>,
    pub label: String,
    pub content: Option<String>,
    pub item_kind: Option<String>,
    /// Set when folded into a canonical item
    pub merged_into: Option<SubstrateId>,
}

/// Stored basket row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketRow {
    pub id: BasketId,
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Stored dump row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpRow {
    pub id: SubstrateId,
    pub basket_id: BasketId,
    pub body: Option<String>,
    pub redacted: bool,
    pub created_at: DateTime<Utc>,
}

/// Stored document row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRow {
    pub id: DocumentId,
    pub basket_id: BasketId,
    pub content: String,
}

/// Document-to-substrate reference row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRefRow {
    pub document_id: DocumentId,
    pub basket_id: BasketId,
    pub substrate_type: SubstrateType,
    pub substrate_id: SubstrateId,
}

/// Relationship row between two substrate items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRow {
    pub basket_id: BasketId,
    pub from_type: SubstrateType,
    pub from_id: SubstrateId,
    pub to_type: SubstrateType,
    pub to_id: SubstrateId,
    pub kind: String,
}

impl RelationshipRow {
    /// True when either endpoint is the given target
    #[inline]
    #[must_use]
    pub fn touches(&self, substrate_type: SubstrateType, substrate_id: SubstrateId) -> bool {
        (self.from_type == substrate_type && self.from_id == substrate_id)
            || (self.to_type == substrate_type && self.to_id == substrate_id)
    }
}

/// One storage write produced by the mutation executor
#[derive(Debug, Clone, PartialEq)]
pub enum SubstrateWrite {
    /// Insert a block row
    InsertBlock(BlockRow),
    /// Replace a block's content
    UpdateBlockContent {
        id: SubstrateId,
        content: String,
    },
    /// Move a block between lifecycle states
    SetBlockState {
        id: SubstrateId,
        state: BlockState,
    },
    /// Widen a block's visibility scope
    SetBlockScope {
        id: SubstrateId,
        scope: ScopeLevel,
    },
    /// Insert a context item row
    InsertContextItem(ContextItemRow),
    /// Fold items into a canonical item, re-pointing refs and relationships
    MergeContextItems {
        from_ids: Vec<SubstrateId>,
        canonical_id: SubstrateId,
    },
    /// Insert a document reference row
    InsertDocumentRef(DocumentRefRow),
    /// Replace a document body
    UpdateDocument {
        id: DocumentId,
        content: String,
    },
    /// Clear a dump's raw body
    RedactDump {
        id: SubstrateId,
    },
    /// Remove a substrate row, detaching refs and pruning relationships
    DeleteSubstrate {
        substrate_type: SubstrateType,
        substrate_id: SubstrateId,
    },
}

/// Atomic unit of mutation: substrate writes plus the timeline events that
/// describe them, applied together or not at all.
#[derive(Debug, Clone, PartialEq)]
pub struct TxBatch {
    /// Owning workspace, stamped onto every event
    pub workspace_id: WorkspaceId,
    /// Substrate writes, applied in order
    pub writes: Vec<SubstrateWrite>,
    /// Events describing the writes, stamped at commit time
    pub events: Vec<EventDraft>,
}

impl TxBatch {
    /// Empty batch for a workspace
    #[inline]
    #[must_use]
    pub fn new(workspace_id: WorkspaceId) -> Self {
        Self {
            workspace_id,
            writes: Vec::new(),
            events: Vec::new(),
        }
    }
}

/// Kind of entity created through the idempotency guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateKind {
    /// Basket creation
    Basket,
    /// Dump creation
    Dump,
}

impl CreateKind {
    /// Scope component of the `(scope, request_key)` unique constraint
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CreateKind::Basket => "basket",
            CreateKind::Dump => "dump",
        }
    }
}

/// Entity row inserted alongside an idempotency record
#[derive(Debug, Clone, PartialEq)]
pub enum CreatedEntity {
    /// A new basket
    Basket(BasketRow),
    /// A new dump
    Dump(DumpRow),
}

impl CreatedEntity {
    /// Id of the created row in string form
    #[must_use]
    pub fn entity_id(&self) -> String {
        match self {
            CreatedEntity::Basket(row) => row.id.to_string(),
            CreatedEntity::Dump(row) => row.id.to_string(),
        }
    }
}

/// Durable record of a creation request key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    /// Creation kind (the constraint scope)
    pub kind: CreateKind,
    /// Caller-supplied key
    pub request_key: RequestKey,
    /// Canonical payload as submitted, for divergence detection
    pub payload: Value,
    /// Id of the entity the winning request created
    pub entity_id: String,
    /// Insertion time
    pub created_at: DateTime<Utc>,
}

/// How a proposal is being resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalResolution {
    /// Terminal status to move to
    pub status: ProposalStatus,
    /// Resolving reviewer
    pub reviewer: ActorId,
    /// Rejection reason (required for rejections)
    pub reason: Option<String>,
}

/// Storage contract the governance core runs against
///
/// Implementations must provide: atomicity for [`SubstrateStore::commit`]
/// and [`SubstrateStore::resolve_proposal`], a real unique constraint behind
/// [`SubstrateStore::insert_idempotent`], and `(ts desc, id desc)` ordering
/// with storage-assigned stamps for timeline rows.
#[async_trait]
pub trait SubstrateStore: Send + Sync {
    /// Governance settings row for a workspace, if present
    async fn governance_settings(
        &self,
        workspace_id: WorkspaceId,
    ) -> Result<Option<GovernanceSettings>, StoreError>;

    /// Upsert the governance settings row
    async fn put_governance_settings(
        &self,
        workspace_id: WorkspaceId,
        settings: GovernanceSettings,
    ) -> Result<(), StoreError>;

    /// Insert an entity row and its idempotency record in one transaction.
    /// Fails with [`StoreError::UniqueViolation`] when `(kind, request_key)`
    /// is already taken; the caller re-reads and replays.
    async fn insert_idempotent(
        &self,
        record: IdempotencyRecord,
        entity: CreatedEntity,
    ) -> Result<(), StoreError>;

    /// Look up an idempotency record
    async fn find_idempotency(
        &self,
        kind: CreateKind,
        request_key: RequestKey,
    ) -> Result<Option<IdempotencyRecord>, StoreError>;

    /// Insert a fresh proposal row together with `batch` (its announcement
    /// event, typically) in one transaction: a failing batch leaves no
    /// proposal row behind.
    async fn insert_proposal(
        &self,
        proposal: Proposal,
        batch: TxBatch,
    ) -> Result<Vec<TimelineEvent>, StoreError>;

    /// Read one proposal
    async fn proposal(&self, id: ProposalId) -> Result<Option<Proposal>, StoreError>;

    /// List proposals in a workspace, optionally filtered by status
    async fn list_proposals(
        &self,
        workspace_id: WorkspaceId,
        status: Option<ProposalStatus>,
    ) -> Result<Vec<Proposal>, StoreError>;

    /// Resolve a proposal atomically: check the current status is one of
    /// `expected`, apply `batch`, update the row. Fails with
    /// [`StoreError::TransitionConflict`] when the status already moved, and
    /// leaves the status untouched when any write in `batch` fails.
    async fn resolve_proposal(
        &self,
        id: ProposalId,
        expected: &[ProposalStatus],
        resolution: ProposalResolution,
        batch: TxBatch,
    ) -> Result<(Proposal, Vec<TimelineEvent>), StoreError>;

    /// Apply a batch atomically and return the stamped timeline events
    async fn commit(&self, batch: TxBatch) -> Result<Vec<TimelineEvent>, StoreError>;

    /// Ordered scan of a basket's timeline: `(ts desc, id desc)`, rows
    /// strictly after `cursor`, at most `limit` rows. Returns the page and
    /// whether more rows remain beyond it.
    async fn list_events(
        &self,
        basket_id: BasketId,
        cursor: Option<EventCursor>,
        limit: usize,
        kind_filter: Option<&str>,
    ) -> Result<(Vec<TimelineEvent>, bool), StoreError>;

    /// Always fails: timeline rows are immutable
    async fn update_event(&self, id: EventId, metadata: Value) -> Result<(), StoreError>;

    /// Always fails: timeline rows are immutable
    async fn delete_event(&self, id: EventId) -> Result<(), StoreError>;

    /// Fast-path cascade aggregate, when the backend provides one
    async fn cascade_aggregate(
        &self,
        basket_id: BasketId,
        substrate_type: SubstrateType,
        substrate_id: SubstrateId,
    ) -> Result<Option<CascadePreview>, StoreError>;

    /// `(reference rows, distinct documents)` pointing at the target within
    /// the basket
    async fn count_document_refs(
        &self,
        basket_id: BasketId,
        substrate_type: SubstrateType,
        substrate_id: SubstrateId,
    ) -> Result<(u64, u64), StoreError>;

    /// Relationship rows with the target as either endpoint within the basket
    async fn count_relationships(
        &self,
        basket_id: BasketId,
        substrate_type: SubstrateType,
        substrate_id: SubstrateId,
    ) -> Result<u64, StoreError>;

    /// Read one block row
    async fn block(&self, id: SubstrateId) -> Result<Option<BlockRow>, StoreError>;

    /// Read one context item row
    async fn context_item(&self, id: SubstrateId) -> Result<Option<ContextItemRow>, StoreError>;

    /// Read one basket row
    async fn basket(&self, id: BasketId) -> Result<Option<BasketRow>, StoreError>;

    /// Read one dump row
    async fn dump(&self, id: SubstrateId) -> Result<Option<DumpRow>, StoreError>;
}
