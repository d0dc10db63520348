//! Change descriptors and the closed operation union
//!
//! A `ChangeDescriptor` is the transient, request-scoped unit of intended
//! change flowing into the decision gateway. Operations are a closed tagged
//! union: every kind carries typed payload fields instead of an open map,
//! so required-field contracts are visible at the type level and the
//! validator only has to check for emptiness.

use crate::ids::{ActorId, BasketId, DocumentId, SubstrateId, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Logical origin of a change request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPoint {
    /// Direct user edit in the workspace UI
    ManualEdit,
    /// First-dump onboarding flow
    OnboardingDump,
    /// Graph-level action (merge, attach, prune)
    GraphAction,
    /// Edit initiated from a composed document
    DocumentEdit,
    /// Restore initiated from the timeline
    TimelineRestore,
}

impl EntryPoint {
    /// Stable snake_case name used in policy reason strings
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::ManualEdit => "manual_edit",
            EntryPoint::OnboardingDump => "onboarding_dump",
            EntryPoint::GraphAction => "graph_action",
            EntryPoint::DocumentEdit => "document_edit",
            EntryPoint::TimelineRestore => "timeline_restore",
        }
    }
}

impl std::fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared scope of impact of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlastRadius {
    /// Confined to a single substrate item
    Local,
    /// Confined to one basket
    Scoped,
    /// Workspace-wide
    Global,
}

impl BlastRadius {
    /// Stable snake_case name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            BlastRadius::Local => "local",
            BlastRadius::Scoped => "scoped",
            BlastRadius::Global => "global",
        }
    }
}

impl std::fmt::Display for BlastRadius {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composable knowledge primitive families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstrateType {
    /// Structured knowledge block
    Block,
    /// Raw input unit
    Dump,
    /// Derived context item
    ContextItem,
    /// Timeline event (referenceable but immutable)
    TimelineEvent,
}

impl SubstrateType {
    /// Stable snake_case name, also the event-kind namespace
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SubstrateType::Block => "block",
            SubstrateType::Dump => "dump",
            SubstrateType::ContextItem => "context_item",
            SubstrateType::TimelineEvent => "timeline_event",
        }
    }
}

impl std::fmt::Display for SubstrateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope a block can be promoted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeLevel {
    /// Visible within its basket only
    Basket,
    /// Visible across the workspace
    Workspace,
}

/// Causal origin tag carried on a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRef {
    /// Kind of originating entity
    pub kind: ProvenanceKind,
    /// Identifier of the originating entity
    pub id: String,
}

impl ProvenanceRef {
    /// Create a provenance tag
    #[inline]
    #[must_use]
    pub fn new(kind: ProvenanceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

/// Kinds of causal origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceKind {
    /// A source dump
    Dump,
    /// An acting agent
    Agent,
    /// A human actor
    Actor,
    /// A document the change originated from
    Document,
}

/// One intended mutation of substrate state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// Create a structured block
    CreateBlock {
        /// Block body (required)
        content: String,
        /// Semantic classification, e.g. "goal" (required)
        semantic_type: String,
        /// Optional display title
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    /// Create a context item
    CreateContextItem {
        /// Item label (required)
        label: String,
        /// Optional body
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        /// Optional sub-kind, e.g. "entity", "theme"
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item_kind: Option<String>,
    },
    /// Replace the content of an existing block
    ReviseBlock {
        /// Target block
        block_id: SubstrateId,
        /// Replacement body (required)
        content: String,
    },
    /// Move a block to the archived state
    ArchiveBlock {
        /// Target block
        block_id: SubstrateId,
    },
    /// Fold duplicate context items into one canonical item
    MergeContextItems {
        /// Items to fold away (required, non-empty)
        from_ids: Vec<SubstrateId>,
        /// Surviving canonical item
        canonical_id: SubstrateId,
    },
    /// Reference a context item from a document
    AttachContextItem {
        /// Item to attach
        context_item_id: SubstrateId,
        /// Target document
        document_id: DocumentId,
    },
    /// Widen the visibility scope of a block
    PromoteScope {
        /// Target block
        block_id: SubstrateId,
        /// Scope to promote to
        to_scope: ScopeLevel,
    },
    /// Edit a composed document body
    DocumentEdit {
        /// Target document
        document_id: DocumentId,
        /// Replacement body (required)
        content: String,
    },
    /// Redact the raw content of a dump
    RedactDump {
        /// Target dump
        dump_id: SubstrateId,
        /// Optional reviewer-facing reason
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Delete a substrate item (cascade-checked)
    Delete {
        /// Family of the target
        substrate_type: SubstrateType,
        /// Target id
        substrate_id: SubstrateId,
    },
}

impl Operation {
    /// Kind tag of this operation
    #[inline]
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::CreateBlock { .. } => OperationKind::CreateBlock,
            Operation::CreateContextItem { .. } => OperationKind::CreateContextItem,
            Operation::ReviseBlock { .. } => OperationKind::ReviseBlock,
            Operation::ArchiveBlock { .. } => OperationKind::ArchiveBlock,
            Operation::MergeContextItems { .. } => OperationKind::MergeContextItems,
            Operation::AttachContextItem { .. } => OperationKind::AttachContextItem,
            Operation::PromoteScope { .. } => OperationKind::PromoteScope,
            Operation::DocumentEdit { .. } => OperationKind::DocumentEdit,
            Operation::RedactDump { .. } => OperationKind::RedactDump,
            Operation::Delete { .. } => OperationKind::Delete,
        }
    }
}

/// Kind tags for the closed operation set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    CreateBlock,
    CreateContextItem,
    ReviseBlock,
    ArchiveBlock,
    MergeContextItems,
    AttachContextItem,
    PromoteScope,
    DocumentEdit,
    RedactDump,
    Delete,
}

impl OperationKind {
    /// Kinds that rewire relationships between substrate items
    #[inline]
    #[must_use]
    pub fn mutates_relationships(&self) -> bool {
        matches!(
            self,
            OperationKind::MergeContextItems | OperationKind::AttachContextItem
        )
    }

    /// Kinds that cross scope or document boundaries
    #[inline]
    #[must_use]
    pub fn crosses_scope(&self) -> bool {
        matches!(
            self,
            OperationKind::PromoteScope | OperationKind::DocumentEdit
        )
    }

    /// Kinds that remove or obscure existing substrate
    #[inline]
    #[must_use]
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            OperationKind::Delete | OperationKind::RedactDump | OperationKind::ArchiveBlock
        )
    }

    /// Stable snake_case name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::CreateBlock => "create_block",
            OperationKind::CreateContextItem => "create_context_item",
            OperationKind::ReviseBlock => "revise_block",
            OperationKind::ArchiveBlock => "archive_block",
            OperationKind::MergeContextItems => "merge_context_items",
            OperationKind::AttachContextItem => "attach_context_item",
            OperationKind::PromoteScope => "promote_scope",
            OperationKind::DocumentEdit => "document_edit",
            OperationKind::RedactDump => "redact_dump",
            OperationKind::Delete => "delete",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient, request-scoped unit of intended change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDescriptor {
    /// Logical origin of the request
    pub entry_point: EntryPoint,
    /// Acting user or agent (resolved externally)
    pub actor_id: ActorId,
    /// Owning workspace
    pub workspace_id: WorkspaceId,
    /// Basket the change applies to, if basket-scoped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basket_id: Option<BasketId>,
    /// Declared blast radius; the policy decider fills in the default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blast_radius: Option<BlastRadius>,
    /// Ordered operations (must be non-empty)
    pub ops: Vec<Operation>,
    /// Causal origin tags, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provenance: Vec<ProvenanceRef>,
}

impl ChangeDescriptor {
    /// Create a descriptor with no operations yet
    #[inline]
    #[must_use]
    pub fn new(entry_point: EntryPoint, actor_id: ActorId, workspace_id: WorkspaceId) -> Self {
        Self {
            entry_point,
            actor_id,
            workspace_id,
            basket_id: None,
            blast_radius: None,
            ops: Vec::new(),
            provenance: Vec::new(),
        }
    }

    /// With basket scope
    #[inline]
    #[must_use]
    pub fn with_basket(mut self, basket_id: BasketId) -> Self {
        self.basket_id = Some(basket_id);
        self
    }

    /// With a declared blast radius
    #[inline]
    #[must_use]
    pub fn with_blast_radius(mut self, radius: BlastRadius) -> Self {
        self.blast_radius = Some(radius);
        self
    }

    /// Append one operation
    #[inline]
    #[must_use]
    pub fn with_op(mut self, op: Operation) -> Self {
        self.ops.push(op);
        self
    }

    /// Append many operations
    #[inline]
    #[must_use]
    pub fn with_ops(mut self, ops: impl IntoIterator<Item = Operation>) -> Self {
        self.ops.extend(ops);
        self
    }

    /// Append a provenance tag
    #[inline]
    #[must_use]
    pub fn with_provenance(mut self, tag: ProvenanceRef) -> Self {
        self.provenance.push(tag);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ChangeDescriptor {
        ChangeDescriptor::new(
            EntryPoint::ManualEdit,
            ActorId::new("user-1"),
            WorkspaceId::new(),
        )
    }

    #[test]
    fn descriptor_builder() {
        let basket = BasketId::new();
        let cd = descriptor()
            .with_basket(basket)
            .with_blast_radius(BlastRadius::Scoped)
            .with_op(Operation::CreateBlock {
                content: "Test goal".into(),
                semantic_type: "goal".into(),
                title: None,
            })
            .with_provenance(ProvenanceRef::new(ProvenanceKind::Dump, "dump-1"));

        assert_eq!(cd.basket_id, Some(basket));
        assert_eq!(cd.blast_radius, Some(BlastRadius::Scoped));
        assert_eq!(cd.ops.len(), 1);
        assert_eq!(cd.provenance.len(), 1);
    }

    #[test]
    fn operation_kind_classification() {
        assert!(OperationKind::MergeContextItems.mutates_relationships());
        assert!(OperationKind::AttachContextItem.mutates_relationships());
        assert!(OperationKind::PromoteScope.crosses_scope());
        assert!(OperationKind::DocumentEdit.crosses_scope());
        assert!(OperationKind::Delete.is_destructive());
        assert!(!OperationKind::CreateBlock.is_destructive());
        assert!(!OperationKind::CreateBlock.mutates_relationships());
    }

    #[test]
    fn operation_serde_tagging() {
        let op = Operation::CreateBlock {
            content: "c".into(),
            semantic_type: "goal".into(),
            title: None,
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "create_block");
        assert_eq!(json["semantic_type"], "goal");

        let back: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn entry_point_names_are_stable() {
        assert_eq!(EntryPoint::OnboardingDump.as_str(), "onboarding_dump");
        assert_eq!(EntryPoint::ManualEdit.as_str(), "manual_edit");
    }
}
