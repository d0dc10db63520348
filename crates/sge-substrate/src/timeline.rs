//! Timeline events and cursors
//!
//! The timeline is the append-only source of truth for "what happened".
//! Mutations submit `EventDraft`s; the storage layer stamps the id and
//! timestamp at commit time so ordering is storage-assigned, never
//! client-assigned. Ordering key is `(ts desc, id desc)` and the cursor
//! encodes the last-seen pair.

use crate::ids::{ActorId, BasketId, EventId, WorkspaceId};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known event kinds emitted by the engine
pub mod kind {
    /// A block row was created
    pub const BLOCK_CREATED: &str = "block.created";
    /// A block changed lifecycle state
    pub const BLOCK_STATE_CHANGED: &str = "block.state_changed";
    /// A block's content was revised
    pub const BLOCK_REVISED: &str = "block.revised";
    /// A block's visibility scope was widened
    pub const BLOCK_PROMOTED: &str = "block.promoted";
    /// A context item was created
    pub const CONTEXT_ITEM_CREATED: &str = "context_item.created";
    /// Context items were merged into a canonical item
    pub const CONTEXT_ITEM_MERGED: &str = "context_item.merged";
    /// A context item was attached to a document
    pub const CONTEXT_ITEM_ATTACHED: &str = "context_item.attached";
    /// A document body was updated
    pub const DOCUMENT_UPDATED: &str = "document.updated";
    /// A dump's raw content was redacted
    pub const DUMP_REDACTED: &str = "dump.redacted";
    /// A substrate item was deleted
    pub const SUBSTRATE_DELETED: &str = "substrate.deleted";
    /// Summary event for a committed change batch
    pub const CHANGE_COMMITTED: &str = "change.committed";
    /// A change was queued for review
    pub const CHANGE_PROPOSED: &str = "change.proposed";
    /// A proposal was approved and executed
    pub const PROPOSAL_APPROVED: &str = "proposal.approved";
    /// A proposal was rejected
    pub const PROPOSAL_REJECTED: &str = "proposal.rejected";
}

/// True when `kind` matches `filter`; `entity.*` selects a whole namespace
#[must_use]
pub fn kind_matches(kind: &str, filter: &str) -> bool {
    match filter.strip_suffix(".*") {
        Some(prefix) => kind
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.')),
        None => kind == filter,
    }
}

/// Event payload before the store stamps identity and time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Basket the event belongs to (none for workspace-level events)
    pub basket_id: Option<BasketId>,
    /// Namespaced `entity.action` kind
    pub kind: String,
    /// Entity the event describes
    pub entity_id: String,
    /// Acting user or agent
    pub actor_id: ActorId,
    /// Free-form before/after state, provenance, counts
    pub metadata: Value,
}

impl EventDraft {
    /// Create a draft with empty metadata
    #[inline]
    #[must_use]
    pub fn new(kind: impl Into<String>, entity_id: impl Into<String>, actor_id: ActorId) -> Self {
        Self {
            basket_id: None,
            kind: kind.into(),
            entity_id: entity_id.into(),
            actor_id,
            metadata: Value::Null,
        }
    }

    /// With basket scope
    #[inline]
    #[must_use]
    pub fn with_basket(mut self, basket_id: Option<BasketId>) -> Self {
        self.basket_id = basket_id;
        self
    }

    /// With metadata payload
    #[inline]
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Immutable, storage-stamped timeline record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Monotonically comparable identifier
    pub id: EventId,
    /// Basket the event belongs to (none for workspace-level events)
    pub basket_id: Option<BasketId>,
    /// Namespaced `entity.action` kind
    pub kind: String,
    /// Entity the event describes
    pub entity_id: String,
    /// Owning workspace
    pub workspace_id: WorkspaceId,
    /// Acting user or agent
    pub actor_id: ActorId,
    /// Storage-assigned timestamp
    pub ts: DateTime<Utc>,
    /// Free-form before/after state, provenance, counts
    pub metadata: Value,
}

impl TimelineEvent {
    /// Cursor pointing at this event
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> EventCursor {
        EventCursor {
            ts: self.ts,
            id: self.id,
        }
    }
}

/// Malformed pagination cursor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timeline cursor: {0:?}")]
pub struct InvalidCursor(pub String);

/// Last-seen `(ts, id)` pair for timeline pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCursor {
    /// Timestamp of the last event on the previous page
    pub ts: DateTime<Utc>,
    /// Id of the last event on the previous page
    pub id: EventId,
}

impl EventCursor {
    /// Opaque wire form: `<rfc3339>|<ulid>`. Nanosecond precision: stored
    /// timestamps carry nanos, and a truncated cursor would sort below the
    /// event it points at and skip everything sharing that timestamp.
    #[must_use]
    pub fn encode(&self) -> String {
        format!(
            "{}|{}",
            self.ts.to_rfc3339_opts(SecondsFormat::Nanos, true),
            self.id
        )
    }

    /// Parse the wire form produced by [`EventCursor::encode`]
    pub fn decode(raw: &str) -> Result<Self, InvalidCursor> {
        let (ts_part, id_part) = raw
            .split_once('|')
            .ok_or_else(|| InvalidCursor(raw.to_string()))?;
        let ts = DateTime::parse_from_rfc3339(ts_part)
            .map_err(|_| InvalidCursor(raw.to_string()))?
            .with_timezone(&Utc);
        let id = EventId::parse(id_part).map_err(|_| InvalidCursor(raw.to_string()))?;
        Ok(Self { ts, id })
    }

    /// True when `event` sorts strictly after this cursor in
    /// `(ts desc, id desc)` order, i.e. belongs on a later page.
    #[inline]
    #[must_use]
    pub fn is_before(&self, event: &TimelineEvent) -> bool {
        (event.ts, event.id) < (self.ts, self.id)
    }
}

/// One page of timeline events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePage {
    /// Events in `(ts desc, id desc)` order
    pub events: Vec<TimelineEvent>,
    /// True when rows exist strictly beyond this page
    pub has_more: bool,
    /// Cursor for the next page, present iff `has_more`
    pub next_cursor: Option<String>,
}
