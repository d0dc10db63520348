//! Substrate domain types
//!
//! Shared vocabulary for the governance core:
//! - Identifier newtypes (workspaces, baskets, substrate rows, events)
//! - Change descriptors and the closed operation union
//! - Per-workspace governance settings
//! - Proposals and their state machine
//! - Timeline events and pagination cursors
//!
//! These types are pure data: durable ownership lives in the storage layer
//! and descriptors/operations are request-scoped values.

#![warn(unreachable_pub)]

pub mod cascade;
pub mod change;
pub mod governance;
pub mod ids;
pub mod proposal;
pub mod timeline;

pub use cascade::CascadePreview;
pub use change::{
    BlastRadius, ChangeDescriptor, EntryPoint, Operation, OperationKind, ProvenanceKind,
    ProvenanceRef, ScopeLevel, SubstrateType,
};
pub use governance::{GovernanceSettings, PolicyRoute};
pub use ids::{
    ActorId, BasketId, DocumentId, EventId, InvalidRequestKey, ProposalId, RequestKey,
    SubstrateId, WorkspaceId,
};
pub use proposal::{Proposal, ProposalStatus, ValidatorReport};
pub use timeline::{
    kind_matches, EventCursor, EventDraft, InvalidCursor, TimelineEvent, TimelinePage,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
