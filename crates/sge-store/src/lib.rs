//! Storage seam for the governance core
//!
//! The relational engine itself is an external collaborator; this crate
//! defines the contract the core relies on (transactions, a unique
//! constraint for idempotent creation, an optimistic proposal-status guard,
//! ordered timeline scans) and ships an in-memory reference implementation
//! for tests and single-process embedders.

#![warn(unreachable_pub)]

pub mod error;
pub mod memory;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::{
    BasketRow, BlockRow, BlockState, ContextItemRow, CreateKind, CreatedEntity, DocumentRefRow,
    DocumentRow, DumpRow, IdempotencyRecord, ProposalResolution, RelationshipRow, SubstrateStore,
    SubstrateWrite, TxBatch,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
