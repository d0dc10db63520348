//! Governed mutation engine for the knowledge substrate.
//!
//! All writes flow through one decision gateway: a change descriptor is
//! validated, risk-assessed, and routed by workspace policy to immediate
//! execution or to a reviewable proposal. Committed mutations land as
//! transactional batches paired with append-only timeline events.
//!
//! # Components
//! - [`DecisionGateway`]: the single mutation entry point
//! - [`validate`]: pure structural validation of change descriptors
//! - [`risk`]: deterministic scope-impact classification
//! - [`policy`]: settings plus risk into a routing decision
//! - [`MutationExecutor`]: operation batches onto storage writes and events
//! - [`ProposalLifecycle`]: create, approve, reject
//! - [`CascadeAnalyzer`]: read-only deletion impact previews
//! - [`IdempotencyGuard`]: exactly-once creation per request key
//! - [`TimelineService`]: cursor pagination over the event log

pub mod analyzer;
pub mod cascade;
pub mod config;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod idempotency;
pub mod policy;
pub mod proposals;
pub mod risk;
pub mod timeline;
pub mod validate;

pub use analyzer::{analyze_bounded, AnalyzerError, ChangeAnalyzer};
pub use cascade::CascadeAnalyzer;
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use executor::{ExecutionContext, ExecutionSummary, MutationExecutor};
pub use gateway::{DecisionGateway, RouteOutcome};
pub use idempotency::{CreateOutcome, CreatePayload, IdempotencyGuard};
pub use policy::{decide, PolicyDecision, Route, ValidatorMode};
pub use proposals::ProposalLifecycle;
pub use risk::{assess, OperationRisk, ScopeImpact};
pub use timeline::{TimelineQuery, TimelineService};
pub use validate::{validate, ValidationOutcome};
