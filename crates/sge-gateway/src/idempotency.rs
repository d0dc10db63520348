//! Idempotency guard
//!
//! Deduplicates client-retried creation requests with a caller-supplied
//! UUID key. Malformed keys are rejected before any persistence attempt;
//! replays return the originally created entity; a key reused with a
//! divergent payload is a conflict. Races between identical concurrent
//! requests resolve through the storage unique constraint: the loser
//! re-reads and returns the winner's row as a replay.

use crate::error::GatewayError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sge_store::{
    BasketRow, CreateKind, CreatedEntity, DumpRow, IdempotencyRecord, StoreError, SubstrateStore,
};
use sge_substrate::{BasketId, RequestKey, SubstrateId, WorkspaceId};
use std::sync::Arc;

/// Creation payloads accepted by the guard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CreatePayload {
    /// Create a basket
    Basket {
        /// Owning workspace
        workspace_id: WorkspaceId,
        /// Display name
        name: String,
    },
    /// Create a dump inside a basket
    Dump {
        /// Target basket
        basket_id: BasketId,
        /// Raw pasted text
        body: String,
    },
}

impl CreatePayload {
    /// Constraint scope this payload creates under
    #[inline]
    #[must_use]
    pub fn kind(&self) -> CreateKind {
        match self {
            CreatePayload::Basket { .. } => CreateKind::Basket,
            CreatePayload::Dump { .. } => CreateKind::Dump,
        }
    }
}

/// Result of an idempotent creation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    /// Id of the created (or replayed) entity
    pub entity_id: String,
    /// True when a previous request with this key already created the entity
    pub replayed: bool,
}

/// Deduplicating creation front door
#[derive(Clone)]
pub struct IdempotencyGuard {
    store: Arc<dyn SubstrateStore>,
}

impl IdempotencyGuard {
    /// Create a guard over a store
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn SubstrateStore>) -> Self {
        Self { store }
    }

    /// Create an entity exactly once per `(kind, request_key)`
    pub async fn create_idempotent(
        &self,
        raw_key: &str,
        payload: CreatePayload,
    ) -> Result<CreateOutcome, GatewayError> {
        let key = RequestKey::parse(raw_key)
            .map_err(|err| GatewayError::InvalidKey(err.0))?;
        let kind = payload.kind();
        let payload_json = serde_json::to_value(&payload)
            .map_err(|err| GatewayError::execution(err.to_string()))?;

        // Fast path: the key was seen before.
        if let Some(existing) = self.lookup(kind, key).await? {
            return self.replay(existing, &payload_json);
        }

        let (entity, entity_id) = self.build_entity(payload).await?;
        let record = IdempotencyRecord {
            kind,
            request_key: key,
            payload: payload_json.clone(),
            entity_id: entity_id.clone(),
            created_at: Utc::now(),
        };

        match self.store.insert_idempotent(record, entity).await {
            Ok(()) => Ok(CreateOutcome {
                entity_id,
                replayed: false,
            }),
            // Lost a race: the constraint fired, re-read the winner's row.
            Err(StoreError::UniqueViolation { .. }) => {
                let existing = self.lookup(kind, key).await?.ok_or_else(|| {
                    GatewayError::execution("idempotency record vanished after unique violation")
                })?;
                self.replay(existing, &payload_json)
            }
            Err(other) => Err(GatewayError::from_execution_store_error(other)),
        }
    }

    async fn lookup(
        &self,
        kind: CreateKind,
        key: RequestKey,
    ) -> Result<Option<IdempotencyRecord>, GatewayError> {
        self.store
            .find_idempotency(kind, key)
            .await
            .map_err(GatewayError::from_execution_store_error)
    }

    fn replay(
        &self,
        existing: IdempotencyRecord,
        payload: &Value,
    ) -> Result<CreateOutcome, GatewayError> {
        if &existing.payload != payload {
            return Err(GatewayError::Conflict(format!(
                "request key {} was already used with a different payload",
                existing.request_key
            )));
        }
        Ok(CreateOutcome {
            entity_id: existing.entity_id,
            replayed: true,
        })
    }

    async fn build_entity(
        &self,
        payload: CreatePayload,
    ) -> Result<(CreatedEntity, String), GatewayError> {
        match payload {
            CreatePayload::Basket { workspace_id, name } => {
                let row = BasketRow {
                    id: BasketId::new(),
                    workspace_id,
                    name,
                    created_at: Utc::now(),
                };
                let id = row.id.to_string();
                Ok((CreatedEntity::Basket(row), id))
            }
            CreatePayload::Dump { basket_id, body } => {
                // A dump needs a live basket to land in.
                self.store
                    .basket(basket_id)
                    .await
                    .map_err(GatewayError::from_execution_store_error)?
                    .ok_or_else(|| GatewayError::NotFound(format!("basket {basket_id}")))?;
                let row = DumpRow {
                    id: SubstrateId::new(),
                    basket_id,
                    body: Some(body),
                    redacted: false,
                    created_at: Utc::now(),
                };
                let id = row.id.to_string();
                Ok((CreatedEntity::Dump(row), id))
            }
        }
    }
}
