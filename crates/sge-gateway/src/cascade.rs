//! Cascade analyzer
//!
//! Read-only impact computation for a candidate deletion or detachment.
//! Two strategies sit behind one contract: a fast-path aggregate the
//! backend may provide, and a fallback that re-derives the same counts from
//! row scans. Both must agree exactly; the property test in the gateway
//! integration suite asserts it.

use crate::error::GatewayError;
use sge_store::SubstrateStore;
use sge_substrate::{BasketId, CascadePreview, SubstrateId, SubstrateType};
use std::sync::Arc;

/// Computes deletion impact previews; performs no writes
#[derive(Clone)]
pub struct CascadeAnalyzer {
    store: Arc<dyn SubstrateStore>,
}

impl CascadeAnalyzer {
    /// Create an analyzer over a store
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn SubstrateStore>) -> Self {
        Self { store }
    }

    /// Preview the impact of removing one substrate item from a basket.
    /// Prefers the backend aggregate and falls back to direct counting when
    /// the aggregate is unavailable.
    pub async fn preview(
        &self,
        basket_id: BasketId,
        substrate_type: SubstrateType,
        substrate_id: SubstrateId,
    ) -> Result<CascadePreview, GatewayError> {
        match self
            .store
            .cascade_aggregate(basket_id, substrate_type, substrate_id)
            .await
            .map_err(GatewayError::from_execution_store_error)?
        {
            Some(preview) => Ok(preview),
            None => {
                tracing::debug!(
                    basket = %basket_id,
                    target = %substrate_id,
                    "cascade aggregate unavailable, counting directly"
                );
                self.preview_fallback(basket_id, substrate_type, substrate_id)
                    .await
            }
        }
    }

    /// Direct-counting strategy; same filters as the aggregate
    pub async fn preview_fallback(
        &self,
        basket_id: BasketId,
        substrate_type: SubstrateType,
        substrate_id: SubstrateId,
    ) -> Result<CascadePreview, GatewayError> {
        let (refs_detached_count, affected_documents_count) = self
            .store
            .count_document_refs(basket_id, substrate_type, substrate_id)
            .await
            .map_err(GatewayError::from_execution_store_error)?;
        let relationships_pruned_count = self
            .store
            .count_relationships(basket_id, substrate_type, substrate_id)
            .await
            .map_err(GatewayError::from_execution_store_error)?;

        Ok(CascadePreview {
            refs_detached_count,
            relationships_pruned_count,
            affected_documents_count,
        })
    }
}
