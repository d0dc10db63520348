//! Timeline read service
//!
//! Cursor pagination over the append-only event log. Limits are clamped to
//! the configured cap, cursors are opaque strings validated up front, and
//! `next_cursor` is present exactly when more rows exist.

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use sge_store::SubstrateStore;
use sge_substrate::{BasketId, EventCursor, TimelinePage};
use std::sync::Arc;

/// Query parameters for one timeline page
#[derive(Debug, Clone, Default)]
pub struct TimelineQuery {
    /// Opaque cursor from a previous page's `next_cursor`
    pub cursor: Option<String>,
    /// Requested page size; defaults and caps come from config
    pub limit: Option<usize>,
    /// Exact kind or `entity.*` namespace filter
    pub kind_filter: Option<String>,
}

impl TimelineQuery {
    /// Query for the first page with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a cursor
    #[inline]
    #[must_use]
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// With a page size
    #[inline]
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// With a kind filter
    #[inline]
    #[must_use]
    pub fn with_kind_filter(mut self, filter: impl Into<String>) -> Self {
        self.kind_filter = Some(filter.into());
        self
    }
}

/// Read-side access to the event log
#[derive(Clone)]
pub struct TimelineService {
    store: Arc<dyn SubstrateStore>,
    config: GatewayConfig,
}

impl TimelineService {
    /// Create a service over a store
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn SubstrateStore>, config: GatewayConfig) -> Self {
        Self { store, config }
    }

    /// Fetch one page of a basket's timeline in `(ts desc, id desc)` order
    pub async fn page(
        &self,
        basket_id: BasketId,
        query: TimelineQuery,
    ) -> Result<TimelinePage, GatewayError> {
        let cursor = match &query.cursor {
            Some(raw) => Some(
                EventCursor::decode(raw)
                    .map_err(|err| GatewayError::Validation(vec![err.to_string()]))?,
            ),
            None => None,
        };
        let limit = query
            .limit
            .unwrap_or(self.config.default_page_limit)
            .clamp(1, self.config.max_page_limit);

        let (events, has_more) = self
            .store
            .list_events(basket_id, cursor, limit, query.kind_filter.as_deref())
            .await
            .map_err(GatewayError::from_execution_store_error)?;

        let next_cursor = if has_more {
            events.last().map(|event| event.cursor().encode())
        } else {
            None
        };
        Ok(TimelinePage {
            events,
            has_more,
            next_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sge_store::{MemoryStore, TxBatch};
    use sge_substrate::timeline::kind as event_kind;
    use sge_substrate::{ActorId, EventDraft, WorkspaceId};

    async fn seed_events(store: &MemoryStore, basket: BasketId, count: usize) {
        let workspace = WorkspaceId::new();
        for i in 0..count {
            let mut batch = TxBatch::new(workspace);
            batch.events.push(
                EventDraft::new(
                    event_kind::BLOCK_CREATED,
                    format!("block-{i}"),
                    ActorId::new("user-1"),
                )
                .with_basket(Some(basket)),
            );
            store.commit(batch).await.unwrap();
        }
    }

    #[tokio::test]
    async fn pages_walk_the_full_log_without_overlap() {
        let store = Arc::new(MemoryStore::new());
        let basket = BasketId::new();
        seed_events(&store, basket, 7).await;

        let service = TimelineService::new(
            Arc::clone(&store) as Arc<dyn SubstrateStore>,
            GatewayConfig::new(),
        );

        let mut seen = Vec::new();
        let mut query = TimelineQuery::new().with_limit(3);
        loop {
            let page = service.page(basket, query.clone()).await.unwrap();
            assert!(page.events.len() <= 3);
            seen.extend(page.events.iter().map(|e| e.id));
            match page.next_cursor {
                Some(cursor) => {
                    assert!(page.has_more);
                    query = TimelineQuery::new().with_limit(3).with_cursor(cursor);
                }
                None => {
                    assert!(!page.has_more);
                    break;
                }
            }
        }

        assert_eq!(seen.len(), 7);
        let mut deduped = seen.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), 7, "pages must not overlap");
        // Newest first end to end
        assert!(seen.windows(2).all(|w| w[0] > w[1]));
    }

    #[tokio::test]
    async fn same_timestamp_events_paginate_without_loss() {
        let store = Arc::new(MemoryStore::new());
        let basket = BasketId::new();
        let workspace = WorkspaceId::new();

        // One batch: all three events share the storage-assigned timestamp,
        // so pagination has to discriminate on the id alone.
        let mut batch = TxBatch::new(workspace);
        for i in 0..3 {
            batch.events.push(
                EventDraft::new(
                    event_kind::BLOCK_CREATED,
                    format!("block-{i}"),
                    ActorId::new("user-1"),
                )
                .with_basket(Some(basket)),
            );
        }
        store.commit(batch).await.unwrap();

        let service = TimelineService::new(
            Arc::clone(&store) as Arc<dyn SubstrateStore>,
            GatewayConfig::new(),
        );
        let mut seen = Vec::new();
        let mut query = TimelineQuery::new().with_limit(1);
        loop {
            let page = service.page(basket, query).await.unwrap();
            seen.extend(page.events.iter().map(|e| e.id));
            match page.next_cursor {
                Some(cursor) => query = TimelineQuery::new().with_limit(1).with_cursor(cursor),
                None => break,
            }
        }
        assert_eq!(seen.len(), 3);
        let mut deduped = seen.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), 3);
    }

    #[tokio::test]
    async fn bad_cursor_is_a_validation_error() {
        let store = Arc::new(MemoryStore::new());
        let service = TimelineService::new(store, GatewayConfig::new());
        let err = service
            .page(
                BasketId::new(),
                TimelineQuery::new().with_cursor("not-a-cursor"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn limit_is_clamped_to_the_cap() {
        let store = Arc::new(MemoryStore::new());
        let basket = BasketId::new();
        seed_events(&store, basket, 5).await;

        let config = GatewayConfig::new().with_default_page_limit(2);
        let service =
            TimelineService::new(Arc::clone(&store) as Arc<dyn SubstrateStore>, config.clone());

        // Default limit applies when the caller passes none
        let page = service.page(basket, TimelineQuery::new()).await.unwrap();
        assert_eq!(page.events.len(), 2);

        // Oversized requests get the cap, zero gets at least one row
        let page = service
            .page(basket, TimelineQuery::new().with_limit(config.max_page_limit + 100))
            .await
            .unwrap();
        assert_eq!(page.events.len(), 5);
        let page = service
            .page(basket, TimelineQuery::new().with_limit(0))
            .await
            .unwrap();
        assert_eq!(page.events.len(), 1);
    }

    #[tokio::test]
    async fn kind_filter_narrows_the_page() {
        let store = Arc::new(MemoryStore::new());
        let basket = BasketId::new();
        let workspace = WorkspaceId::new();

        let mut batch = TxBatch::new(workspace);
        batch.events.push(
            EventDraft::new(event_kind::BLOCK_CREATED, "block-1", ActorId::new("u"))
                .with_basket(Some(basket)),
        );
        batch.events.push(
            EventDraft::new(event_kind::DOCUMENT_UPDATED, "doc-1", ActorId::new("u"))
                .with_basket(Some(basket)),
        );
        store.commit(batch).await.unwrap();

        let service = TimelineService::new(
            Arc::clone(&store) as Arc<dyn SubstrateStore>,
            GatewayConfig::new(),
        );
        let page = service
            .page(basket, TimelineQuery::new().with_kind_filter("block.*"))
            .await
            .unwrap();
        assert_eq!(page.events.len(), 1);
        assert_eq!(page.events[0].kind, event_kind::BLOCK_CREATED);
    }
}
