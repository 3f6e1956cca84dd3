//! Event publisher abstraction.
//!
//! Mutation services publish message lifecycle events through this trait
//! without depending on the transport (in-process hub, Redis bridge).

use accord_common::{AppResult, MessageEvent};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for publishing message lifecycle events.
///
/// Implementations must preserve per-topic publish order; the mutation path
/// only calls `publish` after the mutation is durably applied to the store.
#[async_trait]
pub trait MessageEventPublisher: Send + Sync {
    /// Publish one event to all current subscribers of its topic.
    async fn publish(&self, event: MessageEvent) -> AppResult<()>;
}

/// A no-op implementation for tests or when real-time events are disabled.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl MessageEventPublisher for NoOpEventPublisher {
    async fn publish(&self, _event: MessageEvent) -> AppResult<()> {
        Ok(())
    }
}

/// Shared trait-object handle used by services.
pub type EventPublisherService = Arc<dyn MessageEventPublisher>;
