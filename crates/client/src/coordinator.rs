//! Reconnection and backfill coordinator.
//!
//! Owns the set of open topics and their feed caches for one session.
//! After every reconnect it refetches page zero of each open topic; the
//! cache's merge rules make that refetch safe against events that were
//! missed or that raced the reconnect.

use std::collections::HashMap;
use std::sync::Arc;

use accord_common::{AppError, AppResult, MessageEvent, MessagePage};
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::connection::RetryPolicy;
use crate::feed::FeedCache;

/// Seam towards the paginated history endpoint.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page of a topic's feed, newest first. `cursor` of `None`
    /// requests the most recent page.
    async fn fetch_page(&self, topic_id: &str, cursor: Option<&str>)
    -> AppResult<MessagePage>;
}

/// Session-scoped synchronization coordinator.
pub struct SyncCoordinator {
    fetcher: Arc<dyn PageFetcher>,
    retry: RetryPolicy,
    topics: HashMap<String, FeedCache>,
}

impl SyncCoordinator {
    /// Create a coordinator with the default retry policy.
    #[must_use]
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self::with_retry(fetcher, RetryPolicy::default())
    }

    /// Create a coordinator with a custom retry policy.
    #[must_use]
    pub fn with_retry(fetcher: Arc<dyn PageFetcher>, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            retry,
            topics: HashMap::new(),
        }
    }

    /// Whether a topic is currently open.
    #[must_use]
    pub fn is_open(&self, topic_id: &str) -> bool {
        self.topics.contains_key(topic_id)
    }

    /// The feed cache for an open topic.
    #[must_use]
    pub fn feed(&self, topic_id: &str) -> Option<&FeedCache> {
        self.topics.get(topic_id)
    }

    /// Observe an open topic's revision counter.
    #[must_use]
    pub fn watch_feed(&self, topic_id: &str) -> Option<watch::Receiver<u64>> {
        self.topics.get(topic_id).map(FeedCache::watch)
    }

    /// Open a topic and load its first page.
    ///
    /// Reopening an already open topic just refreshes page zero.
    pub async fn open_topic(&mut self, topic_id: &str) -> AppResult<()> {
        self.topics
            .entry(topic_id.to_string())
            .or_insert_with(|| FeedCache::new(topic_id));
        self.resync_topic(topic_id).await
    }

    /// Close a topic and drop its cache. Late fetch results and events for
    /// a closed topic are discarded.
    pub fn close_topic(&mut self, topic_id: &str) {
        if self.topics.remove(topic_id).is_some() {
            debug!(topic = %topic_id, "Topic closed");
        }
    }

    /// Route a pushed event into the owning topic's cache.
    pub fn handle_event(&mut self, event: &MessageEvent) {
        if let Some(cache) = self.topics.get_mut(event.topic_id()) {
            cache.apply_event(event);
        }
    }

    /// Merge a fetched page into an open topic. A page for a closed topic
    /// is a no-op, which is what makes late in-flight results harmless.
    pub fn apply_page(&mut self, topic_id: &str, page: MessagePage, fetched_with: Option<&str>) {
        if let Some(cache) = self.topics.get_mut(topic_id) {
            cache.apply_page(page, fetched_with);
        } else {
            debug!(topic = %topic_id, "Dropping page for closed topic");
        }
    }

    /// Resync every open topic after a (re)connect.
    ///
    /// Each topic gets a fresh page-zero fetch; existing caches are never
    /// cleared, so a failed resync leaves the stale view in place. The
    /// first topic whose retry budget is exhausted aborts the pass with
    /// its error.
    pub async fn on_connected(&mut self) -> AppResult<()> {
        let open: Vec<String> = self.topics.keys().cloned().collect();
        for topic_id in open {
            self.resync_topic(&topic_id).await?;
        }
        Ok(())
    }

    /// Load the next older page of an open topic.
    ///
    /// Returns `Ok(false)` when the oldest page has already been reached.
    pub async fn load_older(&mut self, topic_id: &str) -> AppResult<bool> {
        let cursor = {
            let cache = self
                .topics
                .get(topic_id)
                .ok_or_else(|| AppError::NotFound(format!("Topic not open: {topic_id}")))?;
            if cache.at_end() {
                return Ok(false);
            }
            cache.next_cursor().map(String::from)
        };

        let page = self
            .fetch_with_retry(topic_id, cursor.as_deref())
            .await?;
        self.apply_page(topic_id, page, cursor.as_deref());
        Ok(true)
    }

    /// Refetch page zero of one open topic.
    async fn resync_topic(&mut self, topic_id: &str) -> AppResult<()> {
        let page = self.fetch_with_retry(topic_id, None).await?;
        self.apply_page(topic_id, page, None);
        Ok(())
    }

    /// Fetch with bounded exponential backoff.
    async fn fetch_with_retry(
        &self,
        topic_id: &str,
        cursor: Option<&str>,
    ) -> AppResult<MessagePage> {
        let mut attempt = 0;
        loop {
            match self.fetcher.fetch_page(topic_id, cursor).await {
                Ok(page) => return Ok(page),
                Err(e) if attempt + 1 < self.retry.max_attempts() => {
                    let delay = self.retry.delay(attempt);
                    warn!(
                        topic = %topic_id,
                        attempt,
                        ?delay,
                        error = %e,
                        "Page fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(topic = %topic_id, error = %e, "Page fetch budget exhausted");
                    return Err(e);
                }
            }
        }
    }
}
