//! Per-topic feed cache.
//!
//! The cache merges two unordered inputs, paginated history fetches and
//! pushed events, into one duplicate-free feed. Merging is idempotent and
//! commutative per message id, so replays and races between the two inputs
//! cannot corrupt the view.

use std::collections::HashMap;

use accord_common::{Message, MessageEvent, MessagePage};
use tokio::sync::watch;

/// Tail position for scroll-up pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Tail {
    /// No page has been applied at the tail yet.
    Unfetched,
    /// More history may exist past this cursor.
    Cursor(String),
    /// The oldest page has been reached.
    End,
}

/// Merge/dedup cache for one topic's feed.
#[derive(Debug)]
pub struct FeedCache {
    topic_id: String,
    messages: HashMap<String, Message>,
    tail: Tail,
    revision: watch::Sender<u64>,
}

impl FeedCache {
    /// Create an empty cache for a topic.
    #[must_use]
    pub fn new(topic_id: impl Into<String>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            topic_id: topic_id.into(),
            messages: HashMap::new(),
            tail: Tail::Unfetched,
            revision,
        }
    }

    /// Topic this cache belongs to.
    #[must_use]
    pub fn topic_id(&self) -> &str {
        &self.topic_id
    }

    /// Number of cached entries, tombstones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Cursor for the next scroll-up fetch, if more history may exist.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        match &self.tail {
            Tail::Cursor(c) => Some(c),
            Tail::Unfetched | Tail::End => None,
        }
    }

    /// Whether the oldest page has been reached.
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.tail == Tail::End
    }

    /// Observe the revision counter. It is bumped on every effective
    /// mutation, so the render layer can re-pull [`Self::view`] on change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Ordered, duplicate-free snapshot, newest first.
    #[must_use]
    pub fn view(&self) -> Vec<Message> {
        let mut items: Vec<Message> = self.messages.values().cloned().collect();
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        items
    }

    /// Merge one fetched page.
    ///
    /// `fetched_with` is the cursor the page was requested with. The tail
    /// position only advances when the page extends the current tail;
    /// pages that arrive out of order still merge their items but leave
    /// the tail alone, so concurrent fetches for different cursors are
    /// order-independent.
    pub fn apply_page(&mut self, page: MessagePage, fetched_with: Option<&str>) {
        let mut changed = false;

        for item in page.items {
            changed |= self.merge(item);
        }

        let extends_tail = match (&self.tail, fetched_with) {
            (Tail::Unfetched, None) => true,
            (Tail::Cursor(current), Some(requested)) => current == requested,
            _ => false,
        };
        if extends_tail {
            let new_tail = page
                .next_cursor
                .map_or(Tail::End, Tail::Cursor);
            if self.tail != new_tail {
                self.tail = new_tail;
                changed = true;
            }
        }

        if changed {
            self.bump();
        }
    }

    /// Merge one pushed event. Events for other topics are ignored.
    pub fn apply_event(&mut self, event: &MessageEvent) {
        if event.topic_id() != self.topic_id {
            return;
        }

        if self.merge(event.message().clone()) {
            self.bump();
        }
    }

    /// Merge a single message copy into the cache.
    ///
    /// Rules, applied per id:
    /// - absent: insert (tombstones included, so a deletion that outruns
    ///   the backfill still lands)
    /// - present tombstone: sticky, nothing overwrites it
    /// - incoming tombstone: wins over any live copy
    /// - otherwise: last write wins on `updated_at`; an equal-timestamp
    ///   copy that differs still replaces, so a replayed identical copy
    ///   stays a no-op while an edit whose `updated_at` ties the stored
    ///   copy is not lost
    ///
    /// Returns whether the cache changed.
    fn merge(&mut self, incoming: Message) -> bool {
        match self.messages.get(&incoming.id) {
            None => {
                self.messages.insert(incoming.id.clone(), incoming);
                true
            }
            Some(existing) => {
                let replaces = incoming.deleted
                    || incoming.updated_at > existing.updated_at
                    || (incoming.updated_at == existing.updated_at && incoming != *existing);
                if existing.deleted {
                    false
                } else if replaces {
                    self.messages.insert(incoming.id.clone(), incoming);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn bump(&mut self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}
