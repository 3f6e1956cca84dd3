//! Message service: mutations and cursor-paginated reads.

use crate::services::event_publisher::EventPublisherService;
use accord_common::{
    AppError, AppResult, IdGenerator, Message, MessageEvent, MessagePage, MESSAGE_BATCH,
};
use accord_db::{entities::message, repositories::MessageRepository};
use chrono::Utc;
use sea_orm::Set;

/// Input for creating a new message.
pub struct CreateMessageInput {
    pub content: String,
    pub attachment_url: Option<String>,
}

/// Message service.
#[derive(Clone)]
pub struct MessageService {
    message_repo: MessageRepository,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl MessageService {
    /// Create a new message service.
    #[must_use]
    pub const fn new(message_repo: MessageRepository) -> Self {
        Self {
            message_repo,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Fetch one page of a topic's feed, newest first.
    ///
    /// Without a cursor this returns the [`MESSAGE_BATCH`] most recent
    /// messages (tombstones included). With a cursor it returns the batch
    /// strictly older than the cursor message. `next_cursor` is set iff the
    /// page came back full, signalling that more history may exist.
    pub async fn fetch_page(
        &self,
        topic_id: &str,
        cursor: Option<&str>,
    ) -> AppResult<MessagePage> {
        if topic_id.is_empty() {
            return Err(AppError::BadRequest("topicId missing".to_string()));
        }

        let until = match cursor {
            Some(cursor_id) => {
                let row = self
                    .message_repo
                    .find_by_id(cursor_id)
                    .await?
                    .filter(|m| m.topic_id == topic_id)
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Cursor not found: {cursor_id}"))
                    })?;
                Some(row)
            }
            None => None,
        };

        let rows = self
            .message_repo
            .find_page(topic_id, MESSAGE_BATCH, until.as_ref())
            .await?;

        let next_cursor = if rows.len() as u64 == MESSAGE_BATCH {
            rows.last().map(|m| m.id.clone())
        } else {
            None
        };

        Ok(MessagePage {
            items: rows.into_iter().map(Message::from).collect(),
            next_cursor,
        })
    }

    /// Post a new message to a topic.
    pub async fn create_message(
        &self,
        author_id: &str,
        topic_id: &str,
        input: CreateMessageInput,
    ) -> AppResult<Message> {
        if topic_id.is_empty() {
            return Err(AppError::BadRequest("topicId missing".to_string()));
        }

        // Empty content is only allowed when an attachment carries the payload
        if input.content.trim().is_empty() && input.attachment_url.is_none() {
            return Err(AppError::BadRequest(
                "Message must have content or an attachment".to_string(),
            ));
        }

        let now = Utc::now();
        let model = message::ActiveModel {
            id: Set(self.id_gen.generate()),
            topic_id: Set(topic_id.to_string()),
            author_id: Set(author_id.to_string()),
            content: Set(input.content),
            attachment_url: Set(input.attachment_url),
            deleted: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let created = Message::from(self.message_repo.create(model).await?);
        self.publish(MessageEvent::Created(created.clone())).await;

        Ok(created)
    }

    /// Edit a message's content. Only the author may edit; tombstones are
    /// immutable.
    pub async fn edit_message(
        &self,
        author_id: &str,
        message_id: &str,
        content: String,
    ) -> AppResult<Message> {
        let existing = self
            .message_repo
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message not found: {message_id}")))?;

        if existing.author_id != author_id {
            return Err(AppError::Forbidden(
                "Cannot edit another member's message".to_string(),
            ));
        }

        if existing.deleted {
            return Err(AppError::Conflict(
                "Message has been deleted".to_string(),
            ));
        }

        if content.trim().is_empty() && existing.attachment_url.is_none() {
            return Err(AppError::BadRequest(
                "Message must have content or an attachment".to_string(),
            ));
        }

        let updated = Message::from(self.message_repo.update_content(existing, content).await?);
        self.publish(MessageEvent::Updated(updated.clone())).await;

        Ok(updated)
    }

    /// Tombstone a message. The entry stays in the log so cursors remain
    /// valid; content and attachment are cleared and never restored.
    pub async fn delete_message(
        &self,
        author_id: &str,
        message_id: &str,
    ) -> AppResult<Message> {
        let existing = self
            .message_repo
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message not found: {message_id}")))?;

        if existing.author_id != author_id {
            return Err(AppError::Forbidden(
                "Cannot delete another member's message".to_string(),
            ));
        }

        if existing.deleted {
            return Err(AppError::Conflict(
                "Message already deleted".to_string(),
            ));
        }

        let tombstone = Message::from(self.message_repo.soft_delete(existing).await?);
        self.publish(MessageEvent::Deleted(tombstone.clone())).await;

        Ok(tombstone)
    }

    /// Publish strictly after the mutation committed. A failed publish is
    /// logged, not surfaced: subscribers recover through the reconnect
    /// resync path.
    async fn publish(&self, event: MessageEvent) {
        if let Some(ref event_publisher) = self.event_publisher {
            if let Err(e) = event_publisher.publish(event).await {
                tracing::warn!(error = %e, "Failed to publish message event");
            }
        }
    }
}
