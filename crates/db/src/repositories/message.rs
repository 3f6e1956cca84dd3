//! Message repository.

use crate::entities::message::{self, ActiveModel, Column, Entity as Message};
use accord_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;

/// Repository for message operations.
#[derive(Clone)]
pub struct MessageRepository {
    db: Arc<DatabaseConnection>,
}

impl MessageRepository {
    /// Create a new message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a new message.
    pub async fn create(&self, model: ActiveModel) -> AppResult<message::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a message by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<message::Model>> {
        Message::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find one page of messages for a topic, newest first.
    ///
    /// When `until` is set, only messages strictly older than that row are
    /// returned (the cursor row itself is skipped). Strictly-older means
    /// `created_at < c.created_at`, falling back to `id < c.id` for rows
    /// sharing the cursor's timestamp, matching the `(created_at, id)`
    /// feed order. Tombstoned rows are included so cursors stay stable.
    pub async fn find_page(
        &self,
        topic_id: &str,
        limit: u64,
        until: Option<&message::Model>,
    ) -> AppResult<Vec<message::Model>> {
        let mut query = Message::find()
            .filter(Column::TopicId.eq(topic_id))
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id);

        if let Some(cursor) = until {
            query = query.filter(
                sea_orm::Condition::any()
                    .add(Column::CreatedAt.lt(cursor.created_at))
                    .add(
                        sea_orm::Condition::all()
                            .add(Column::CreatedAt.eq(cursor.created_at))
                            .add(Column::Id.lt(cursor.id.as_str())),
                    ),
            );
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replace a message's content, bumping `updated_at`.
    pub async fn update_content(
        &self,
        existing: message::Model,
        content: String,
    ) -> AppResult<message::Model> {
        let mut model: ActiveModel = existing.into();
        model.content = Set(content);
        model.updated_at = Set(Utc::now().into());

        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Soft-delete a message, leaving a tombstone row.
    ///
    /// Clears content and attachment, sets the `deleted` flag and bumps
    /// `updated_at`. The row is never removed so cursor pagination keeps
    /// its position continuity.
    pub async fn soft_delete(&self, existing: message::Model) -> AppResult<message::Model> {
        let mut model: ActiveModel = existing.into();
        model.content = Set(String::new());
        model.attachment_url = Set(None);
        model.deleted = Set(true);
        model.updated_at = Set(Utc::now().into());

        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
