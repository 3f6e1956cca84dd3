//! Message entity for channel and direct-conversation posts.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "message")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Channel or direct-conversation this message belongs to. Immutable.
    #[sea_orm(indexed)]
    pub topic_id: String,

    /// Sending member's profile ID (weak reference; identity lives elsewhere).
    #[sea_orm(indexed)]
    pub author_id: String,

    /// Message text. Empty only when an attachment is present, or after
    /// the message was tombstoned.
    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Durable URL of an attached upload. Immutable once set; cleared on delete.
    #[sea_orm(nullable)]
    pub attachment_url: Option<String>,

    /// Tombstone flag. Deleted messages keep their row so cursor pagination
    /// stays stable.
    #[sea_orm(default_value = false)]
    pub deleted: bool,

    pub created_at: DateTimeWithTimeZone,

    /// Equals `created_at` until the first edit.
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether this message has been edited after creation.
    #[must_use]
    pub fn is_edited(&self) -> bool {
        self.updated_at != self.created_at
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for accord_common::Message {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            topic_id: model.topic_id,
            author_id: model.author_id,
            content: model.content,
            attachment_url: model.attachment_url,
            deleted: model.deleted,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}
