//! Create `message` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Message::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Message::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Message::TopicId).string_len(64).not_null())
                    .col(ColumnDef::new(Message::AuthorId).string_len(64).not_null())
                    .col(ColumnDef::new(Message::Content).text().not_null())
                    .col(ColumnDef::new(Message::AttachmentUrl).text())
                    .col(
                        ColumnDef::new(Message::Deleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Message::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Message::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Composite index backing the windowed feed read:
        // ordered scan within a topic, strictly-older-than-cursor ranges.
        manager
            .create_index(
                Index::create()
                    .name("idx_message_topic_created_id")
                    .table(Message::Table)
                    .col(Message::TopicId)
                    .col(Message::CreatedAt)
                    .col(Message::Id)
                    .to_owned(),
            )
            .await?;

        // Index on author_id for moderation lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_message_author_id")
                    .table(Message::Table)
                    .col(Message::AuthorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Message::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Message {
    Table,
    Id,
    TopicId,
    AuthorId,
    Content,
    AttachmentUrl,
    Deleted,
    CreatedAt,
    UpdatedAt,
}
