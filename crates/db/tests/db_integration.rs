//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `accord_test`)
//!   `TEST_DB_PASSWORD` (default: `accord_test`)
//!   `TEST_DB_NAME` (default: `accord_test`)

#![allow(clippy::unwrap_used)]

use accord_db::entities::message;
use accord_db::repositories::MessageRepository;
use accord_db::test_utils::{TestDatabase, TestDbConfig};
use chrono::{Duration, Utc};
use sea_orm::{DatabaseConnection, Set, SqlxPostgresConnector};
use std::sync::Arc;

/// `DatabaseConnection` is not `Clone` when the `mock` feature is enabled
/// (which the unit tests pull in), so hand out a second handle to the same
/// underlying pool instead.
fn conn_handle(conn: &DatabaseConnection) -> DatabaseConnection {
    SqlxPostgresConnector::from_sqlx_postgres_pool(conn.get_postgres_connection_pool().clone())
}

fn message_model(id: &str, topic: &str, offset_secs: i64) -> message::ActiveModel {
    let at = Utc::now() - Duration::seconds(offset_secs);
    message::ActiveModel {
        id: Set(id.to_string()),
        topic_id: Set(topic.to_string()),
        author_id: Set("author-1".to_string()),
        content: Set(format!("message {id}")),
        attachment_url: Set(None),
        deleted: Set(false),
        created_at: Set(at.into()),
        updated_at: Set(at.into()),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let config = TestDbConfig::default();
    let result = TestDatabase::with_config(config).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_page_walk_over_25_messages() {
    let db = TestDatabase::create_unique().await.unwrap();
    let repo = MessageRepository::new(Arc::new(conn_handle(&db.conn)));

    // 25 messages; msg-24 is the newest (smallest age offset).
    for i in 0..25 {
        repo.create(message_model(
            &format!("msg-{i:02}"),
            "topic-a",
            i64::from(100 - i),
        ))
        .await
        .unwrap();
    }

    let first = repo.find_page("topic-a", 10, None).await.unwrap();
    assert_eq!(first.len(), 10);
    assert_eq!(first[0].id, "msg-24");
    assert_eq!(first[9].id, "msg-15");

    let cursor = repo.find_by_id(&first[9].id).await.unwrap().unwrap();
    let second = repo.find_page("topic-a", 10, Some(&cursor)).await.unwrap();
    assert_eq!(second.len(), 10);
    assert_eq!(second[0].id, "msg-14");
    assert_eq!(second[9].id, "msg-05");

    let cursor = repo.find_by_id(&second[9].id).await.unwrap().unwrap();
    let third = repo.find_page("topic-a", 10, Some(&cursor)).await.unwrap();
    assert_eq!(third.len(), 5);
    assert_eq!(third[4].id, "msg-00");

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_page_is_topic_isolated() {
    let db = TestDatabase::create_unique().await.unwrap();
    let repo = MessageRepository::new(Arc::new(conn_handle(&db.conn)));

    repo.create(message_model("a-1", "topic-a", 10)).await.unwrap();
    repo.create(message_model("b-1", "topic-b", 5)).await.unwrap();

    let page = repo.find_page("topic-a", 10, None).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, "a-1");

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_identical_timestamps_break_ties_by_id() {
    let db = TestDatabase::create_unique().await.unwrap();
    let repo = MessageRepository::new(Arc::new(conn_handle(&db.conn)));

    // Same created_at for all three; order must fall back to id desc.
    let at = Utc::now() - Duration::seconds(50);
    for id in ["tie-a", "tie-b", "tie-c"] {
        let mut model = message_model(id, "topic-t", 50);
        model.created_at = Set(at.into());
        model.updated_at = Set(at.into());
        repo.create(model).await.unwrap();
    }

    let page = repo.find_page("topic-t", 10, None).await.unwrap();
    let ids: Vec<_> = page.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["tie-c", "tie-b", "tie-a"]);

    // Cursor at tie-b must return only tie-a.
    let cursor = repo.find_by_id("tie-b").await.unwrap().unwrap();
    let older = repo.find_page("topic-t", 10, Some(&cursor)).await.unwrap();
    let ids: Vec<_> = older.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["tie-a"]);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_soft_delete_keeps_row_in_page() {
    let db = TestDatabase::create_unique().await.unwrap();
    let repo = MessageRepository::new(Arc::new(conn_handle(&db.conn)));

    repo.create(message_model("del-1", "topic-d", 10)).await.unwrap();
    let existing = repo.find_by_id("del-1").await.unwrap().unwrap();
    let tombstone = repo.soft_delete(existing).await.unwrap();

    assert!(tombstone.deleted);
    assert!(tombstone.content.is_empty());
    assert!(tombstone.attachment_url.is_none());

    // Tombstone still occupies its slot in the page.
    let page = repo.find_page("topic-d", 10, None).await.unwrap();
    assert_eq!(page.len(), 1);
    assert!(page[0].deleted);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_update_content_bumps_updated_at() {
    let db = TestDatabase::create_unique().await.unwrap();
    let repo = MessageRepository::new(Arc::new(conn_handle(&db.conn)));

    repo.create(message_model("edit-1", "topic-e", 10)).await.unwrap();
    let existing = repo.find_by_id("edit-1").await.unwrap().unwrap();
    let edited = repo
        .update_content(existing, "revised".to_string())
        .await
        .unwrap();

    assert_eq!(edited.content, "revised");
    assert!(edited.is_edited());

    db.drop_database().await.unwrap();
}
