//! API integration tests.
//!
//! These tests verify the message endpoints and auth middleware work
//! together over a mocked store.

#![allow(clippy::unwrap_used)]

use axum::{
    Router, middleware,
    body::Body,
    http::{Request, StatusCode},
    routing::get,
};
use accord_api::{TopicHub, middleware::AppState, router as api_router, streaming_handler};
use accord_core::{MessageService, Profile, StaticIdentityProvider};
use accord_db::{entities::message, repositories::MessageRepository};
use chrono::Utc;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use std::sync::Arc;
use tower::ServiceExt;

fn test_model(id: &str, topic_id: &str, author_id: &str) -> message::Model {
    let at = Utc::now();
    message::Model {
        id: id.to_string(),
        topic_id: topic_id.to_string(),
        author_id: author_id.to_string(),
        content: "hello".to_string(),
        attachment_url: None,
        deleted: false,
        created_at: at.into(),
        updated_at: at.into(),
    }
}

/// Build a router over a mock store with the given scripted query results.
fn test_router(results: Vec<Vec<message::Model>>) -> Router {
    let db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(results)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection(),
    );

    let message_service = MessageService::new(MessageRepository::new(db));
    let identity = Arc::new(StaticIdentityProvider::new().with_token(
        "token-1",
        Profile {
            id: "member-1".to_string(),
            display_name: "Alice".to_string(),
        },
    ));

    let state = AppState {
        message_service,
        identity,
        hub: TopicHub::new(),
    };

    Router::new()
        .route("/streaming", get(streaming_handler))
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            accord_api::middleware::auth_middleware,
        ))
        .with_state(state)
}

#[tokio::test]
async fn test_page_read_requires_auth() {
    let app = test_router(vec![]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/messages?topicId=topic-1")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_page_read_rejects_missing_topic() {
    let app = test_router(vec![]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/messages")
                .method("GET")
                .header("Authorization", "Bearer token-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_page_read_returns_messages() {
    let app = test_router(vec![vec![
        test_model("msg-2", "topic-1", "member-1"),
        test_model("msg-1", "topic-1", "member-1"),
    ]]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/messages?topicId=topic-1")
                .method("GET")
                .header("Authorization", "Bearer token-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"]["items"].as_array().unwrap().len(), 2);
    assert!(json["data"]["nextCursor"].is_null());
}

#[tokio::test]
async fn test_create_message() {
    let app = test_router(vec![vec![test_model("msg-1", "topic-1", "member-1")]]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/messages")
                .method("POST")
                .header("Authorization", "Bearer token-1")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"topicId":"topic-1","content":"hello"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["data"]["topicId"], "topic-1");
}

#[tokio::test]
async fn test_create_rejects_empty_payload() {
    let app = test_router(vec![]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/messages")
                .method("POST")
                .header("Authorization", "Bearer token-1")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"topicId":"topic-1","content":"  "}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_foreign_message_is_forbidden() {
    let app = test_router(vec![vec![test_model("msg-1", "topic-1", "member-2")]]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/messages/msg-1")
                .method("DELETE")
                .header("Authorization", "Bearer token-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_edit_missing_message_is_not_found() {
    let app = test_router(vec![vec![]]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/messages/ghost")
                .method("PATCH")
                .header("Authorization", "Bearer token-1")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"content":"revised"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
