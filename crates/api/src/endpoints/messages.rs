//! Message endpoints: cursor-paginated reads and mutations.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use accord_common::{AppResult, Message, MessagePage};
use accord_core::CreateMessageInput;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{extractors::AuthProfile, middleware::AppState, response::ApiResponse};

/// Create messages router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_page).post(create_message))
        .route("/{message_id}", patch(edit_message).delete(delete_message))
}

/// Page query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default)]
    pub topic_id: String,
    pub cursor: Option<String>,
}

/// One page of a topic's feed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub items: Vec<Message>,
    pub next_cursor: Option<String>,
}

impl From<MessagePage> for PageResponse {
    fn from(page: MessagePage) -> Self {
        Self {
            items: page.items,
            next_cursor: page.next_cursor,
        }
    }
}

/// Fetch one page of messages, newest first.
async fn get_page(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<PageResponse>> {
    let page = state
        .message_service
        .fetch_page(&query.topic_id, query.cursor.as_deref())
        .await?;

    info!(
        member = %profile.id,
        topic = %query.topic_id,
        count = page.items.len(),
        "Fetched message page"
    );

    Ok(ApiResponse::ok(PageResponse::from(page)))
}

/// Create message request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub topic_id: String,
    #[serde(default)]
    pub content: String,
    pub attachment_url: Option<String>,
}

/// Post a new message to a topic.
async fn create_message(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    Json(req): Json<CreateMessageRequest>,
) -> AppResult<ApiResponse<Message>> {
    info!(
        member = %profile.id,
        topic = %req.topic_id,
        "Creating message"
    );

    let input = CreateMessageInput {
        content: req.content,
        attachment_url: req.attachment_url,
    };

    let message = state
        .message_service
        .create_message(&profile.id, &req.topic_id, input)
        .await?;

    Ok(ApiResponse::ok(message))
}

/// Edit message request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditMessageRequest {
    pub content: String,
}

/// Edit a message's content. Author only.
async fn edit_message(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Json(req): Json<EditMessageRequest>,
) -> AppResult<ApiResponse<Message>> {
    info!(
        member = %profile.id,
        message = %message_id,
        "Editing message"
    );

    let message = state
        .message_service
        .edit_message(&profile.id, &message_id, req.content)
        .await?;

    Ok(ApiResponse::ok(message))
}

/// Tombstone a message. Author only.
async fn delete_message(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> AppResult<ApiResponse<Message>> {
    info!(
        member = %profile.id,
        message = %message_id,
        "Deleting message"
    );

    let tombstone = state
        .message_service
        .delete_message(&profile.id, &message_id)
        .await?;

    Ok(ApiResponse::ok(tombstone))
}
