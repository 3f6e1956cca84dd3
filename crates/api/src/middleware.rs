//! API middleware.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use accord_core::{IdentityService, MessageService};

use crate::streaming::TopicHub;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Message mutations and paginated reads.
    pub message_service: MessageService,
    /// External identity collaborator.
    pub identity: IdentityService,
    /// In-process event fan-out hub.
    pub hub: TopicHub,
}

/// Authentication middleware.
///
/// Resolves a Bearer token through the identity collaborator and stashes
/// the profile in request extensions; the [`crate::extractors::AuthProfile`]
/// extractor turns a missing profile into a 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        if let Ok(profile) = state.identity.authenticate(token).await {
            req.extensions_mut().insert(profile);
        }
    }

    next.run(req).await
}
