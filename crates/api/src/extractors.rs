//! Request extractors.

use accord_core::Profile;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};

/// Authenticated member extractor.
#[derive(Debug, Clone)]
pub struct AuthProfile(pub Profile);

impl<S> FromRequestParts<S> for AuthProfile
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by the auth middleware
        parts
            .extensions
            .get::<Profile>()
            .cloned()
            .map(AuthProfile)
            .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}

/// Optional authenticated member extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthProfile(pub Option<Profile>);

impl<S> FromRequestParts<S> for MaybeAuthProfile
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Profile>().cloned()))
    }
}
