//! Identity collaborator boundary.
//!
//! Authentication is delegated to an external provider; this core only
//! needs a stable member/profile ID for authorizing reads and writes and
//! for attributing message authorship.

use accord_common::{AppError, AppResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolved member identity.
#[derive(Debug, Clone)]
pub struct Profile {
    /// Stable member/profile ID.
    pub id: String,
    /// Display name for attribution.
    pub display_name: String,
}

/// Trait for the external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve an access token to a member profile.
    ///
    /// Returns [`AppError::Unauthorized`] when the token is unknown or
    /// invalid.
    async fn authenticate(&self, token: &str) -> AppResult<Profile>;
}

/// Shared trait-object handle used by middleware.
pub type IdentityService = Arc<dyn IdentityProvider>;

/// Token-table identity provider for development and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, Profile>,
}

impl StaticIdentityProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for a profile.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, profile: Profile) -> Self {
        self.tokens.insert(token.into(), profile);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn authenticate(&self, token: &str) -> AppResult<Profile> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider_resolves_known_token() {
        let provider = StaticIdentityProvider::new().with_token(
            "token-1",
            Profile {
                id: "member-1".to_string(),
                display_name: "Alice".to_string(),
            },
        );

        let profile = provider.authenticate("token-1").await.unwrap();
        assert_eq!(profile.id, "member-1");
    }

    #[tokio::test]
    async fn test_static_provider_rejects_unknown_token() {
        let provider = StaticIdentityProvider::new();
        let err = provider.authenticate("nope").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }
}
