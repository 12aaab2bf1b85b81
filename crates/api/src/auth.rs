//! Bearer-token authentication.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use document_store::DocumentStore;
use domain::Identity;

use crate::config::TokenGrant;
use crate::error::ApiError;
use crate::state::AppState;

/// Resolves a bearer token to the caller's identity.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Returns the identity behind a token, or None if the token is unknown.
    async fn verify(&self, token: &str) -> Option<Identity>;
}

/// Verifier backed by a fixed token table.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token.
    pub fn insert(&mut self, token: impl Into<String>, identity: Identity) {
        self.tokens.insert(token.into(), identity);
    }

    /// Returns the number of known tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if no token is registered.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl FromIterator<TokenGrant> for StaticTokenVerifier {
    fn from_iter<I: IntoIterator<Item = TokenGrant>>(grants: I) -> Self {
        Self {
            tokens: grants
                .into_iter()
                .map(|grant| (grant.token, grant.identity))
                .collect(),
        }
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Option<Identity> {
        self.tokens.get(token).copied()
    }
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Identity);

impl<S> FromRequestParts<Arc<AppState<S>>> for AuthUser
where
    S: DocumentStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".to_string()))?;

        let identity = state
            .tokens
            .verify(token)
            .await
            .ok_or_else(|| ApiError::Unauthorized("Not authorized, token failed".to_string()))?;

        Ok(AuthUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::UserId;

    #[tokio::test]
    async fn test_static_verifier() {
        let user = Identity::user(UserId::new());
        let verifier: StaticTokenVerifier = vec![TokenGrant {
            token: "t1".to_string(),
            identity: user,
        }]
        .into_iter()
        .collect();

        assert_eq!(verifier.len(), 1);
        assert_eq!(verifier.verify("t1").await, Some(user));
        assert_eq!(verifier.verify("t2").await, None);
    }
}
