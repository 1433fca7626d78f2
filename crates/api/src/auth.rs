//! Bearer-token identity resolution.
//!
//! Tokens are opaque strings mapped to an [`Identity`] by an
//! [`IdentityProvider`]. The bundled [`StaticIdentityProvider`] reads its map
//! from configuration; a deployment behind an external auth layer supplies its
//! own provider.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use common::UserId;
use domain::{DomainError, Identity, Role};
use thiserror::Error;

use crate::error::ApiError;

/// Resolves a bearer credential to the caller's identity.
pub trait IdentityProvider: Send + Sync {
    fn resolve(&self, token: &str) -> Option<Identity>;
}

/// Errors in the `AUTH_TOKENS` configuration string.
#[derive(Debug, Error)]
pub enum AuthConfigError {
    #[error("Malformed token entry: {0}")]
    Malformed(String),

    #[error("Invalid user id in token entry {entry}: {source}")]
    InvalidUser {
        entry: String,
        #[source]
        source: uuid::Error,
    },

    #[error("Invalid role in token entry {entry}: {source}")]
    InvalidRole {
        entry: String,
        #[source]
        source: DomainError,
    },
}

/// Fixed token table.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, Identity>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, identity: Identity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }

    /// Parses `token=<user-uuid>:<role>` entries separated by `;`.
    ///
    /// The role may be omitted, in which case it defaults to `customer`.
    /// Empty entries are skipped.
    pub fn parse(spec: &str) -> Result<Self, AuthConfigError> {
        let mut provider = Self::new();
        for entry in spec.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (token, subject) = entry
                .split_once('=')
                .filter(|(token, _)| !token.trim().is_empty())
                .ok_or_else(|| AuthConfigError::Malformed(entry.to_string()))?;
            let (user, role) = subject.split_once(':').unwrap_or((subject, "customer"));

            let user_id: UserId =
                user.trim()
                    .parse()
                    .map_err(|source| AuthConfigError::InvalidUser {
                        entry: entry.to_string(),
                        source,
                    })?;
            let role: Role = role
                .trim()
                .parse()
                .map_err(|source| AuthConfigError::InvalidRole {
                    entry: entry.to_string(),
                    source,
                })?;

            provider = provider.with_token(token.trim(), Identity { user_id, role });
        }
        Ok(provider)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn resolve(&self, token: &str) -> Option<Identity> {
        self.tokens.get(token).copied()
    }
}

/// Router state that can authenticate requests.
pub trait AuthState: Send + Sync {
    fn identities(&self) -> &dyn IdentityProvider;
}

impl<T: AuthState> AuthState for Arc<T> {
    fn identities(&self) -> &dyn IdentityProvider {
        (**self).identities()
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Identity);

impl<S: AuthState> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        state
            .identities()
            .resolve(token)
            .map(AuthUser)
            .ok_or_else(|| ApiError::Unauthorized("Invalid bearer token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "00000000-0000-0000-0000-00000000000a";
    const ROOT: &str = "00000000-0000-0000-0000-0000000000ff";

    #[test]
    fn test_parse_entries() {
        let provider =
            StaticIdentityProvider::parse(&format!("alice={ALICE}:customer; root={ROOT}:admin;"))
                .unwrap();

        assert_eq!(provider.len(), 2);
        let alice = provider.resolve("alice").unwrap();
        assert_eq!(alice.user_id.to_string(), ALICE);
        assert_eq!(alice.role, Role::Customer);
        assert!(provider.resolve("root").unwrap().is_admin());
        assert!(provider.resolve("mallory").is_none());
    }

    #[test]
    fn test_role_defaults_to_customer() {
        let provider = StaticIdentityProvider::parse(&format!("alice={ALICE}")).unwrap();
        assert_eq!(provider.resolve("alice").unwrap().role, Role::Customer);
    }

    #[test]
    fn test_empty_spec() {
        assert!(StaticIdentityProvider::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_bad_entries() {
        assert!(matches!(
            StaticIdentityProvider::parse("no-separator"),
            Err(AuthConfigError::Malformed(_))
        ));
        assert!(matches!(
            StaticIdentityProvider::parse("t=not-a-uuid:admin"),
            Err(AuthConfigError::InvalidUser { .. })
        ));
        assert!(matches!(
            StaticIdentityProvider::parse(&format!("t={ALICE}:root")),
            Err(AuthConfigError::InvalidRole { .. })
        ));
    }
}
