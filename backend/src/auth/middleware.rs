//! Authentication extractor
//!
//! `AuthUser` reads the `Authorization: Bearer` header and verifies it as an
//! access token. Every failure, including a missing header, is rejected with
//! the same `InvalidToken` answer; the precise reason is only logged.
//!
//! Handlers restricted to some roles call [`AuthUser::require_role`] after
//! extraction. A caller with the wrong role gets that same answer.

use super::jwt::TokenKind;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::FromRef,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use shopfront_shared::Role;
use tracing::debug;
use uuid::Uuid;

/// Authenticated caller extracted from an access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    /// Admit the caller only if their role is one of `allowed`
    pub fn require_role(&self, allowed: &[Role]) -> ApiResult<()> {
        if allowed.contains(&self.role) {
            return Ok(());
        }
        debug!(user_id = %self.user_id, role = %self.role, "Role not permitted");
        Err(ApiError::InvalidToken)
    }
}

/// Token from an `Authorization: Bearer <token>` header, if present
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let Some(token) = bearer_token(&parts.headers) else {
            debug!("Request without bearer token");
            return Err(ApiError::InvalidToken);
        };

        let verified = app_state.auth().authenticate(token, TokenKind::Access)?;

        let role = verified.role.ok_or(ApiError::InvalidToken)?;
        Ok(AuthUser {
            user_id: verified.user_id,
            role,
        })
    }
}
