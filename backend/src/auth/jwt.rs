//! JWT token generation and validation
//!
//! Access and refresh tokens are signed with independent secrets and carry
//! independent lifetimes, so a leaked refresh secret cannot mint access
//! tokens and the other way round. Password reset tokens share the access
//! keys but are told apart by their `token_type` claim.
//!
//! Keys are derived once at startup and shared behind `Arc`.

use crate::config::AuthConfig;
use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use shopfront_shared::Role;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// What a token may be used for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Reset,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::Reset => "reset",
        })
    }
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Role at issue time; absent on refresh and reset tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub token_type: TokenKind,
    /// Credential version a refresh or reset token is bound to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ver: Option<i64>,
}

/// Why a token was rejected.
///
/// Callers collapse every variant into one "invalid token" answer; the
/// variants exist so logs can tell an expired session from a forgery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token signature mismatch")]
    BadSignature,

    #[error("expected {expected} token, got {actual}")]
    WrongKind {
        expected: TokenKind,
        actual: TokenKind,
    },

    #[error("malformed token: {0}")]
    Malformed(String),
}

impl TokenError {
    /// Short label for structured logs and metrics
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Expired => "expired",
            TokenError::BadSignature => "bad_signature",
            TokenError::WrongKind { .. } => "wrong_kind",
            TokenError::Malformed(_) => "malformed",
        }
    }
}

/// Identity asserted by a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: Uuid,
    pub role: Option<Role>,
    pub kind: TokenKind,
    pub version: Option<i64>,
}

/// Pre-computed JWT keys for one secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
}

impl JwtKeys {
    /// Create new JWT keys from secret
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
        }
    }

    pub fn encoding(&self) -> &EncodingKey {
        &self.encoding
    }

    pub fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }
}

/// Token lifetimes in seconds
#[derive(Debug, Clone, Copy)]
pub struct TokenTtls {
    pub access_secs: i64,
    pub refresh_secs: i64,
    pub reset_secs: i64,
}

/// JWT service for token operations
#[derive(Clone)]
pub struct JwtService {
    access_keys: JwtKeys,
    refresh_keys: JwtKeys,
    ttls: TokenTtls,
    validation: Arc<Validation>,
}

impl JwtService {
    /// Create a new JWT service with pre-computed keys
    ///
    /// Call this once at application startup and store in AppState.
    pub fn new(access_secret: &str, refresh_secret: &str, ttls: TokenTtls) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            access_keys: JwtKeys::new(access_secret),
            refresh_keys: JwtKeys::new(refresh_secret),
            ttls,
            validation: Arc::new(validation),
        }
    }

    /// Build from the validated auth configuration
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.access_secret.expose_secret(),
            config.refresh_secret.expose_secret(),
            TokenTtls {
                access_secs: config.access_token_ttl_secs,
                refresh_secs: config.refresh_token_ttl_secs,
                reset_secs: config.reset_token_ttl_secs,
            },
        )
    }

    /// Issue an access token carrying the user's role
    #[inline]
    pub fn issue_access_token(&self, user_id: Uuid, role: Role) -> Result<String> {
        self.issue(user_id, Some(role), TokenKind::Access, None)
    }

    /// Issue a refresh token bound to a credential version
    #[inline]
    pub fn issue_refresh_token(&self, user_id: Uuid, version: i64) -> Result<String> {
        self.issue(user_id, None, TokenKind::Refresh, Some(version))
    }

    /// Issue a password reset token bound to a credential version
    #[inline]
    pub fn issue_reset_token(&self, user_id: Uuid, version: i64) -> Result<String> {
        self.issue(user_id, None, TokenKind::Reset, Some(version))
    }

    fn keys(&self, kind: TokenKind) -> &JwtKeys {
        match kind {
            TokenKind::Access | TokenKind::Reset => &self.access_keys,
            TokenKind::Refresh => &self.refresh_keys,
        }
    }

    fn ttl_secs(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.ttls.access_secs,
            TokenKind::Refresh => self.ttls.refresh_secs,
            TokenKind::Reset => self.ttls.reset_secs,
        }
    }

    fn issue(
        &self,
        user_id: Uuid,
        role: Option<Role>,
        kind: TokenKind,
        ver: Option<i64>,
    ) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.ttl_secs(kind));

        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            token_type: kind,
            ver,
        };

        encode(&Header::default(), &claims, self.keys(kind).encoding())
            .map_err(|e| anyhow::anyhow!("Failed to generate {} token: {}", kind, e))
    }

    /// Verify a token of the expected kind.
    ///
    /// Expiry is strict: a token is dead at its `exp` second, with no leeway.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<VerifiedToken, TokenError> {
        let token_data = decode::<Claims>(token, self.keys(expected).decoding(), &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed(e.to_string()),
            })?;
        let claims = token_data.claims;

        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        if claims.token_type != expected {
            return Err(TokenError::WrongKind {
                expected,
                actual: claims.token_type,
            });
        }

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| TokenError::Malformed("subject is not a user ID".to_string()))?;

        if expected == TokenKind::Access && claims.role.is_none() {
            return Err(TokenError::Malformed("access token without role".to_string()));
        }

        Ok(VerifiedToken {
            user_id,
            role: claims.role,
            kind: claims.token_type,
            version: claims.ver,
        })
    }

    /// Get access token lifetime in seconds
    #[inline]
    pub fn access_token_ttl_secs(&self) -> i64 {
        self.ttls.access_secs
    }

    /// Get refresh token lifetime in seconds
    #[inline]
    pub fn refresh_token_ttl_secs(&self) -> i64 {
        self.ttls.refresh_secs
    }
}
