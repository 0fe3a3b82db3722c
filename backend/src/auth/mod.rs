//! Authentication module
//!
//! JWT issuance and verification, argon2id password hashing and the
//! `AuthUser` extractor guarding protected routes.

mod jwt;
mod middleware;
mod password;

pub use jwt::{Claims, JwtService, TokenError, TokenKind, TokenTtls, VerifiedToken};
pub use middleware::{bearer_token, AuthUser};
pub use password::PasswordService;
