//! Credential store
//!
//! `UserRepository` is the seam between the auth service and persistence.
//! PostgreSQL backs it in production; the in-memory implementation serves
//! tests and database-less local runs.

mod memory;
mod user;

pub use memory::InMemoryUserRepository;
pub use user::PgUserRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shopfront_shared::{Role, User};
use thiserror::Error;
use uuid::Uuid;

/// Stored user, including the password hash
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Outward representation, without the hash
    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Version stamp bound into refresh and password reset tokens.
    ///
    /// Changes whenever the password does, which retires outstanding tokens.
    pub fn credential_version(&self) -> i64 {
        self.updated_at.timestamp_micros()
    }
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Credential store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Credential store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("Corrupt user record: {0}")]
    Corrupt(String),
}

/// Persistence contract for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; fails with `StoreError::DuplicateEmail` if the email is taken
    async fn create(&self, new_user: NewUser) -> Result<UserRecord, StoreError>;

    /// Look up a user by (normalized) email
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Look up a user by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;

    /// Replace the password hash, returning the updated record if the user exists
    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<UserRecord>, StoreError>;

    /// Readiness check
    async fn ping(&self) -> Result<(), StoreError>;

    /// Backend name for logs and probes
    fn backend_name(&self) -> &'static str;
}
