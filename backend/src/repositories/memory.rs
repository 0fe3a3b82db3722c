//! In-memory user repository
//!
//! Keeps users in a process-local map. Used by the test suite and, with
//! `database.in_memory = true`, for running the server without PostgreSQL.

use super::{NewUser, StoreError, UserRecord, UserRepository};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    by_id: HashMap<Uuid, UserRecord>,
    id_by_email: HashMap<String, Uuid>,
}

/// Process-local credential store
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    tables: Arc<RwLock<Tables>>,
    /// Whether to simulate an unreachable store (for testing)
    unavailable: Arc<AtomicBool>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the pool timed out
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.tables.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<UserRecord, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        if tables.id_by_email.contains_key(&new_user.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            created_at: now,
            updated_at: now,
        };

        tables.id_by_email.insert(record.email.clone(), record.id);
        tables.by_id.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.check_available()?;
        let tables = self.tables.read().await;
        Ok(tables
            .id_by_email
            .get(email)
            .and_then(|id| tables.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        self.check_available()?;
        Ok(self.tables.read().await.by_id.get(&id).cloned())
    }

    async fn update_password(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;

        Ok(tables.by_id.get_mut(&id).map(|record| {
            record.password_hash = password_hash.to_string();
            // Strictly increasing so reset tokens bound to the old version die
            record.updated_at = Utc::now().max(record.updated_at + Duration::microseconds(1));
            record.clone()
        }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
