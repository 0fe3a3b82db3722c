//! Password hashing
//!
//! New hashes are Argon2id with configurable cost. Verification also accepts
//! bcrypt hashes (`$2a$`, `$2b$`, `$2y$`) carried over from the previous
//! deployment, so migrated accounts keep working.
//!
//! Argon2 is intentionally CPU-intensive; the `_async` variants move the work
//! onto the blocking thread pool.

use crate::config::PasswordConfig;
use anyhow::Result;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::sync::Arc;

const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

/// Password hashing service
#[derive(Clone)]
pub struct PasswordService {
    params: Params,
    /// Hash of a random value, verified against when the account is unknown
    dummy_hash: Arc<str>,
}

impl PasswordService {
    /// Create a service with explicit Argon2 cost parameters
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| anyhow::anyhow!("Invalid argon2 parameters: {}", e))?;

        let mut service = Self {
            params,
            dummy_hash: Arc::from(""),
        };
        let dummy_secret = SaltString::generate(&mut OsRng);
        service.dummy_hash = Arc::from(service.hash(dummy_secret.as_str())?);
        Ok(service)
    }

    pub fn from_config(config: &PasswordConfig) -> Result<Self> {
        Self::new(config.memory_kib, config.iterations, config.parallelism)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password (blocking operation)
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
        Ok(hash.to_string())
    }

    /// Hash a password on the blocking thread pool
    pub async fn hash_async(&self, password: String) -> Result<String> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.hash(&password))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Verify a password against a stored hash (blocking operation)
    ///
    /// Argon2 hashes carry their own parameters, so hashes made under older
    /// cost settings still verify.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        if BCRYPT_PREFIXES.iter().any(|prefix| hash.starts_with(prefix)) {
            return bcrypt::verify(password, hash)
                .map_err(|e| anyhow::anyhow!("Invalid bcrypt hash: {}", e));
        }

        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid hash format: {}", e))?;
        Ok(self
            .argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Verify a password on the blocking thread pool
    pub async fn verify_async(&self, password: String, hash: String) -> Result<bool> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.verify(&password, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Spend one verification without a real account.
    ///
    /// Keeps the unknown-email login path as slow as the wrong-password one.
    pub async fn verify_dummy(&self, password: String) -> Result<()> {
        let hash = self.dummy_hash.to_string();
        self.verify_async(password, hash).await.map(|_| ())
    }
}
