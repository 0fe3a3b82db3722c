//! Configuration management for the Shopfront backend
//!
//! Configuration is loaded once at startup, hierarchically:
//! 1. Default values for everything that is not a secret
//! 2. TOML config files (config/development.toml or config/production.toml)
//! 3. Environment variables (prefix: SHOP__, e.g. SHOP__AUTH__ACCESS_SECRET)
//! 4. The variable names of the legacy deployment (AUTH_SECRET, POSTGRES_HOST, ...)
//!
//! Token secrets have no default. A missing secret fails `AppConfig::load`,
//! and the process refuses to start.

use anyhow::{bail, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use shopfront_shared::validation::parse_ttl;
use std::collections::HashMap;
use std::env;

/// Legacy variable name -> configuration key
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("AUTH_SECRET", "auth.access_secret"),
    ("AUTH_SECRET_EXPIRES_IN", "auth.access_token_ttl"),
    ("AUTH_REFRESH_SECRET", "auth.refresh_secret"),
    ("AUTH_REFRESH_SECRET_EXPIRES_IN", "auth.refresh_token_ttl"),
    ("POSTGRES_HOST", "database.host"),
    ("POSTGRES_PORT", "database.port"),
    ("POSTGRES_DB", "database.name"),
    ("POSTGRES_USER", "database.user"),
    ("POSTGRES_PASSWORD", "database.password"),
    ("SMTP_HOST", "mail.smtp_host"),
    ("SMTP_PORT", "mail.smtp_port"),
    ("PORT", "server.port"),
];

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub password: PasswordConfig,
    pub mail: MailConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub body_limit_bytes: usize,
}

/// Database connection parameters
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: SecretString,
    pub max_connections: u32,
    /// Keep users in process memory instead of PostgreSQL
    pub in_memory: bool,
}

/// Token secrets and lifetimes
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub access_secret: SecretString,
    #[serde(rename = "access_token_ttl", deserialize_with = "deserialize_ttl")]
    pub access_token_ttl_secs: i64,
    pub refresh_secret: SecretString,
    #[serde(rename = "refresh_token_ttl", deserialize_with = "deserialize_ttl")]
    pub refresh_token_ttl_secs: i64,
    #[serde(rename = "reset_token_ttl", deserialize_with = "deserialize_ttl")]
    pub reset_token_ttl_secs: i64,
    /// Whether `POST /register` may create ADMIN accounts
    pub allow_admin_signup: bool,
    /// Adds `Secure` to the refresh token cookie
    pub secure_cookies: bool,
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

/// Outgoing mail settings for password reset messages
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// No host means reset links are only logged
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<SecretString>,
    pub from_address: String,
    /// Link base; the reset token is appended as `?token=`
    pub reset_url: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TtlValue {
    Seconds(i64),
    Text(String),
}

fn deserialize_ttl<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match TtlValue::deserialize(deserializer)? {
        TtlValue::Seconds(secs) => Ok(secs),
        TtlValue::Text(text) => parse_ttl(&text).map_err(serde::de::Error::custom),
    }
}

impl AppConfig {
    /// Load configuration from files and the process environment
    pub fn load() -> Result<Self> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_env_map(&vars)
    }

    /// Load configuration using `vars` in place of the process environment
    pub fn from_env_map(vars: &HashMap<String, String>) -> Result<Self> {
        let run_env = vars
            .get("RUST_ENV")
            .cloned()
            .unwrap_or_else(|| "development".to_string());
        let config_file = format!("config/{}.toml", run_env);

        let env_source: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut builder = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080_i64)?
            .set_default("server.request_timeout_secs", 30_i64)?
            .set_default("server.body_limit_bytes", 64_i64 * 1024)?
            .set_default("database.host", "localhost")?
            .set_default("database.port", 5432_i64)?
            .set_default("database.name", "shopfront")?
            .set_default("database.user", "postgres")?
            .set_default("database.password", "postgres")?
            .set_default("database.max_connections", 10_i64)?
            .set_default("database.in_memory", false)?
            .set_default("auth.access_token_ttl", "15m")?
            .set_default("auth.refresh_token_ttl", "24h")?
            .set_default("auth.reset_token_ttl", "1h")?
            .set_default("auth.allow_admin_signup", false)?
            .set_default("auth.secure_cookies", run_env == "production")?
            .set_default("password.memory_kib", 19_456_i64)?
            .set_default("password.iterations", 2_i64)?
            .set_default("password.parallelism", 1_i64)?
            .set_default("mail.smtp_port", 1025_i64)?
            .set_default("mail.from_address", "Shopfront <no-reply@shopfront.local>")?
            .set_default("mail.reset_url", "http://localhost:3000/reset-password")?
            .add_source(config::File::with_name(&config_file).required(false))
            .add_source(
                config::Environment::with_prefix("SHOP")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env_source)),
            );

        for (var, key) in LEGACY_ENV_KEYS {
            builder = builder.set_override_option(*key, vars.get(*var).cloned())?;
        }

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would start a server with broken auth
    pub fn validate(&self) -> Result<()> {
        let access = self.auth.access_secret.expose_secret();
        let refresh = self.auth.refresh_secret.expose_secret();

        if access.trim().is_empty() {
            bail!("auth.access_secret must not be empty");
        }
        if refresh.trim().is_empty() {
            bail!("auth.refresh_secret must not be empty");
        }
        if access == refresh {
            bail!("auth.access_secret and auth.refresh_secret must differ");
        }

        for (name, ttl) in [
            ("auth.access_token_ttl", self.auth.access_token_ttl_secs),
            ("auth.refresh_token_ttl", self.auth.refresh_token_ttl_secs),
            ("auth.reset_token_ttl", self.auth.reset_token_ttl_secs),
        ] {
            if ttl <= 0 {
                bail!("{} must be positive, got {}", name, ttl);
            }
        }

        Ok(())
    }

    /// Check if running in production mode
    pub fn is_production() -> bool {
        env::var("RUST_ENV")
            .map(|v| v == "production")
            .unwrap_or(false)
    }
}
