//! Application state management
//!
//! Shared state handed to every handler through Axum's state extraction.
//! Everything expensive (JWT keys, the password hasher's dummy hash, the
//! database pool) is built once at startup; cloning the state only bumps
//! reference counts.

use crate::auth::{JwtService, PasswordService};
use crate::config::AppConfig;
use crate::notify::Notifier;
use crate::repositories::UserRepository;
use crate::services::{AuthPolicy, AuthService};
use anyhow::Result;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    auth: AuthService,
    users: Arc<dyn UserRepository>,
    config: Arc<AppConfig>,
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire the auth service to its collaborators
    ///
    /// Fails if the configured argon2 parameters are rejected.
    pub fn new(
        users: Arc<dyn UserRepository>,
        notifier: Arc<dyn Notifier>,
        config: AppConfig,
    ) -> Result<Self> {
        let jwt = JwtService::from_config(&config.auth);
        let passwords = PasswordService::from_config(&config.password)?;
        let policy = AuthPolicy {
            allow_admin_signup: config.auth.allow_admin_signup,
            reset_url: config.mail.reset_url.clone(),
        };

        let auth = AuthService::new(Arc::clone(&users), notifier, jwt, passwords, policy);

        Ok(Self {
            auth,
            users,
            config: Arc::new(config),
            metrics: None,
        })
    }

    /// Serve the recorder behind `handle` on `GET /metrics`
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    #[inline]
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    #[inline]
    pub fn jwt(&self) -> &JwtService {
        self.auth.jwt()
    }

    /// Credential store, used directly by the readiness probe
    #[inline]
    pub fn users(&self) -> &Arc<dyn UserRepository> {
        &self.users
    }

    #[inline]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[inline]
    pub fn metrics(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }
}
