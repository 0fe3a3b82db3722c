//! Shopfront authentication backend
//!
//! Credential issuance and token validation for the Shopfront store.
//!
//! ## Architecture
//!
//! The backend follows a layered architecture:
//! - Routes: HTTP request handling, validation and error envelopes
//! - Services: Auth use cases (register, login, refresh, password reset)
//! - Repositories: Credential store (PostgreSQL or in-memory)
//! - Notify: Password reset delivery (SMTP or log-only)

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use shopfront_backend::{
    config::AppConfig,
    db,
    notify::{LogNotifier, Notifier, SmtpNotifier},
    repositories::{InMemoryUserRepository, PgUserRepository, UserRepository},
    routes,
    state::AppState,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    // Missing secrets stop the process here
    let config = AppConfig::load().context("Invalid configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if AppConfig::is_production() { "production" } else { "development" },
        "Starting Shopfront backend"
    );

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install metrics recorder")?;

    let users = connect_store(&config).await?;
    let notifier = create_notifier(&config);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(users, notifier, config)?.with_metrics(metrics);
    let app = routes::create_router(state);

    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Open the credential store selected by configuration
async fn connect_store(config: &AppConfig) -> Result<Arc<dyn UserRepository>> {
    if config.database.in_memory {
        warn!("Using in-memory user store; accounts are lost on restart");
        return Ok(Arc::new(InMemoryUserRepository::new()));
    }

    info!(
        host = %config.database.host,
        database = %config.database.name,
        "Connecting to database..."
    );
    let pool = db::create_pool(&config.database).await?;

    // Skip in production if using separate migration job
    if !AppConfig::is_production() {
        db::run_migrations(&pool).await?;
    }

    Ok(Arc::new(PgUserRepository::new(pool)))
}

/// SMTP when a host is configured, log-only otherwise
fn create_notifier(config: &AppConfig) -> Arc<dyn Notifier> {
    match config.mail.smtp_host.as_deref() {
        Some(host) => match SmtpNotifier::new(&config.mail, host) {
            Ok(notifier) => {
                info!(host, port = config.mail.smtp_port, "Password reset mail via SMTP");
                Arc::new(notifier)
            }
            Err(e) => {
                warn!("Invalid mail configuration: {}. Reset links will only be logged.", e);
                Arc::new(LogNotifier::new())
            }
        },
        None => {
            warn!("No SMTP host configured. Reset links will only be logged.");
            Arc::new(LogNotifier::new())
        }
    }
}

/// Initialize tracing/logging
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if AppConfig::is_production() {
            "shopfront_backend=info,tower_http=info".into()
        } else {
            "shopfront_backend=debug,tower_http=debug,sqlx=warn".into()
        }
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if AppConfig::is_production() {
        // JSON logging for production (better for log aggregation)
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
