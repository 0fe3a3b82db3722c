//! Password reset notifications
//!
//! Defines the dispatcher the auth service hands reset links to. Delivery is
//! best effort: the service logs and drops `NotifyError`s so the HTTP answer
//! never depends on the mail system.

mod log;
mod smtp;

pub use self::log::LogNotifier;
pub use self::smtp::SmtpNotifier;

use async_trait::async_trait;
use thiserror::Error;

/// Notification dispatch failure
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("Transport failure: {0}")]
    Transport(String),
}

/// A password reset message ready to send
#[derive(Debug, Clone)]
pub struct ResetNotice {
    pub to_email: String,
    pub to_name: String,
    pub reset_link: String,
}

/// Dispatcher for password reset messages
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a reset link to the account owner
    async fn send_password_reset(&self, notice: &ResetNotice) -> Result<(), NotifyError>;

    /// Provider name for logs
    fn provider_name(&self) -> &str;
}

/// Helper to mask email addresses for logging
///
/// Keeps the first character of the local part and the full domain.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first: String = local.chars().take(1).collect();
            format!("{}***@{}", first, domain)
        }
        None => "***".to_string(),
    }
}
