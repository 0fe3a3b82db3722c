//! Log-only notifier
//!
//! Used when no SMTP host is configured and by the test suite. Messages are
//! written to the log instead of being delivered.

use super::{mask_email, Notifier, NotifyError, ResetNotice};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Notifier that records messages instead of sending them
#[derive(Clone, Default)]
pub struct LogNotifier {
    /// Counter for tracking number of messages sent
    sent: Arc<AtomicU64>,
    /// Last delivered notice (for testing)
    last: Arc<Mutex<Option<ResetNotice>>>,
    /// Whether to simulate failures (for testing)
    simulate_failure: bool,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every dispatch fails
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Get the total number of messages sent
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }

    /// The most recently sent notice
    pub fn last_notice(&self) -> Option<ResetNotice> {
        self.last.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_password_reset(&self, notice: &ResetNotice) -> Result<(), NotifyError> {
        if self.simulate_failure {
            return Err(NotifyError::Transport("simulated failure".to_string()));
        }

        info!(
            to = %mask_email(&notice.to_email),
            "Password reset requested; link: {}",
            notice.reset_link
        );

        if let Ok(mut last) = self.last.lock() {
            *last = Some(notice.clone());
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "log"
    }
}
