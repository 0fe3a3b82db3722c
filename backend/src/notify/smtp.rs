//! SMTP notifier built on lettre

use super::{mask_email, Notifier, NotifyError, ResetNotice};
use crate::config::MailConfig;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use tracing::debug;

/// Sends reset links through an SMTP relay
pub struct SmtpNotifier {
    from: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    /// Build a transport for `host`.
    ///
    /// With credentials the connection is upgraded via STARTTLS; without them
    /// a plain connection is used, which suits local relays such as MailHog.
    pub fn new(config: &MailConfig, host: &str) -> Result<Self, NotifyError> {
        let from: Mailbox = config
            .from_address
            .parse()
            .map_err(|e| NotifyError::Address(format!("{}: {}", config.from_address, e)))?;

        let mailer = match (&config.smtp_username, &config.smtp_password) {
            (Some(user), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                    .map_err(|e| NotifyError::Transport(e.to_string()))?
                    .port(config.smtp_port)
                    .credentials(Credentials::new(
                        user.clone(),
                        password.expose_secret().clone(),
                    ))
                    .build()
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                .port(config.smtp_port)
                .build(),
        };

        Ok(Self { from, mailer })
    }

    fn build_message(&self, notice: &ResetNotice) -> Result<Message, NotifyError> {
        let to: Mailbox = notice
            .to_email
            .parse()
            .map_err(|e| NotifyError::Address(format!("{}: {}", mask_email(&notice.to_email), e)))?;

        let body = format!(
            "Hi {},\n\n\
             We received a request to reset your password.\n\
             Open the link below to choose a new one:\n\n\
             {}\n\n\
             If you did not ask for this, you can ignore this email.\n",
            notice.to_name, notice.reset_link
        );

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Reset your password")
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| NotifyError::Message(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_password_reset(&self, notice: &ResetNotice) -> Result<(), NotifyError> {
        let message = self.build_message(notice)?;
        self.mailer
            .send(message)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        debug!(to = %mask_email(&notice.to_email), "Password reset email sent");
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "smtp"
    }
}
