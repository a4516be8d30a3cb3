/// Outbound mail for credential recovery
use crate::config::EmailSettings;
use crate::error::{IdentityError, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use std::sync::Arc;
use tracing::{info, warn};

/// Delivery port for reset links
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a password reset link; an error means nothing was sent
    async fn send_reset_link(&self, recipient: &str, link: &str) -> Result<()>;
}

/// Async SMTP mailer (or no-op when no host is configured)
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Option<Arc<AsyncSmtpTransport<Tokio1Executor>>>,
    from: Mailbox,
    /// Lifetime of the codes this mailer announces
    code_ttl: chrono::Duration,
}

impl SmtpMailer {
    /// Build mailer from configuration
    ///
    /// If SMTP host is empty, operates in no-op mode (logs only).
    pub fn new(config: &EmailSettings, code_ttl: chrono::Duration) -> Result<Self> {
        let from = config
            .smtp_from
            .parse::<Mailbox>()
            .map_err(|e| IdentityError::Internal(format!("Invalid SMTP_FROM address: {}", e)))?;

        let transport = if config.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured; mailer will operate in no-op mode");
            None
        } else {
            let builder = if config.use_starttls {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            } else {
                AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            }
            .map_err(|e| {
                IdentityError::Internal(format!("Failed to configure SMTP transport: {}", e))
            })?
            .port(config.smtp_port);

            let builder = match (&config.smtp_username, &config.smtp_password) {
                (Some(username), Some(password)) => {
                    builder.credentials(Credentials::new(username.clone(), password.clone()))
                }
                _ => builder,
            };

            Some(Arc::new(builder.build()))
        };

        Ok(Self {
            transport,
            from,
            code_ttl,
        })
    }

    /// Check if SMTP transport is enabled
    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    fn reset_text_body(&self, link: &str) -> String {
        format!(
            "We received a request to reset your password.\n\n\
            Open the following link to choose a new password:\n{}\n\n\
            This link will expire in {} and can be used once.\n\
            If you did not request this, you can ignore this email.",
            link,
            describe_ttl(self.code_ttl)
        )
    }

    fn reset_html_body(&self, link: &str) -> String {
        let expiry = describe_ttl(self.code_ttl);
        format!(
            r#"<!DOCTYPE html>
<html>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; padding: 20px; color: #333;">
    <h2>Password Reset Request</h2>
    <p>We received a request to reset your password.</p>
    <p><a href="{link}">Choose a new password</a></p>
    <p style="color: #999; font-size: 12px;">
        This link will expire in {expiry} and can be used once.<br>
        If you did not request this, you can ignore this email.
    </p>
</body>
</html>"#
        )
    }

    fn build_reset_message(&self, recipient: &str, link: &str) -> Result<Message> {
        let to = recipient.parse::<Mailbox>()?;
        let text_body = self.reset_text_body(link);
        let html_body = self.reset_html_body(link);

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Reset your password")
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        Ok(message)
    }
}

/// Human-readable lifetime, in the largest unit that divides it evenly
fn describe_ttl(ttl: chrono::Duration) -> String {
    let secs = ttl.num_seconds();
    let (amount, unit) = if secs > 0 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs > 0 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if amount == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", amount, unit)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_reset_link(&self, recipient: &str, link: &str) -> Result<()> {
        let message = self.build_reset_message(recipient, link)?;

        match &self.transport {
            Some(transport) => {
                transport.send(message).await?;
                info!("password reset email sent");
            }
            None => {
                info!(
                    recipient,
                    "Mailer running in no-op mode; skipping actual send"
                );
            }
        }
        Ok(())
    }
}
