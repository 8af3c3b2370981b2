//! Outgoing email.
//!
//! Handlers talk to a [`Mailer`]; the SMTP implementation is used when the
//! `[email]` section is configured, otherwise messages are only logged so a
//! development setup can still complete registration by copying the link.

use anyhow::Result;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use crate::config::EmailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<()>;
}

/// Pick the transport for the given configuration
pub fn mailer_from_config(config: &EmailConfig) -> Result<Arc<dyn Mailer>> {
    if config.is_configured() {
        let mailer = SmtpMailer::new(config)?;
        tracing::info!(
            host = config.smtp_host.as_deref().unwrap_or_default(),
            port = config.smtp_port,
            "SMTP mailer ready"
        );
        Ok(Arc::new(mailer))
    } else {
        tracing::warn!("Email not configured, outgoing mail will only be logged");
        Ok(Arc::new(LogMailer))
    }
}

/// Delivers mail through an SMTP relay
pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let smtp_host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("SMTP host not configured"))?;
        let from_address = config
            .from_address
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("From address not configured"))?;

        let from: Mailbox = format!("{} <{}>", config.from_name, from_address).parse()?;

        let builder = if config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?
        } else if config.smtp_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host)
        }
        .port(config.smtp_port);

        let builder = if let (Some(username), Some(password)) =
            (&config.smtp_username, &config.smtp_password)
        {
            builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            builder
        };

        Ok(Self {
            from,
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        let to: Mailbox = email.to.parse()?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body),
                    ),
            )?;

        self.transport.send(message).await?;

        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Email sent successfully"
        );

        Ok(())
    }
}

/// Writes mail to the log instead of sending it
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body = %email.text_body,
            "Email not sent (no SMTP configured)"
        );
        Ok(())
    }
}

/// Link the user follows to confirm their address
pub fn verification_url(public_url: &str, token: &str) -> String {
    format!("{}/verify-email?token={}", public_url.trim_end_matches('/'), token)
}

pub fn verification_email(to: &str, first_name: &str, verify_url: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Verify Your Account".to_string(),
        html_body: render_verification_html(first_name, verify_url),
        text_body: render_verification_text(first_name, verify_url),
    }
}

fn render_verification_html(first_name: &str, verify_url: &str) -> String {
    let first_name = escape_html(first_name);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Account Verification</title>
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif; color: #374151;">
    <h1>Account Verification</h1>
    <p>Thank you for registering, {first_name}!</p>
    <p>Please verify your email by clicking the link below:</p>
    <p><a href="{verify_url}" target="_self">Verify Email</a></p>
    <p><small>If the link doesn't work, copy and paste this URL into your browser: {verify_url}</small></p>
</body>
</html>"#
    )
}

fn render_verification_text(first_name: &str, verify_url: &str) -> String {
    format!(
        "Account Verification\n\n\
         Thank you for registering, {first_name}!\n\n\
         Please verify your email by opening this link:\n\
         {verify_url}\n"
    )
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Captures outgoing mail in memory for assertions
#[cfg(test)]
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: std::sync::Mutex<Vec<OutgoingEmail>>,
    pub fail: bool,
}

#[cfg(test)]
impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<()> {
        if self.fail {
            anyhow::bail!("connection refused");
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_url_joins_cleanly() {
        assert_eq!(
            verification_url("http://localhost:8000/", "abc"),
            "http://localhost:8000/verify-email?token=abc"
        );
    }

    #[test]
    fn test_verification_email_contains_link() {
        let email = verification_email(
            "ada@college.edu",
            "<Ada>",
            "http://localhost:8000/verify-email?token=abc",
        );

        assert_eq!(email.subject, "Verify Your Account");
        assert!(email.html_body.contains("Thank you for registering, &lt;Ada&gt;!"));
        assert!(email.html_body.contains(r#"href="http://localhost:8000/verify-email?token=abc""#));
        assert!(email.text_body.contains("verify-email?token=abc"));
    }

    #[test]
    fn test_unconfigured_email_falls_back_to_log_mailer() {
        assert!(mailer_from_config(&EmailConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let email = verification_email("ada@college.edu", "Ada", "http://x/verify-email?token=t");
        assert!(LogMailer.send(email).await.is_ok());
    }
}
