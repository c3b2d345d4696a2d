//! Transactional email.
//!
//! Messages are rendered from Askama templates and handed to a [`Mailer`].
//! [`SmtpMailer`] delivers over SMTP via lettre; [`LogMailer`] is used when
//! no SMTP server is configured and only logs what would have been sent.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use bookstore_core::Email;

use crate::config::EmailConfig;
use crate::models::User;

/// HTML template for welcome email.
#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    name: &'a str,
    store_url: &'a str,
}

/// Plain text template for welcome email.
#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeEmailText<'a> {
    name: &'a str,
    store_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: Email,
    pub to_name: Option<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

impl OutgoingEmail {
    /// Render the welcome message for a newly registered user.
    ///
    /// # Errors
    ///
    /// Returns `MailError::Template` if a template fails to render.
    pub fn welcome(user: &User, store_url: &str) -> Result<Self, MailError> {
        let name = user.name.as_str();
        let html_body = WelcomeEmailHtml { name, store_url }.render()?;
        let text_body = WelcomeEmailText { name, store_url }.render()?;

        Ok(Self {
            to: user.email.clone(),
            to_name: Some(user.name.clone()),
            subject: "Welcome to the Bookstore".to_owned(),
            text_body,
            html_body,
        })
    }
}

/// Something that can deliver an [`OutgoingEmail`].
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a message.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// SMTP delivery via lettre.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create a new SMTP mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured or the sender address
    /// is invalid.
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_owned(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        let from = config
            .from_address
            .parse()
            .map_err(|_| MailError::InvalidAddress(config.from_address.clone()))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let address = email
            .to
            .as_str()
            .parse()
            .map_err(|_| MailError::InvalidAddress(email.to.to_string()))?;
        let to = Mailbox::new(email.to_name.clone(), address);

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body.clone()),
                    ),
            )?;

        self.transport.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

/// Mailer used when SMTP is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "SMTP not configured, email not sent"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bookstore_core::{CartId, Role, UserId};
    use chrono::Utc;

    use super::*;

    fn user(name: &str) -> User {
        User {
            id: UserId::new(1),
            name: name.to_owned(),
            email: Email::parse("reader@example.com").unwrap(),
            role: Role::Customer,
            cart_id: Some(CartId::new(1)),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_welcome_email_renders_both_parts() {
        let email = OutgoingEmail::welcome(&user("Ada"), "https://books.example.com").unwrap();

        assert_eq!(email.to.as_str(), "reader@example.com");
        assert_eq!(email.to_name.as_deref(), Some("Ada"));
        assert!(email.text_body.contains("Ada"));
        assert!(email.text_body.contains("https://books.example.com"));
        assert!(email.html_body.contains("Ada"));
    }

    #[test]
    fn test_welcome_html_escapes_name() {
        let email = OutgoingEmail::welcome(&user("<b>Ada</b>"), "https://books.example.com")
            .unwrap();

        assert!(!email.html_body.contains("<b>Ada</b>"));
        // Plain text is not escaped.
        assert!(email.text_body.contains("<b>Ada</b>"));
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let email = OutgoingEmail::welcome(&user("Ada"), "https://books.example.com").unwrap();
        assert!(LogMailer.send(&email).await.is_ok());
    }
}
