//! Email service for account verification and welcome mail.
//!
//! Uses SMTP via lettre for delivery with Askama templates. Without SMTP
//! configuration the rendered message is logged instead of sent.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::{ApiConfig, EmailConfig};

use super::registry::{ResolveError, ScopedService, ServiceKind, ServiceScope};

/// HTML template for the verification email.
#[derive(Template)]
#[template(path = "email/verify.html")]
struct VerifyEmailHtml<'a> {
    name: &'a str,
    verify_url: &'a str,
}

/// Plain text template for the verification email.
#[derive(Template)]
#[template(path = "email/verify.txt")]
struct VerifyEmailText<'a> {
    name: &'a str,
    verify_url: &'a str,
}

/// HTML template for the welcome email.
#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    name: &'a str,
}

/// Plain text template for the welcome email.
#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeEmailText<'a> {
    name: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
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

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
    base_url: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &ApiConfig) -> Result<Self, SmtpError> {
        let mailer = config.email.as_ref().map(build_transport).transpose()?;
        if mailer.is_none() {
            tracing::warn!("SMTP not configured; account emails will only be logged");
        }

        Ok(Self {
            mailer,
            from_address: config.app.email_from.clone(),
            base_url: config.base_url.clone(),
        })
    }

    /// Whether messages are actually delivered.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Link a new account follows to verify its address.
    #[must_use]
    pub fn verification_url(&self, token: &str) -> String {
        format!(
            "{}/api/accounts/verify-email?token={}",
            self.base_url,
            urlencoding::encode(token)
        )
    }

    /// Send the email verification link.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_verification(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let verify_url = self.verification_url(token);
        let html = VerifyEmailHtml {
            name,
            verify_url: &verify_url,
        }
        .render()?;
        let text = VerifyEmailText {
            name,
            verify_url: &verify_url,
        }
        .render()?;

        self.send_multipart_email(to, "Verify your Chef account", &text, &html)
            .await
    }

    /// Send a welcome email once the account is verified.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_welcome(&self, to: &str, name: &str) -> Result<(), EmailError> {
        let html = WelcomeEmailHtml { name }.render()?;
        let text = WelcomeEmailText { name }.render()?;

        self.send_multipart_email(to, "Welcome to Chef", &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        let Some(mailer) = &self.mailer else {
            tracing::info!(to = %to, subject = %subject, body = %text_body, "Email not sent (SMTP disabled)");
            return Ok(());
        };

        mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

impl ScopedService for EmailService {
    const KIND: ServiceKind = ServiceKind::Email;

    fn create(scope: &ServiceScope) -> Result<Self, ResolveError> {
        Ok(scope.state().email().clone())
    }
}

fn build_transport(config: &EmailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, SmtpError> {
    let credentials = Credentials::new(
        config.smtp_username.clone(),
        config.smtp_password.expose_secret().to_string(),
    );

    Ok(
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build(),
    )
}

/// Generate a URL-safe email verification token.
#[must_use]
pub fn generate_verification_token() -> String {
    use rand::{Rng, distr::Alphanumeric};
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_verification_token_format() {
        let token = generate_verification_token();
        assert_eq!(token.len(), 48);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_templates_render() {
        let html = VerifyEmailHtml {
            name: "Ada",
            verify_url: "https://api.chef.test/api/accounts/verify-email?token=abc",
        }
        .render()
        .unwrap();
        assert!(html.contains("Ada"));
        assert!(html.contains("token=abc"));

        let text = WelcomeEmailText { name: "Ada" }.render().unwrap();
        assert!(text.contains("Ada"));
    }

    #[tokio::test]
    async fn test_disabled_service_logs_instead_of_sending() {
        let service = EmailService {
            mailer: None,
            from_address: "no-reply@chef.test".to_string(),
            base_url: "https://api.chef.test".to_string(),
        };
        assert!(!service.is_enabled());
        assert_eq!(
            service.verification_url("a b"),
            "https://api.chef.test/api/accounts/verify-email?token=a%20b"
        );
        service
            .send_welcome("cook@example.com", "Ada")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let service = EmailService {
            mailer: None,
            from_address: "no-reply@chef.test".to_string(),
            base_url: "https://api.chef.test".to_string(),
        };
        assert!(matches!(
            service.send_welcome("not an address", "Ada").await,
            Err(EmailError::InvalidAddress(_))
        ));
    }
}
