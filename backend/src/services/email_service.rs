//! Outbound verification mail.
//!
//! Workflows talk to a `NotificationSink`; `EmailService` is the SMTP-backed
//! implementation used in production.

use crate::config::EmailConfig;
use crate::errors::{ServiceError, ServiceResult};
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart, SinglePart, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::str::FromStr;

/// Fire-and-forget delivery of account notifications.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers a verification link carrying `token` to `recipient`.
    async fn send_verification_email(&self, recipient: &str, token: &str) -> ServiceResult<()>;
}

/// Builds the link a user follows to redeem a verification token.
pub fn verification_url(base_url: &str, token: &str) -> String {
    format!(
        "{}/api/v1/auth/verify-email?token={}",
        base_url.trim_end_matches('/'),
        token
    )
}

pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    config: EmailConfig,
}

impl EmailService {
    /// Creates a new EmailService instance
    pub fn new(config: EmailConfig) -> ServiceResult<Self> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| ServiceError::unavailable(format!("Invalid SMTP host: {e}")))?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        Ok(Self { mailer, config })
    }

    /// Sends a generic email
    pub async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        html_content: &str,
        text_content: &str,
    ) -> ServiceResult<()> {
        let from_mailbox = Mailbox::from_str(&format!(
            "{} <{}>",
            self.config.from_name, self.config.from_email
        ))
        .map_err(|e| ServiceError::unavailable(format!("Invalid from email: {e}")))?;

        let to_mailbox = Mailbox::from_str(to_email)
            .map_err(|e| ServiceError::validation(format!("Invalid recipient email: {e}")))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_content.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_content.to_string()),
                    ),
            )
            .map_err(|e| ServiceError::internal_error(format!("Failed to build email: {e}")))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| ServiceError::unavailable(format!("Failed to send email: {e}")))?;

        Ok(())
    }

    fn build_verification_html(&self, url: &str) -> String {
        format!(
            r#"
            <!DOCTYPE html>
            <html>
            <head>
                <meta charset="UTF-8">
                <title>Confirm your registration</title>
            </head>
            <body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
                <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
                    <h2 style="color: #2c3e50;">Welcome to {}!</h2>

                    <p>Please confirm your email address to finish registration:</p>

                    <div style="text-align: center; margin: 30px 0;">
                        <a href="{}"
                           style="background-color: #4CAF50; color: white; padding: 10px 20px;
                                  text-decoration: none; border-radius: 5px; display: inline-block;">
                            Confirm email
                        </a>
                    </div>

                    <p>Or copy and paste this link into your browser:</p>
                    <p style="word-break: break-all; color: #7f8c8d;">{}</p>

                    <hr style="border: none; border-top: 1px solid #ecf0f1; margin: 30px 0;">

                    <p style="font-size: 12px; color: #7f8c8d;">
                        The link expires in {}. If you did not sign up, ignore this email.
                    </p>
                </div>
            </body>
            </html>
            "#,
            self.config.from_name,
            url,
            url,
            self.link_lifetime()
        )
    }

    fn build_verification_text(&self, url: &str) -> String {
        format!(
            "Welcome to {}!\n\n\
             Please confirm your email address to finish registration:\n\n\
             {}\n\n\
             The link expires in {}. If you did not sign up, ignore this email.\n",
            self.config.from_name,
            url,
            self.link_lifetime()
        )
    }

    fn link_lifetime(&self) -> String {
        match self.config.verification_ttl_hours {
            1 => "1 hour".to_string(),
            hours => format!("{hours} hours"),
        }
    }
}

#[async_trait]
impl NotificationSink for EmailService {
    async fn send_verification_email(&self, recipient: &str, token: &str) -> ServiceResult<()> {
        let url = verification_url(&self.config.base_url, token);
        let subject = format!("Confirm your registration in {}", self.config.from_name);
        let html_content = self.build_verification_html(&url);
        let text_content = self.build_verification_text(&url);

        self.send_email(recipient, &subject, &html_content, &text_content)
            .await
    }
}
